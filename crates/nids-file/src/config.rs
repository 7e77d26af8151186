//! File inspection configuration
//!
//! Depth budgets plus the magic rules the default classifier is built
//! from. Loaded from JSON or assembled programmatically.

use crate::classifier::{FileTypeClassifier, MagicClassifier, TypeContinuation};
use crate::{FileError, ProcessKind, Result, TypeClassification};
use crate::{FILE_ID_MAX, FILE_TYPE_CONTINUE, FILE_TYPE_UNKNOWN};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One magic byte sequence at a fixed file offset
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FileMagic {
    /// Offset from the start of the file
    #[serde(default)]
    pub offset: usize,

    /// Bytes expected at `offset`, written as hex (`"25 50 44 46"`)
    #[serde(deserialize_with = "hex_content")]
    pub content: Vec<u8>,
}

impl FileMagic {
    pub fn new(offset: usize, content: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            content: content.into(),
        }
    }

    /// Offset one past the last byte this magic inspects, `None` if it
    /// does not fit in `usize`
    #[inline]
    pub fn end(&self) -> Option<usize> {
        self.offset.checked_add(self.content.len())
    }
}

/// A file type and the magics that identify it
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct FileMagicRule {
    pub id: u32,

    #[serde(rename = "type")]
    pub type_name: String,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// All magics must match for the rule to identify the file
    pub magic: Vec<FileMagic>,
}

impl FileMagicRule {
    pub fn new(id: u32, type_name: impl Into<String>, magic: Vec<FileMagic>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            category: None,
            version: None,
            magic,
        }
    }

    /// Bytes from file start needed to decide this rule
    pub fn span(&self) -> Option<usize> {
        self.magic
            .iter()
            .try_fold(0, |span, magic| magic.end().map(|end| span.max(end)))
    }
}

/// JSON shape of a file configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfigFile {
    file_type_depth: Option<u64>,
    file_signature_depth: Option<u64>,
    rules: Vec<FileMagicRule>,
}

/// File inspection configuration
#[derive(Clone)]
pub struct FileConfig {
    /// Max bytes fed to type identification
    pub file_type_depth: Option<u64>,

    /// Max bytes fed to signature computation
    pub file_signature_depth: Option<u64>,

    rules: Vec<FileMagicRule>,

    /// Type id to index in `rules`
    rule_index: HashMap<u32, usize>,

    classifier: Arc<dyn FileTypeClassifier>,
}

impl FileConfig {
    /// Build a config from magic rules
    pub fn new(rules: Vec<FileMagicRule>) -> Result<Self> {
        let mut rule_index = HashMap::with_capacity(rules.len());

        for (idx, rule) in rules.iter().enumerate() {
            let reserved = rule.id == FILE_TYPE_CONTINUE || rule.id == FILE_TYPE_UNKNOWN;
            if reserved || rule.id >= FILE_ID_MAX {
                return Err(FileError::InvalidRuleId(rule.id));
            }
            if rule.magic.is_empty() || rule.magic.iter().any(|m| m.content.is_empty()) {
                return Err(FileError::EmptyMagic { id: rule.id });
            }
            if rule.span().is_none() {
                return Err(FileError::MagicOutOfRange { id: rule.id });
            }
            if rule_index.insert(rule.id, idx).is_some() {
                return Err(FileError::DuplicateRuleId(rule.id));
            }
        }

        let classifier = Arc::new(MagicClassifier::new(rules.clone()));

        tracing::debug!(rules = rules.len(), "file type rules loaded");

        Ok(Self {
            file_type_depth: None,
            file_signature_depth: None,
            rules,
            rule_index,
            classifier,
        })
    }

    /// Parse a JSON configuration
    pub fn from_json(text: &str) -> Result<Self> {
        let file: FileConfigFile = serde_json::from_str(text)?;

        let mut config = Self::new(file.rules)?;
        config.file_type_depth = file.file_type_depth;
        config.file_signature_depth = file.file_signature_depth;
        Ok(config)
    }

    pub fn with_type_depth(mut self, depth: u64) -> Self {
        self.file_type_depth = Some(depth);
        self
    }

    pub fn with_signature_depth(mut self, depth: u64) -> Self {
        self.file_signature_depth = Some(depth);
        self
    }

    /// Replace the magic-rule classifier with a custom one
    pub fn with_classifier(mut self, classifier: Arc<dyn FileTypeClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Depth budget for `kind`
    pub fn depth(&self, kind: ProcessKind) -> Option<u64> {
        match kind {
            ProcessKind::TypeId => self.file_type_depth,
            ProcessKind::Signature => self.file_signature_depth,
        }
    }

    /// Run the configured classifier
    pub fn find_file_type(&self, data: &[u8], cont: &mut TypeContinuation) -> TypeClassification {
        self.classifier.classify(data, cont)
    }

    /// Final verdict for a file that ended while still undecided
    pub fn finish_file_type(&self, cont: &TypeContinuation) -> TypeClassification {
        self.classifier.finish(cont)
    }

    /// Rule registered for `id`
    pub fn get_rule_from_id(&self, id: u32) -> Option<&FileMagicRule> {
        self.rule_index.get(&id).and_then(|&idx| self.rules.get(idx))
    }

    /// Human-readable label for a type id
    pub fn info_from_id(&self, id: u32) -> Option<&str> {
        match id {
            FILE_TYPE_UNKNOWN => Some("Unknown file type, done"),
            FILE_TYPE_CONTINUE => Some("Undecided file type, continue..."),
            id => self.get_rule_from_id(id).map(|r| r.type_name.as_str()),
        }
    }

    pub fn rules(&self) -> &[FileMagicRule] {
        &self.rules
    }
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            file_type_depth: None,
            file_signature_depth: None,
            rules: Vec::new(),
            rule_index: HashMap::new(),
            classifier: Arc::new(MagicClassifier::new(Vec::new())),
        }
    }
}

impl fmt::Debug for FileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileConfig")
            .field("file_type_depth", &self.file_type_depth)
            .field("file_signature_depth", &self.file_signature_depth)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

fn hex_content<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    let compact: String = text.split_whitespace().collect();
    hex::decode(&compact).map_err(serde::de::Error::custom)
}

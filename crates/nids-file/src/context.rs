//! Content identification context
//!
//! Per-file state mutated once per delivered chunk. Type identification
//! and signature accumulation share the stream offset but have separate
//! depth budgets.

use crate::classifier::TypeContinuation;
use crate::config::FileConfig;
use crate::depth::depth_limit;
use crate::signature::{FileSignature, SignatureAccumulator};
use crate::{Direction, FilePosition, ProcessKind, TypeClassification};
use std::sync::Arc;

/// Inspection state for one file or flow.
///
/// The `'a` lifetime covers the borrowed display name: the caller keeps
/// the backing buffer alive for as long as the context.
#[derive(Debug)]
pub struct ContentContext<'a> {
    config: Option<Arc<FileConfig>>,

    /// Stream offset: bytes delivered so far
    processed_bytes: u64,

    type_state: TypeClassification,
    type_continuation: TypeContinuation,

    signature_state: Option<SignatureAccumulator>,
    final_signature: Option<FileSignature>,

    /// Bytes actually fed to the classifier / digest
    type_bytes: u64,
    signature_bytes: u64,

    /// Depth budget hit, as opposed to a classifier verdict
    type_depth_reached: bool,
    signature_depth_reached: bool,

    name: Option<&'a [u8]>,
    size: u64,
    direction: Direction,
}

impl<'a> ContentContext<'a> {
    /// Create a context governed by `config`
    pub fn new(config: Arc<FileConfig>) -> Self {
        Self::with_config(Some(config))
    }

    /// Create a context with no depth limits and no classifier.
    ///
    /// Type identification is a no-op here; signatures still work.
    pub fn unconfigured() -> Self {
        Self::with_config(None)
    }

    fn with_config(config: Option<Arc<FileConfig>>) -> Self {
        Self {
            config,
            processed_bytes: 0,
            type_state: TypeClassification::Continue,
            type_continuation: TypeContinuation::default(),
            signature_state: None,
            final_signature: None,
            type_bytes: 0,
            signature_bytes: 0,
            type_depth_reached: false,
            signature_depth_reached: false,
            name: None,
            size: 0,
            direction: Direction::default(),
        }
    }

    /// Identify the file type from one more chunk.
    ///
    /// Does nothing once the type is resolved. Does not advance
    /// `processed_bytes`.
    pub fn classify_chunk(&mut self, data: &[u8], position: FilePosition) {
        if self.type_state.is_resolved() {
            return;
        }

        let decision = depth_limit(
            self.config.as_deref(),
            self.processed_bytes,
            ProcessKind::TypeId,
            data.len(),
        );

        let chunk = match decision.apply(data) {
            Some(chunk) => chunk,
            None => {
                tracing::debug!(
                    processed = self.processed_bytes,
                    "file type depth exceeded, giving up"
                );
                self.type_state = TypeClassification::Unknown;
                self.type_depth_reached = true;
                return;
            }
        };
        if decision.limited() {
            self.type_depth_reached = true;
        }

        let config = match self.config.as_deref() {
            Some(config) => config,
            None => return,
        };

        tracing::trace!(?position, len = chunk.len(), "file type chunk");

        let cont = &mut self.type_continuation;
        if position.is_first() {
            cont.reset();
        }

        let mut state = config.find_file_type(chunk, cont);
        if position.is_last() && state == TypeClassification::Continue {
            state = config.finish_file_type(cont);
        }

        self.type_state = state;
        self.type_bytes += chunk.len() as u64;
    }

    /// Feed one more chunk to the SHA-256 signature.
    ///
    /// Past the signature depth the digest simply freezes; the context is
    /// not marked failed. Does not advance `processed_bytes`.
    pub fn accumulate_signature(&mut self, data: &[u8], position: FilePosition) {
        if self.final_signature.is_some() {
            return;
        }

        let decision = depth_limit(
            self.config.as_deref(),
            self.processed_bytes,
            ProcessKind::Signature,
            data.len(),
        );

        let chunk = match decision.apply(data) {
            Some(chunk) => chunk,
            None => {
                if !self.signature_depth_reached {
                    tracing::debug!(
                        processed = self.processed_bytes,
                        "file signature depth exceeded, digest frozen"
                    );
                }
                self.signature_depth_reached = true;
                return;
            }
        };
        if decision.limited() {
            self.signature_depth_reached = true;
        }

        tracing::trace!(?position, len = chunk.len(), "file signature chunk");

        let acc = match position {
            FilePosition::Start | FilePosition::Whole => {
                self.signature_state.insert(SignatureAccumulator::new())
            }
            FilePosition::Middle | FilePosition::End => {
                self.signature_state.get_or_insert_with(SignatureAccumulator::new)
            }
        };
        acc.update(chunk);
        self.signature_bytes += chunk.len() as u64;

        if position.is_last() {
            self.final_signature = self.signature_state.take().map(SignatureAccumulator::finalize);
        }
    }

    /// Advance the stream offset after a chunk has been handled
    pub fn advance(&mut self, len: usize) {
        self.processed_bytes = self.processed_bytes.saturating_add(len as u64);
    }

    /// Type identification, signature and offset bookkeeping for one chunk
    pub fn process_chunk(&mut self, data: &[u8], position: FilePosition) {
        self.classify_chunk(data, position);
        self.accumulate_signature(data, position);
        self.advance(data.len());
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes
    }

    pub fn type_state(&self) -> TypeClassification {
        self.type_state
    }

    /// Human-readable label for the current type state
    pub fn type_info(&self) -> Option<&str> {
        self.config.as_deref()?.info_from_id(self.type_state.id())
    }

    /// Bytes actually fed to `kind` so far
    pub fn bytes_inspected(&self, kind: ProcessKind) -> u64 {
        match kind {
            ProcessKind::TypeId => self.type_bytes,
            ProcessKind::Signature => self.signature_bytes,
        }
    }

    /// Whether `kind` ran into its depth budget
    pub fn depth_reached(&self, kind: ProcessKind) -> bool {
        match kind {
            ProcessKind::TypeId => self.type_depth_reached,
            ProcessKind::Signature => self.signature_depth_reached,
        }
    }

    /// A digest is being accumulated
    pub fn signature_in_progress(&self) -> bool {
        self.signature_state.is_some()
    }

    pub fn signature(&self) -> Option<&FileSignature> {
        self.final_signature.as_ref()
    }

    /// Record a signature computed elsewhere (e.g. a cache hit).
    ///
    /// Returns `false` and leaves the context untouched if a signature
    /// is already set.
    pub fn set_signature(&mut self, signature: FileSignature) -> bool {
        if self.final_signature.is_some() {
            return false;
        }
        self.signature_state = None;
        self.final_signature = Some(signature);
        true
    }

    pub fn set_name(&mut self, name: &'a [u8]) {
        self.name = Some(name);
    }

    pub fn name(&self) -> Option<&'a [u8]> {
        self.name
    }

    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

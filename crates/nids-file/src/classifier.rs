//! File type classifiers
//!
//! The context only orchestrates; deciding what a file is belongs to a
//! [`FileTypeClassifier`] supplied through [`crate::FileConfig`].

use crate::config::FileMagicRule;
use crate::TypeClassification;

/// Capability that classifies file data one chunk at a time.
///
/// Must return [`TypeClassification::Continue`] while more data is
/// needed and must accept zero-length input. The verdict may not depend
/// on how the file was split into chunks.
pub trait FileTypeClassifier: Send + Sync {
    fn classify(&self, data: &[u8], cont: &mut TypeContinuation) -> TypeClassification;

    /// Verdict once the file has ended while `classify` still wanted
    /// more data
    fn finish(&self, _cont: &TypeContinuation) -> TypeClassification {
        TypeClassification::Unknown
    }
}

impl<F> FileTypeClassifier for F
where
    F: Fn(&[u8], &mut TypeContinuation) -> TypeClassification + Send + Sync,
{
    fn classify(&self, data: &[u8], cont: &mut TypeContinuation) -> TypeClassification {
        self(data, cont)
    }
}

/// Classifier-private state carried between chunks of one file
#[derive(Clone, Debug, Default)]
pub struct TypeContinuation {
    /// Leading file bytes kept for offset-based checks
    buffer: Vec<u8>,
    /// Bytes handed to the classifier since the last reset
    seen: u64,
}

impl TypeContinuation {
    /// Forget everything, as at the start of a new file
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.seen = 0;
    }

    /// Record `data` as seen, keeping at most `keep` leading bytes
    pub fn absorb(&mut self, data: &[u8], keep: usize) {
        self.seen += data.len() as u64;
        let room = keep.saturating_sub(self.buffer.len());
        let take = room.min(data.len());
        self.buffer.extend_from_slice(&data[..take]);
    }

    /// Leading bytes retained so far
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RuleMatch {
    Matched,
    Pending,
    Failed,
}

/// Outcome of checking every rule against the buffered prefix
#[derive(Clone, Copy, Debug, Default)]
struct Scan {
    /// Longest matching rule as (id, span); earlier rules win ties
    best: Option<(u32, usize)>,
    /// Longest span among rules still undecided
    pending: Option<usize>,
}

/// Default classifier: fixed-offset magic bytes.
///
/// When several rules match, the one inspecting the most bytes wins, so
/// a file is not identified while a longer rule is still undecided.
#[derive(Clone, Debug, Default)]
pub struct MagicClassifier {
    /// Rules with their spans
    rules: Vec<(FileMagicRule, usize)>,
    /// Leading bytes needed to decide every rule
    needed: usize,
}

impl MagicClassifier {
    pub fn new(rules: Vec<FileMagicRule>) -> Self {
        let rules: Vec<_> = rules
            .into_iter()
            .filter_map(|rule| match rule.span() {
                Some(span) => Some((rule, span)),
                None => {
                    tracing::warn!(id = rule.id, "magic beyond addressable range, rule ignored");
                    None
                }
            })
            .collect();
        let needed = rules.iter().map(|&(_, span)| span).max().unwrap_or(0);

        Self { rules, needed }
    }

    fn check(rule: &FileMagicRule, buf: &[u8]) -> RuleMatch {
        let mut pending = false;

        for magic in &rule.magic {
            let available = match buf.get(magic.offset..) {
                Some(tail) => tail,
                None => {
                    pending = true;
                    continue;
                }
            };

            if available.len() >= magic.content.len() {
                if available[..magic.content.len()] != magic.content[..] {
                    return RuleMatch::Failed;
                }
            } else {
                if magic.content[..available.len()] != *available {
                    return RuleMatch::Failed;
                }
                pending = true;
            }
        }

        if pending {
            RuleMatch::Pending
        } else {
            RuleMatch::Matched
        }
    }

    fn scan(&self, buf: &[u8]) -> Scan {
        let mut scan = Scan::default();

        for (rule, span) in &self.rules {
            match Self::check(rule, buf) {
                RuleMatch::Matched => {
                    if scan.best.map_or(true, |(_, best)| *span > best) {
                        scan.best = Some((rule.id, *span));
                    }
                }
                RuleMatch::Pending => {
                    scan.pending = scan.pending.max(Some(*span));
                }
                RuleMatch::Failed => {}
            }
        }

        scan
    }
}

impl FileTypeClassifier for MagicClassifier {
    fn classify(&self, data: &[u8], cont: &mut TypeContinuation) -> TypeClassification {
        cont.absorb(data, self.needed);

        match self.scan(cont.buffered()) {
            // A tie may still go to an earlier undecided rule
            Scan { best: Some((_, best)), pending: Some(pending) } if pending >= best => {
                TypeClassification::Continue
            }
            Scan { best: Some((id, _)), .. } => TypeClassification::Identified(id),
            Scan { pending: Some(_), .. } => TypeClassification::Continue,
            Scan { best: None, pending: None } => TypeClassification::Unknown,
        }
    }

    fn finish(&self, cont: &TypeContinuation) -> TypeClassification {
        match self.scan(cont.buffered()).best {
            Some((id, _)) => TypeClassification::Identified(id),
            None => TypeClassification::Unknown,
        }
    }
}

//! Depth Limiter
//!
//! Shared byte-budget policy for type identification and signature
//! computation. Pure: callers advance `processed_bytes` themselves.

use crate::config::FileConfig;
use crate::ProcessKind;

/// Outcome of applying a depth budget to one chunk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DepthDecision {
    /// Budget already exceeded, stop processing this kind
    Stop,
    /// Only the first `n` bytes fit within the budget
    Truncated(usize),
    /// The whole chunk fits
    Full(usize),
}

impl DepthDecision {
    /// Bytes to process, `None` for [`DepthDecision::Stop`]
    pub fn len(self) -> Option<usize> {
        match self {
            Self::Stop => None,
            Self::Truncated(n) | Self::Full(n) => Some(n),
        }
    }

    /// The budget was hit by this decision
    pub fn limited(self) -> bool {
        !matches!(self, Self::Full(_))
    }

    /// Slice of `data` this decision allows
    pub fn apply(self, data: &[u8]) -> Option<&[u8]> {
        self.len().and_then(|n| data.get(..n))
    }
}

/// Decide how much of a `requested`-byte chunk may be processed.
///
/// No config, or no depth for `kind`, passes the chunk through.
pub fn depth_limit(
    config: Option<&FileConfig>,
    processed_bytes: u64,
    kind: ProcessKind,
    requested: usize,
) -> DepthDecision {
    let max_depth = match config.and_then(|c| c.depth(kind)) {
        Some(depth) => depth,
        None => return DepthDecision::Full(requested),
    };

    if processed_bytes > max_depth {
        return DepthDecision::Stop;
    }

    let remaining = max_depth - processed_bytes;
    if requested as u64 > remaining {
        // remaining < requested, so it fits in usize
        DepthDecision::Truncated(remaining as usize)
    } else {
        DepthDecision::Full(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(type_depth: u64, signature_depth: u64) -> FileConfig {
        FileConfig::default()
            .with_type_depth(type_depth)
            .with_signature_depth(signature_depth)
    }

    #[test]
    fn test_no_config_passes_through() {
        assert_eq!(
            depth_limit(None, 1 << 40, ProcessKind::TypeId, 10),
            DepthDecision::Full(10)
        );
    }

    #[test]
    fn test_missing_kind_depth_passes_through() {
        let cfg = FileConfig::default().with_type_depth(4);
        assert_eq!(
            depth_limit(Some(&cfg), 100, ProcessKind::Signature, 10),
            DepthDecision::Full(10)
        );
    }

    #[test]
    fn test_clamps_to_remaining_budget() {
        let cfg = config(5, 100);
        assert_eq!(
            depth_limit(Some(&cfg), 0, ProcessKind::TypeId, 10),
            DepthDecision::Truncated(5)
        );
        assert_eq!(
            depth_limit(Some(&cfg), 3, ProcessKind::TypeId, 10),
            DepthDecision::Truncated(2)
        );
        assert_eq!(
            depth_limit(Some(&cfg), 0, ProcessKind::Signature, 10),
            DepthDecision::Full(10)
        );
    }

    #[test]
    fn test_exactly_at_depth_yields_empty_chunk() {
        let cfg = config(5, 5);
        assert_eq!(
            depth_limit(Some(&cfg), 5, ProcessKind::TypeId, 10),
            DepthDecision::Truncated(0)
        );
        assert_eq!(
            depth_limit(Some(&cfg), 6, ProcessKind::TypeId, 10),
            DepthDecision::Stop
        );
    }

    #[test]
    fn test_apply_slices_within_bounds() {
        let data = b"0123456789";
        assert_eq!(DepthDecision::Truncated(4).apply(data), Some(&b"0123"[..]));
        assert_eq!(DepthDecision::Stop.apply(data), None);
        assert!(DepthDecision::Truncated(4).limited());
        assert!(!DepthDecision::Full(10).limited());
    }
}

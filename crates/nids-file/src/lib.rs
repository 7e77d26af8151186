//! nids File Inspection
//!
//! Incremental content identification for file data that arrives in
//! discontiguous chunks (packet fragments, reassembled segments).
//!
//! ## Features
//!
//! - **Type Identification**: Pluggable classifier driven chunk by chunk,
//!   with a magic-byte rule classifier as the default
//! - **Signatures**: Rolling SHA-256 over accepted chunks, sealed on the
//!   terminal chunk
//! - **Depth Limits**: Independent byte budgets for type identification
//!   and signature computation
//!
//! A [`ContentContext`] is owned by exactly one flow and must be fed in
//! byte-offset order.

pub mod classifier;
pub mod config;
pub mod context;
pub mod depth;
pub mod signature;

pub use classifier::{FileTypeClassifier, MagicClassifier, TypeContinuation};
pub use config::{FileConfig, FileMagic, FileMagicRule};
pub use context::ContentContext;
pub use depth::{depth_limit, DepthDecision};
pub use signature::{FileSignature, SignatureAccumulator, SIGNATURE_SIZE};

use thiserror::Error;

/// Type id reported while the classifier still needs data
pub const FILE_TYPE_CONTINUE: u32 = 0;

/// Type id reported once classification gave up
pub const FILE_TYPE_UNKNOWN: u32 = 1022;

/// Upper bound (exclusive) for configured type ids
pub const FILE_ID_MAX: u32 = 1024;

/// File inspection errors
#[derive(Error, Debug)]
pub enum FileError {
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("file type id {0} is reserved or out of range")]
    InvalidRuleId(u32),

    #[error("duplicate file type id: {0}")]
    DuplicateRuleId(u32),

    #[error("file type rule {id} has no magic")]
    EmptyMagic { id: u32 },

    #[error("file type rule {id} has a magic beyond the addressable range")]
    MagicOutOfRange { id: u32 },
}

pub type Result<T> = std::result::Result<T, FileError>;

/// Where a chunk falls within the logical file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilePosition {
    /// First chunk of a multi-chunk file
    Start,
    /// Neither first nor last
    Middle,
    /// Last chunk of a multi-chunk file
    End,
    /// The whole file in a single chunk
    Whole,
}

impl FilePosition {
    /// Chunk starts a new file
    #[inline]
    pub fn is_first(self) -> bool {
        matches!(self, Self::Start | Self::Whole)
    }

    /// No more chunks follow
    #[inline]
    pub fn is_last(self) -> bool {
        matches!(self, Self::End | Self::Whole)
    }
}

/// Transfer direction of the inspected file
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    Upload,
    #[default]
    Download,
}

/// Processing kinds that carry their own depth budget
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessKind {
    TypeId,
    Signature,
}

/// File type classification state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeClassification {
    /// More data needed
    Continue,
    /// Classification failed or ran out of depth
    Unknown,
    /// Concrete type id from the configured rules
    Identified(u32),
}

impl TypeClassification {
    /// Map a raw type id to its classification
    pub fn from_id(id: u32) -> Self {
        match id {
            FILE_TYPE_CONTINUE => Self::Continue,
            FILE_TYPE_UNKNOWN => Self::Unknown,
            id => Self::Identified(id),
        }
    }

    /// Raw type id, sentinels included
    pub fn id(self) -> u32 {
        match self {
            Self::Continue => FILE_TYPE_CONTINUE,
            Self::Unknown => FILE_TYPE_UNKNOWN,
            Self::Identified(id) => id,
        }
    }

    /// Classification has concluded one way or the other
    #[inline]
    pub fn is_resolved(self) -> bool {
        !matches!(self, Self::Continue)
    }
}

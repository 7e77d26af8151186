//! nids Detection Options
//!
//! Rule-supplied predicates evaluated against packet payloads.
//!
//! ## Features
//!
//! - **Option Protocol**: Build from clause text, derive identity from
//!   `Hash + Eq`, evaluate to [`EvalStatus`]
//! - **Deduplication**: Identical clauses across rules are merged and
//!   evaluated once per packet
//! - **CVS Decoder**: `cvs: invalid-entry` detects malformed `Entry`
//!   lines (CVE-2004-0396)

pub mod clause;
pub mod cvs;
pub mod engine;
pub mod hash;
pub mod option;
pub mod registry;

pub use cvs::{CvsCheck, CvsCommand, CvsOption, EntryStatus};
pub use engine::{DetectionEngine, EngineStats, InspectionResult, OptionHandle, Rule};
pub use option::{DetectionOption, EvalStatus, IpsOption};
pub use registry::{OptionCtor, OptionRegistry};

use nids_common::NidsError;
use thiserror::Error;

/// Detection option errors
#[derive(Error, Debug)]
pub enum IpsError {
    #[error("wrong number of arguments for {option} rule: {args:?} ({found} tokens)")]
    ArgumentCount {
        option: &'static str,
        args: String,
        found: usize,
    },

    #[error("invalid argument specified for {option} rule: {token}")]
    InvalidArgument {
        option: &'static str,
        token: String,
    },

    #[error("unknown rule option: {0}")]
    UnknownKeyword(String),

    #[error("malformed rule clause: {0:?}")]
    MalformedClause(String),

    #[error(transparent)]
    Metrics(#[from] NidsError),
}

pub type Result<T> = std::result::Result<T, IpsError>;

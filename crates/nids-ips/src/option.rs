//! Detection option contract
//!
//! Option types implement [`IpsOption`] and derive `Hash` and `Eq` over
//! their parameters; [`DetectionOption`] then supplies the identity hash
//! and cross-type equality the engine deduplicates with.

use crate::hash::Lookup3Hasher;
use nids_common::Packet;
use std::any::Any;
use std::fmt;
use std::hash::Hash;

/// Result of evaluating one option against one packet
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EvalStatus {
    Match,
    NoMatch,
}

impl EvalStatus {
    #[inline]
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

impl From<bool> for EvalStatus {
    fn from(matched: bool) -> Self {
        if matched {
            Self::Match
        } else {
            Self::NoMatch
        }
    }
}

/// A rule-configured predicate.
///
/// Options are immutable once built and shared across threads. `eval`
/// must return [`EvalStatus::NoMatch`] for packets lacking the layers it
/// inspects rather than failing.
pub trait IpsOption: Send + Sync + 'static {
    /// Rule keyword this option was built from
    fn name(&self) -> &'static str;

    fn eval(&self, packet: &Packet<'_>) -> EvalStatus;
}

/// Object-safe option identity used for deduplication.
///
/// Implemented for every `IpsOption + Hash + Eq`; equal options always
/// hash equally.
pub trait DetectionOption: IpsOption {
    fn identity_hash(&self) -> u32;

    fn equals(&self, other: &dyn DetectionOption) -> bool;

    fn as_any(&self) -> &dyn Any;
}

impl<T> DetectionOption for T
where
    T: IpsOption + Hash + Eq,
{
    fn identity_hash(&self) -> u32 {
        let mut hasher = Lookup3Hasher::new();
        self.name().hash(&mut hasher);
        Hash::hash(self, &mut hasher);
        hasher.finish32()
    }

    fn equals(&self, other: &dyn DetectionOption) -> bool {
        self.name() == other.name()
            && other
                .as_any()
                .downcast_ref::<T>()
                .map_or(false, |other| self == other)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for dyn DetectionOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectionOption")
            .field("name", &self.name())
            .field("hash", &self.identity_hash())
            .finish()
    }
}

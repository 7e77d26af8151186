//! Detection Engine
//!
//! Holds every unique option built from the loaded rules and evaluates
//! them against packets. Equivalent clauses from different rules resolve
//! to the same option instance and run once per packet.

use crate::clause::split_clauses;
use crate::option::{DetectionOption, EvalStatus};
use crate::registry::OptionRegistry;
use crate::{IpsError, Result};
use nids_common::{AtomicCounter, MetricsRegistry, OptionCounters, Packet};
use std::collections::HashMap;
use std::sync::Arc;

/// Index of an interned option
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OptionHandle(usize);

impl OptionHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A rule: all options must match
#[derive(Clone, Debug)]
pub struct Rule {
    pub sid: u32,
    pub options: Vec<OptionHandle>,
}

/// Inspection result
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InspectionResult {
    /// SIDs of matching rules, in load order
    pub matched: Vec<u32>,

    /// Option evaluations actually performed
    pub evaluations: usize,
}

impl InspectionResult {
    /// Check if any rule matched
    pub fn has_alerts(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Engine statistics
#[derive(Debug, Default)]
pub struct EngineStats {
    pub packets_inspected: AtomicCounter,
    pub evaluations: AtomicCounter,
    pub rules_matched: AtomicCounter,
}

/// Detection engine
pub struct DetectionEngine {
    registry: OptionRegistry,

    /// Unique options, indexed by [`OptionHandle`]
    options: Vec<Arc<dyn DetectionOption>>,

    /// Identity hash to option indices
    buckets: HashMap<u32, Vec<usize>>,

    /// Per-option keyword counters, parallel to `options`
    counters: Vec<Arc<OptionCounters>>,

    rules: Vec<Rule>,

    metrics: Arc<MetricsRegistry>,

    stats: EngineStats,
}

impl DetectionEngine {
    /// Create new engine
    pub fn new(registry: OptionRegistry, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            registry,
            options: Vec::new(),
            buckets: HashMap::new(),
            counters: Vec::new(),
            rules: Vec::new(),
            metrics,
            stats: EngineStats::default(),
        }
    }

    /// Intern `option`, returning the handle of an equal option already
    /// held if there is one
    pub fn intern(&mut self, option: Arc<dyn DetectionOption>) -> Result<OptionHandle> {
        let hash = option.identity_hash();

        if let Some(bucket) = self.buckets.get(&hash) {
            if let Some(&idx) = bucket
                .iter()
                .find(|&&idx| self.options[idx].equals(option.as_ref()))
            {
                tracing::trace!(option = option.name(), hash, "reusing equivalent option");
                return Ok(OptionHandle(idx));
            }
        }

        let counters = self.metrics.option_counters(option.name())?;
        let idx = self.options.len();

        tracing::debug!(option = option.name(), hash, index = idx, "new unique option");

        self.options.push(option);
        self.counters.push(counters);
        self.buckets.entry(hash).or_default().push(idx);

        Ok(OptionHandle(idx))
    }

    /// Build and add a rule from its options body,
    /// e.g. `cvs: invalid-entry;`
    pub fn add_rule(&mut self, sid: u32, options: &str) -> Result<&Rule> {
        let clauses = split_clauses(options);
        if clauses.is_empty() {
            return Err(IpsError::MalformedClause(options.to_string()));
        }

        let mut handles = Vec::with_capacity(clauses.len());
        for clause in &clauses {
            let option = self.registry.build_clause(clause)?;
            handles.push(self.intern(option)?);
        }

        tracing::info!(sid, options = handles.len(), "rule loaded");

        let idx = self.rules.len();
        self.rules.push(Rule { sid, options: handles });
        Ok(&self.rules[idx])
    }

    pub fn option(&self, handle: OptionHandle) -> Option<&Arc<dyn DetectionOption>> {
        self.options.get(handle.0)
    }

    /// Number of distinct options held
    pub fn unique_options(&self) -> usize {
        self.options.len()
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Evaluate one option; no packet means no match
    pub fn evaluate(&self, handle: OptionHandle, packet: Option<&Packet<'_>>) -> EvalStatus {
        let (Some(option), Some(packet)) = (self.options.get(handle.0), packet) else {
            return EvalStatus::NoMatch;
        };

        let status = option.eval(packet);
        self.counters[handle.0].record(status.is_match());
        self.stats.evaluations.inc();
        status
    }

    /// Run every rule against `packet`.
    ///
    /// Each unique option runs at most once; a rule stops at its first
    /// failing option.
    pub fn inspect(&self, packet: Option<&Packet<'_>>) -> InspectionResult {
        self.stats.packets_inspected.inc();

        let Some(packet) = packet else {
            return InspectionResult::default();
        };

        let mut cache: Vec<Option<EvalStatus>> = vec![None; self.options.len()];
        let mut result = InspectionResult::default();

        for rule in &self.rules {
            let all = rule.options.iter().all(|&handle| {
                let slot = &mut cache[handle.0];
                let status = match *slot {
                    Some(status) => status,
                    None => {
                        result.evaluations += 1;
                        *slot.insert(self.evaluate(handle, Some(packet)))
                    }
                };
                status.is_match()
            });

            if all {
                tracing::debug!(sid = rule.sid, "rule matched");
                result.matched.push(rule.sid);
            }
        }

        self.stats.rules_matched.add(result.matched.len() as u64);
        result
    }

    /// Get engine statistics
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}

impl std::fmt::Debug for DetectionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionEngine")
            .field("registry", &self.registry)
            .field("options", &self.options.len())
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvs::{CvsCheck, CvsOption};
    use nids_common::CounterSnapshot;

    const EXPLOIT: &[u8] = b"Entry /cvs.cXX1.5///\nModified\n";
    const BENIGN: &[u8] = b"Entry /cvs.c/1.5///\nUnchanged\n";

    fn engine() -> DetectionEngine {
        DetectionEngine::new(
            OptionRegistry::with_builtins(),
            Arc::new(MetricsRegistry::new()),
        )
    }

    #[test]
    fn test_equivalent_clauses_intern_once() {
        let mut engine = engine();
        let a = engine.add_rule(1, "cvs: invalid-entry;").unwrap().options[0];
        let b = engine.add_rule(2, "cvs:  INVALID-ENTRY ;").unwrap().options[0];

        assert_eq!(a, b);
        assert_eq!(engine.unique_options(), 1);
        assert_eq!(engine.rules().len(), 2);
    }

    #[test]
    fn test_intern_direct() {
        let mut engine = engine();
        let a = engine
            .intern(Arc::new(CvsOption::new(CvsCheck::InvalidEntry)))
            .unwrap();
        let b = engine
            .intern(Arc::new(CvsOption::new(CvsCheck::InvalidEntry)))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(engine.option(a).unwrap().name(), "cvs");
    }

    #[test]
    fn test_shared_option_evaluated_once() {
        let mut engine = engine();
        engine.add_rule(100, "cvs: invalid-entry").unwrap();
        engine.add_rule(200, "cvs: invalid-entry").unwrap();

        let result = engine.inspect(Some(&Packet::tcp(1024, 2401, EXPLOIT)));
        assert_eq!(result.matched, vec![100, 200]);
        assert_eq!(result.evaluations, 1);

        assert_eq!(
            engine.metrics().snapshot("cvs"),
            Some(CounterSnapshot { checks: 1, matches: 1 })
        );
    }

    #[test]
    fn test_benign_traffic() {
        let mut engine = engine();
        engine.add_rule(1, "cvs: invalid-entry").unwrap();

        let result = engine.inspect(Some(&Packet::tcp(1024, 2401, BENIGN)));
        assert!(!result.has_alerts());
        assert_eq!(engine.stats().packets_inspected.get(), 1);
        assert_eq!(engine.stats().rules_matched.get(), 0);
    }

    #[test]
    fn test_absent_packet() {
        let mut engine = engine();
        let rule = engine.add_rule(1, "cvs: invalid-entry").unwrap();
        let handle = rule.options[0];

        assert_eq!(engine.evaluate(handle, None), EvalStatus::NoMatch);
        assert_eq!(engine.inspect(None), InspectionResult::default());
        assert_eq!(engine.stats().evaluations.get(), 0);
    }

    #[test]
    fn test_bad_rules_rejected() {
        let mut engine = engine();
        assert!(matches!(engine.add_rule(1, " ; "), Err(IpsError::MalformedClause(_))));
        assert!(matches!(
            engine.add_rule(2, "cvs: nope"),
            Err(IpsError::InvalidArgument { .. })
        ));
        assert!(matches!(
            engine.add_rule(3, "smtp: x"),
            Err(IpsError::UnknownKeyword(_))
        ));
        assert!(engine.rules().is_empty());
        assert_eq!(engine.unique_options(), 0);
    }
}

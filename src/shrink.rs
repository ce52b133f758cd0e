//! Deletion-based minimal core search
//!
//! Starting from the core of the all-selectors solve, selectors are tested for
//! removal from the lowest priority upwards. A selector whose removal makes
//! the query free is required; required selectors collect at the tail of the
//! working list and are never tested again. Whenever a removal keeps the
//! query forced, the oracle's (possibly smaller) core replaces the working
//! list.
//!
//! Every oracle core is a subsequence of the assumptions in the order they
//! were passed, so the working list stays in priority order throughout.

use crate::ast::GroundAtom;
use crate::engine::rustsat_adapter::RustSatAdapter;
use crate::engine::{Oracle, OracleResult, SATProver};
use crate::error::ExplainError;
use crate::instance::Model;
use crate::instrument::{ExtendedProgram, Selector};
use crate::observer::{ExplainEvent, Observer};
use crate::Result;
use rustc_hash::FxHashMap;
use rustsat_batsat::BasicSolver;
use tracing::{debug, info};

/// Result of a shrink run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShrinkOutcome {
    /// Minimal selector list, in priority order
    Core(Vec<Selector>),
    /// The query can take its opposite value; the model is a witness
    /// (synthetic atoms removed)
    FreeChoice(Model),
}

/// Shrinks selector sets of one extended program over one oracle
pub struct CoreShrinker<'a, S: SATProver = RustSatAdapter<BasicSolver>> {
    extended: &'a ExtendedProgram,
    oracle: Oracle<S>,
    by_atom: FxHashMap<GroundAtom, Selector>,
}

impl<'a> CoreShrinker<'a> {
    /// Creates a shrinker over a fresh batsat oracle
    pub fn new(extended: &'a ExtendedProgram) -> Result<Self> {
        Self::with_oracle(extended, Oracle::new())
    }
}

impl<'a, S: SATProver> CoreShrinker<'a, S> {
    /// Loads `extended` into an unused oracle and installs the marker guard
    pub fn with_oracle(extended: &'a ExtendedProgram, mut oracle: Oracle<S>) -> Result<Self> {
        oracle.load(extended.program())?;
        oracle.register_invariant_guard(&extended.marker(), &extended.exploration())?;
        let by_atom = extended
            .selectors()
            .iter()
            .map(|&selector| (extended.selector_atom(selector), selector))
            .collect();
        Ok(Self {
            extended,
            oracle,
            by_atom,
        })
    }

    /// Solves with exactly `selectors` enabled by assumption
    pub fn check(&mut self, selectors: &[Selector]) -> Result<OracleResult> {
        let assumptions: Vec<GroundAtom> = selectors
            .iter()
            .map(|&selector| self.extended.selector_atom(selector))
            .collect();
        self.oracle.solve(&assumptions)
    }

    /// Shrinks the full selector list of the extended program
    pub fn shrink(&mut self, observer: &mut dyn Observer) -> Result<ShrinkOutcome> {
        let selectors = self.extended.selectors().to_vec();
        self.shrink_from(&selectors, observer)
    }

    /// Shrinks an arbitrary starting list, read in the given order
    pub fn shrink_from(
        &mut self,
        selectors: &[Selector],
        observer: &mut dyn Observer,
    ) -> Result<ShrinkOutcome> {
        observer.on_step(&ExplainEvent::InitialCheck {
            selectors: selectors.len(),
        });
        let mut working = match self.check(selectors)? {
            OracleResult::Sat(model) => {
                info!(selectors = selectors.len(), "query is a free choice");
                observer.on_step(&ExplainEvent::FreeChoice);
                return Ok(ShrinkOutcome::FreeChoice(self.witness(&model)));
            }
            OracleResult::Unsat(core) => self.to_selectors(&core)?,
        };
        info!(
            selectors = selectors.len(),
            core = working.len(),
            "initial core"
        );

        let mut required = 0;
        while required < working.len() {
            let position = working.len() - required - 1;
            let mut candidate = working.clone();
            let removed = candidate.remove(position);
            let removed_atom = self.extended.selector_atom(removed);
            match self.check(&candidate)? {
                OracleResult::Unsat(core) => {
                    let core = self.to_selectors(&core)?;
                    debug!(removed = %removed_atom, from = working.len(), to = core.len(), "dropped");
                    observer.on_step(&ExplainEvent::Shrunk {
                        from: working.len(),
                        to: core.len(),
                    });
                    working = core;
                }
                OracleResult::Sat(_) => {
                    debug!(removed = %removed_atom, "required");
                    observer.on_step(&ExplainEvent::Required {
                        selector: removed,
                        atom: &removed_atom,
                    });
                    required += 1;
                }
            }
        }

        info!(
            core = working.len(),
            calls = self.oracle.calls(),
            "minimal core found"
        );
        observer.on_step(&ExplainEvent::Terminated {
            selectors: working.len(),
        });
        Ok(ShrinkOutcome::Core(working))
    }

    /// The oracle, for statistics
    pub fn oracle(&self) -> &Oracle<S> {
        &self.oracle
    }

    fn to_selectors(&self, core: &[GroundAtom]) -> Result<Vec<Selector>> {
        core.iter()
            .map(|atom| {
                self.by_atom.get(atom).copied().ok_or_else(|| {
                    ExplainError::Inconsistency(format!("oracle core contains non-selector {}", atom))
                })
            })
            .collect()
    }

    fn witness(&self, model: &Model) -> Model {
        let vocabulary = self.extended.vocabulary();
        model.without_predicates(&[
            vocabulary.selector.as_str(),
            vocabulary.marker.as_str(),
            vocabulary.exploration.as_str(),
        ])
    }
}

//! Progress reporting for explanation runs
//!
//! The explainer reports milestones to an injected [`Observer`]. Observers
//! only watch: nothing they do changes the result.

use crate::ast::GroundAtom;
use crate::instrument::Selector;
use crate::trace::DerivationStep;
use std::fmt;

/// A milestone of an explanation run
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ExplainEvent<'a> {
    /// The first oracle call over all selectors is about to run
    InitialCheck {
        /// Number of selectors assumed
        selectors: usize,
    },
    /// The query can take the opposite value: nothing to explain
    FreeChoice,
    /// An oracle core replaced the working list
    Shrunk {
        /// Working list length before
        from: usize,
        /// Working list length after
        to: usize,
    },
    /// Removing this selector let the query flip
    Required {
        /// The selector
        selector: Selector,
        /// Its atom in the explainer's vocabulary
        atom: &'a GroundAtom,
    },
    /// The shrinker reached a minimal core
    Terminated {
        /// Size of the core
        selectors: usize,
    },
    /// The tracer derived one more atom
    TraceStep(&'a DerivationStep),
}

impl fmt::Display for ExplainEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExplainEvent::InitialCheck { selectors } => {
                write!(f, "initial check over {} selectors", selectors)
            }
            ExplainEvent::FreeChoice => write!(f, "free choice"),
            ExplainEvent::Shrunk { from, to } => write!(f, "shrunk {} -> {}", from, to),
            ExplainEvent::Required { atom, .. } => write!(f, "required {}", atom),
            ExplainEvent::Terminated { selectors } => {
                write!(f, "terminated with {} selectors", selectors)
            }
            ExplainEvent::TraceStep(step) => write!(f, "step {}", step),
        }
    }
}

/// Receives explanation milestones
pub trait Observer {
    /// Called once per milestone, in order
    fn on_step(&mut self, event: &ExplainEvent<'_>);
}

/// Ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl Observer for NoopObserver {
    fn on_step(&mut self, _event: &ExplainEvent<'_>) {}
}

impl<F: FnMut(&ExplainEvent<'_>)> Observer for F {
    fn on_step(&mut self, event: &ExplainEvent<'_>) {
        self(event)
    }
}

/// Records every event as a line of text
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    lines: Vec<String>,
}

impl EventLog {
    /// Creates an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded lines, oldest first
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Observer for EventLog {
    fn on_step(&mut self, event: &ExplainEvent<'_>) {
        self.lines.push(event.to_string());
    }
}

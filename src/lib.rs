//! # corexplain-rs
//!
//! Explains why a ground literal holds, or fails to hold, in one answer set of
//! a logic program.
//!
//! The program is instrumented with one selector guard per rule and per
//! answer-set fact. A deletion-based search over an incremental SAT oracle
//! shrinks the active selectors to a minimal unsatisfiable core: a subset of
//! rules and facts that on its own forces the query to its observed value.
//! Optionally, the reduced program is replayed step by step to obtain a
//! derivation trace, which is turned into a causal graph rooted at the query.
//!
//! ## Example
//!
//! ```rust,ignore
//! use corexplain_rs::parser::{parse_atom, parse_program};
//! use corexplain_rs::instance::AnswerSet;
//! use corexplain_rs::solver::{Explainer, Explanation, Options};
//!
//! let program = parse_program("a. b :- a.")?;
//! let answer_set = AnswerSet::parse_listing("a b")?;
//! let query = vec![parse_atom("b")?];
//!
//! let explainer = Explainer::new(Options::default());
//! match explainer.explain(&program, &answer_set, &query)? {
//!     Explanation::Core { core, extended, .. } => {
//!         print!("{}", extended.annotated(&core));
//!     }
//!     Explanation::FreeChoice { .. } => println!("free choice"),
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2024_compatibility)]

/// Ground terms, atoms, rules and programs
pub mod ast;

/// Parser for the ground rule language
pub mod parser;

/// Answer sets and oracle models
pub mod instance;

/// Ground program to CNF translation
pub mod cnf;

/// SAT solver seam and the explanation oracle
pub mod engine;

/// Selector instrumentation
pub mod instrument;

/// Minimal core search
pub mod shrink;

/// Step-wise derivation replay
pub mod trace;

/// Causal graph over a derivation
pub mod graph;

/// Progress reporting
pub mod observer;

/// Main explanation API
pub mod solver;

/// JSON request/response boundary
pub mod service;

/// Error types
pub mod error {
    //! Error types for corexplain-rs

    use thiserror::Error;

    /// Errors that can occur while explaining
    #[derive(Error, Debug)]
    pub enum ExplainError {
        /// Program or atom text could not be parsed
        #[error("parse error at {line}:{column} near `{fragment}`: {message}")]
        Parse {
            /// 1-based line
            line: usize,
            /// 1-based column
            column: usize,
            /// Source text starting at the error
            fragment: String,
            /// What went wrong
            message: String,
        },

        /// The request is well-formed text but makes no sense
        #[error("malformed input: {0}")]
        MalformedInput(String),

        /// The oracle could not accept the program
        #[error("grounding failed: {0}")]
        Grounding(String),

        /// The SAT backend failed while solving
        #[error("oracle failure: {0}")]
        Oracle(String),

        /// An internal consistency check failed
        #[error("inconsistency: {0}")]
        Inconsistency(String),

        /// JSON encoding or decoding failed
        #[error("serialization: {0}")]
        Serialization(#[from] serde_json::Error),
    }

    /// Result type for corexplain-rs operations
    pub type Result<T> = std::result::Result<T, ExplainError>;
}

// Re-export commonly used types
pub use error::{ExplainError, Result};
pub use instrument::Selector;
pub use solver::{Explainer, Explanation, Options};

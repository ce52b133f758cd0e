//! JSON request/response boundary
//!
//! One operation: program text, answer-set entries (a leading `~` marks a
//! false atom) and query atoms in; the selector-annotated program or a free
//! choice indicator out. Traces and graphs are opt-in. Failures become
//! `{"error": "..."}` objects.

use crate::ast::GroundAtom;
use crate::error::ExplainError;
use crate::graph::Graph;
use crate::instance::AnswerSet;
use crate::parser::{parse_atom, parse_program};
use crate::solver::{Explainer, Explanation, Options};
use crate::trace::DerivationStep;
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

/// An explanation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRequest {
    /// Ground program text
    pub program: String,
    /// Answer-set entries such as `a` or `~b`
    pub answer_set: Vec<String>,
    /// Query atoms
    pub query: Vec<String>,
    /// Explicit priority list of atoms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Vec<String>>,
    /// Include the derivation trace
    #[serde(default)]
    pub trace: bool,
    /// Include the causal graph
    #[serde(default)]
    pub graph: bool,
}

impl ServiceRequest {
    /// Parses a request from JSON
    pub fn parse(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// An explanation response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ServiceResponse {
    /// The query is forced
    Explained {
        /// The instrumented program followed by the core selectors
        program: String,
        /// Derivation steps, when requested
        #[serde(skip_serializing_if = "Option::is_none")]
        trace: Option<Vec<DerivationStep>>,
        /// Causal graph, when requested
        #[serde(skip_serializing_if = "Option::is_none")]
        graph: Option<Graph>,
    },
    /// Nothing forces the query
    FreeChoice {
        /// Always true
        free_choice: bool,
        /// True atoms of an answer in which the query flips
        witness: Vec<String>,
    },
}

impl ServiceResponse {
    /// Serializes the response
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn parse_atoms(entries: &[String]) -> Result<Vec<GroundAtom>> {
    entries.iter().map(|entry| parse_atom(entry)).collect()
}

/// Runs one request
pub fn handle(request: &ServiceRequest) -> Result<ServiceResponse> {
    let program = parse_program(&request.program)?;
    let answer_set = AnswerSet::parse(&request.answer_set)?;
    let query = parse_atoms(&request.query)?;
    if query.is_empty() {
        return Err(ExplainError::MalformedInput("the query has no atoms".to_string()));
    }

    let explainer = Explainer::new(Options {
        trace: request.trace,
        graph: request.graph,
        ..Options::default()
    });
    let explanation = match &request.priority {
        Some(priority) => {
            explainer.explain_with_priority(&program, &answer_set, &query, &parse_atoms(priority)?)?
        }
        None => explainer.explain(&program, &answer_set, &query)?,
    };

    Ok(match explanation {
        Explanation::Core {
            core,
            extended,
            trace,
            graph,
            ..
        } => ServiceResponse::Explained {
            program: extended.annotated(&core),
            trace: request
                .trace
                .then(|| trace.map(|t| t.steps().to_vec()))
                .flatten(),
            graph,
        },
        Explanation::FreeChoice { witness, .. } => ServiceResponse::FreeChoice {
            free_choice: true,
            witness: witness.atoms().map(ToString::to_string).collect(),
        },
    })
}

/// Answers a JSON request with a JSON response, never failing
pub fn respond(json: &str) -> String {
    let response = ServiceRequest::parse(json)
        .and_then(|request| handle(&request))
        .and_then(|response| response.to_json());
    match response {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "request failed");
            json!({ "error": e.to_string() }).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explained_response_carries_annotated_program() {
        let response = respond(r#"{"program": "{c}. :- not c.", "answer_set": ["c"], "query": ["c"]}"#);
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        let program = value["program"].as_str().unwrap();
        assert!(program.ends_with(
            "%* the selectors causing the inference *%\n__mus__(program,1).  %* :- not c. *%\n"
        ));
        assert!(value.get("trace").is_none());
    }

    #[test]
    fn free_choice_response() {
        let response = respond(r#"{"program": "{c}.", "answer_set": ["c"], "query": ["c"]}"#);
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["free_choice"], true);
    }

    #[test]
    fn errors_become_objects() {
        let response = respond(r#"{"program": "a :- X.", "answer_set": [], "query": ["a"]}"#);
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(value["error"].as_str().unwrap().contains("parse error"));

        let response = respond("not json");
        let value: serde_json::Value = serde_json::from_str(&response).unwrap();
        assert!(value["error"].as_str().unwrap().starts_with("serialization"));
    }
}

//! Causal graph over a derivation trace
//!
//! Nodes are derivation steps; an edge points from a forced atom to an atom
//! that justified it. Edges only point to strictly earlier steps, so the
//! graph is acyclic. The exported graph keeps what is reachable from the
//! query nodes; nodes derived from bare facts are terminals.

use crate::ast::GroundAtom;
use crate::trace::{DerivationStep, GroundRelation, Justification, Trace};
use crate::Result;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt::Write;
use tracing::debug;

/// A derived atom
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    /// The atom
    pub atom: GroundAtom,
    /// Its derived value
    pub value: bool,
    /// How it was derived
    pub justification: Justification,
    /// Position in the trace
    pub order: usize,
}

impl From<&DerivationStep> for GraphNode {
    fn from(step: &DerivationStep) -> Self {
        Self {
            atom: step.atom.clone(),
            value: step.value,
            justification: step.justification,
            order: step.order,
        }
    }
}

/// A causal dependency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    /// The forced atom
    pub from: GroundAtom,
    /// An atom that justified it
    pub to: GroundAtom,
}

/// The causal graph, nodes in trace order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Graph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl Graph {
    /// Builds the graph of `trace` restricted to what `query` depends on
    pub fn build(trace: &Trace, relation: &GroundRelation, query: &[GroundAtom]) -> Self {
        GraphBuilder::new(trace, relation).build(query)
    }

    /// Nodes in trace order
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Edges grouped by source node, sources in trace order
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// The node of `atom`
    pub fn node(&self, atom: &GroundAtom) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| &node.atom == atom)
    }

    /// Atoms that justified `atom`
    pub fn successors<'a>(&'a self, atom: &'a GroundAtom) -> impl Iterator<Item = &'a GroundAtom> + 'a {
        self.edges
            .iter()
            .filter(move |edge| &edge.from == atom)
            .map(|edge| &edge.to)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// JSON object with `nodes` and `edges` arrays
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The graph as `node(atom,value,justification,order).` and
    /// `edge(from,to).` facts, one per line
    pub fn as_facts(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            let _ = writeln!(
                out,
                "node({},{},{},{}).",
                node.atom, node.value, node.justification, node.order
            );
        }
        for edge in &self.edges {
            let _ = writeln!(out, "edge({},{}).", edge.from, edge.to);
        }
        out
    }
}

/// Computes edges of a trace against the relation it was derived from
pub struct GraphBuilder<'a> {
    trace: &'a Trace,
    relation: &'a GroundRelation,
}

impl<'a> GraphBuilder<'a> {
    /// Creates a builder
    pub fn new(trace: &'a Trace, relation: &'a GroundRelation) -> Self {
        Self { trace, relation }
    }

    /// Returns whether the step was derived from a bare fact
    pub fn is_fact(&self, step: &DerivationStep) -> bool {
        step.justification == Justification::Support
            && step
                .rule
                .and_then(|id| self.relation.get(id))
                .is_some_and(|rule| rule.has_empty_body() && rule.head.contains(&step.atom))
    }

    /// Atoms that justified `step`, each assigned at an earlier step
    pub fn justifiers(&self, step: &DerivationStep) -> Vec<GroundAtom> {
        if self.is_fact(step) {
            return Vec::new();
        }
        let earlier = |atom: &GroundAtom| {
            atom != &step.atom && self.trace.order_of(atom).is_some_and(|order| order < step.order)
        };
        let earlier_with = |atom: &GroundAtom, value: bool| {
            earlier(atom) && self.trace.value_of(atom) == Some(value)
        };
        let Some(rule) = step.rule.and_then(|id| self.relation.get(id)) else {
            return self.lack_of_support(step).into_iter().collect();
        };

        let mut out: Vec<GroundAtom> = Vec::new();
        match step.justification {
            Justification::Support if rule.in_body(&step.atom) => {
                // the only possible supporter of a true head atom
                out.extend(rule.head.iter().filter(|a| earlier_with(a, true)).cloned());
                out.extend(rule.body().map(|(a, _)| a).filter(|a| earlier(a)).cloned());
            }
            Justification::Support => {
                out.extend(rule.body().map(|(a, _)| a).filter(|a| earlier(a)).cloned());
                out.extend(rule.head.iter().filter(|a| earlier_with(a, false)).cloned());
            }
            Justification::Choice => {
                out.extend(rule.body().map(|(a, _)| a).filter(|a| earlier(a)).cloned());
                out.extend(rule.head.iter().filter(|a| earlier_with(a, true)).cloned());
            }
            Justification::Constraint => {
                out.extend(rule.atoms().filter(|a| earlier(a)).cloned());
            }
            Justification::LackOfSupport => {
                out.extend(self.lack_of_support(step));
            }
        }
        let mut seen = FxHashSet::default();
        out.retain(|atom| seen.insert(atom.clone()));
        out
    }

    /// The earliest falsified body literal among the rules that could
    /// support the atom; ties go to the lower rule id
    fn lack_of_support(&self, step: &DerivationStep) -> Option<GroundAtom> {
        self.relation
            .supporters(&step.atom)
            .filter_map(|rule| {
                rule.body()
                    .filter_map(|(atom, positive)| {
                        let falsifier = self.trace.step_of(atom)?;
                        (falsifier.value != positive && falsifier.order < step.order)
                            .then_some((falsifier.order, atom))
                    })
                    .min_by_key(|(order, _)| *order)
                    .map(|(order, atom)| (order, rule.id, atom))
            })
            .min_by_key(|(order, id, _)| (*order, *id))
            .map(|(_, _, atom)| atom.clone())
    }

    /// Builds the graph reachable from the query atoms
    pub fn build(&self, query: &[GroundAtom]) -> Graph {
        let mut reachable: FxHashSet<GroundAtom> = FxHashSet::default();
        let mut queue: VecDeque<GroundAtom> = VecDeque::new();
        for atom in query {
            if self.trace.step_of(atom).is_some() && reachable.insert(atom.clone()) {
                queue.push_back(atom.clone());
            }
        }

        let mut edges = Vec::new();
        while let Some(atom) = queue.pop_front() {
            let Some(step) = self.trace.step_of(&atom) else {
                continue;
            };
            for target in self.justifiers(step) {
                if reachable.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
                edges.push(GraphEdge {
                    from: atom.clone(),
                    to: target,
                });
            }
        }

        let nodes: Vec<GraphNode> = self
            .trace
            .steps()
            .iter()
            .filter(|step| reachable.contains(&step.atom))
            .map(GraphNode::from)
            .collect();
        edges.sort_by_key(|edge| self.trace.order_of(&edge.from));
        debug!(
            nodes = nodes.len(),
            edges = edges.len(),
            steps = self.trace.len(),
            "built causal graph"
        );
        Graph { nodes, edges }
    }
}

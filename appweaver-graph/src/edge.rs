//! Edges and conditional routers.
//!
//! A node has either one unconditional edge or one conditional edge table,
//! never both. Conditional edges pair a [`Router`] with a label→target map;
//! the builder rejects any router/label combination that is not wired.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Synthetic entry marker. Conditional edges from `START` select the first
/// node of a run based on the seeded state.
pub const START: &str = "__start__";

/// Synthetic exit marker. Terminal nodes edge to `END`.
pub const END: &str = "__end__";

/// An unconditional edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Source node name.
    pub from: String,
    /// Target node name (or [`END`]).
    pub to: String,
}

impl Edge {
    /// Create a new edge.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A pure routing function over state, with a declared label vocabulary.
///
/// `select` must be total over the state fields it inspects and must only
/// return labels from `labels`; the declared vocabulary is what the builder
/// checks against the wired targets.
pub struct Router<S> {
    name: String,
    labels: Vec<&'static str>,
    select: Arc<dyn Fn(&S) -> &'static str + Send + Sync>,
}

impl<S> Router<S> {
    /// Create a new router.
    pub fn new<F>(name: impl Into<String>, labels: &[&'static str], select: F) -> Self
    where
        F: Fn(&S) -> &'static str + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            labels: labels.to_vec(),
            select: Arc::new(select),
        }
    }

    /// The router's name, for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared label vocabulary.
    pub fn labels(&self) -> &[&'static str] {
        &self.labels
    }

    /// Pick the edge label for the current state.
    pub fn route(&self, state: &S) -> &'static str {
        (self.select)(state)
    }
}

impl<S> fmt::Debug for Router<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("name", &self.name)
            .field("labels", &self.labels)
            .finish()
    }
}

impl<S> Clone for Router<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            labels: self.labels.clone(),
            select: Arc::clone(&self.select),
        }
    }
}

/// A conditional edge table: router plus label→target wiring.
#[derive(Debug, Clone)]
pub struct ConditionalEdges<S> {
    /// Source node name (or [`START`]).
    pub from: String,
    /// The routing function.
    pub router: Router<S>,
    /// Wired targets per label. Targets may be [`END`].
    pub targets: BTreeMap<&'static str, String>,
}

impl<S> ConditionalEdges<S> {
    /// Create a conditional edge table.
    pub fn new(
        from: impl Into<String>,
        router: Router<S>,
        targets: &[(&'static str, &str)],
    ) -> Self {
        Self {
            from: from.into(),
            router,
            targets: targets
                .iter()
                .map(|(label, to)| (*label, to.to_string()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestState {
        done: bool,
    }

    #[test]
    fn test_router_routes_by_state() {
        let router = Router::new("after_check", &["success", "next"], |s: &TestState| {
            if s.done {
                "success"
            } else {
                "next"
            }
        });

        assert_eq!(router.route(&TestState { done: true }), "success");
        assert_eq!(router.route(&TestState { done: false }), "next");
    }

    #[test]
    fn test_conditional_edges_wiring() {
        let router = Router::new("r", &["a", "b"], |_: &TestState| "a");
        let edges = ConditionalEdges::new("start", router, &[("a", "node_a"), ("b", END)]);

        assert_eq!(edges.targets.get("a").map(String::as_str), Some("node_a"));
        assert_eq!(edges.targets.get("b").map(String::as_str), Some(END));
    }

    #[test]
    fn test_edge_new() {
        let edge = Edge::new("classify", "design");
        assert_eq!(edge.from, "classify");
        assert_eq!(edge.to, "design");
    }
}

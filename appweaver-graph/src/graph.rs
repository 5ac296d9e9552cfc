//! Graph builder and compiled workflow.
//!
//! [`GraphBuilder`] registers nodes, unconditional edges, and conditional
//! edge tables, then validates the wiring and produces a [`CompiledGraph`].
//! Validation is strict: unknown targets, duplicate nodes, conflicting edge
//! kinds, and router vocabularies that do not exactly match their wired
//! labels are all build-time errors, not silent defaults.

use crate::edge::{ConditionalEdges, Edge, Router, END, START};
use crate::error::{GraphError, GraphResult};
use crate::node::Node;
use crate::persistence::Checkpointer;
use crate::state::WorkflowState;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Where a run begins.
#[derive(Debug, Clone)]
pub(crate) enum EntryPoint<S> {
    /// A fixed first node.
    Fixed(String),
    /// A router off the synthetic start marker.
    Routed(ConditionalEdges<S>),
}

/// Builder for a workflow graph.
pub struct GraphBuilder<S: WorkflowState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    duplicates: Vec<String>,
    edges: Vec<Edge>,
    conditional: Vec<ConditionalEdges<S>>,
    entry: Option<EntryPoint<S>>,
    checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    max_steps: u32,
}

impl<S: WorkflowState> GraphBuilder<S> {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
            duplicates: Vec::new(),
            edges: Vec::new(),
            conditional: Vec::new(),
            entry: None,
            checkpointer: None,
            max_steps: 50,
        }
    }

    /// Register a node under a unique name.
    pub fn node(self, name: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        self.node_arc(name, Arc::new(node))
    }

    /// Register an already-shared node.
    pub fn node_arc(mut self, name: impl Into<String>, node: Arc<dyn Node<S>>) -> Self {
        let name = name.into();
        if self.nodes.contains_key(&name) {
            self.duplicates.push(name.clone());
        }
        self.nodes.insert(name, node);
        self
    }

    /// Add an unconditional edge, always taken after `from` completes.
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge::new(from, to));
        self
    }

    /// Add a conditional edge table after `from`.
    pub fn conditional(
        mut self,
        from: impl Into<String>,
        router: Router<S>,
        targets: &[(&'static str, &str)],
    ) -> Self {
        let from = from.into();
        let edges = ConditionalEdges::new(from.clone(), router, targets);
        if from == START {
            self.entry = Some(EntryPoint::Routed(edges));
        } else {
            self.conditional.push(edges);
        }
        self
    }

    /// Set a fixed entry node.
    pub fn entry(mut self, name: impl Into<String>) -> Self {
        self.entry = Some(EntryPoint::Fixed(name.into()));
        self
    }

    /// Attach a checkpoint store keyed by thread id.
    pub fn checkpointer(mut self, store: Arc<dyn Checkpointer<S>>) -> Self {
        self.checkpointer = Some(store);
        self
    }

    /// Set the default step ceiling for runs of this graph.
    pub fn max_steps(mut self, max: u32) -> Self {
        self.max_steps = max;
        self
    }

    fn check_target(&self, from: &str, to: &str) -> GraphResult<()> {
        if to != END && !self.nodes.contains_key(to) {
            return Err(GraphError::node_not_found(format!("{to} (edge from '{from}')")));
        }
        Ok(())
    }

    fn check_conditional(&self, edges: &ConditionalEdges<S>) -> GraphResult<()> {
        let declared: BTreeSet<&str> = edges.router.labels().iter().copied().collect();
        let wired: BTreeSet<&str> = edges.targets.keys().copied().collect();
        if declared != wired {
            let missing: Vec<&str> = declared.difference(&wired).copied().collect();
            let extra: Vec<&str> = wired.difference(&declared).copied().collect();
            return Err(GraphError::label_mismatch(
                &edges.from,
                format!("declared but unwired: {missing:?}; wired but undeclared: {extra:?}"),
            ));
        }
        for to in edges.targets.values() {
            self.check_target(&edges.from, to)?;
        }
        Ok(())
    }

    /// Validate the wiring and produce a runnable graph.
    pub fn build(self) -> GraphResult<CompiledGraph<S>> {
        if let Some(name) = self.duplicates.first() {
            return Err(GraphError::DuplicateNode(name.clone()));
        }

        let entry = self
            .entry
            .clone()
            .ok_or_else(|| GraphError::NoEntryPoint(self.name.clone()))?;

        match &entry {
            EntryPoint::Fixed(name) => {
                if !self.nodes.contains_key(name) {
                    return Err(GraphError::node_not_found(name));
                }
            }
            EntryPoint::Routed(edges) => self.check_conditional(edges)?,
        }

        let mut plain: HashMap<String, String> = HashMap::new();
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from) {
                return Err(GraphError::node_not_found(&edge.from));
            }
            self.check_target(&edge.from, &edge.to)?;
            if plain.insert(edge.from.clone(), edge.to.clone()).is_some() {
                return Err(GraphError::ConflictingEdges(edge.from.clone()));
            }
        }

        let mut conditional: HashMap<String, ConditionalEdges<S>> = HashMap::new();
        for edges in &self.conditional {
            if !self.nodes.contains_key(&edges.from) {
                return Err(GraphError::node_not_found(&edges.from));
            }
            self.check_conditional(edges)?;
            if plain.contains_key(&edges.from) {
                return Err(GraphError::ConflictingEdges(edges.from.clone()));
            }
            if conditional.insert(edges.from.clone(), edges.clone()).is_some() {
                return Err(GraphError::ConflictingEdges(edges.from.clone()));
            }
        }

        // Every node needs a way out; a node without one would strand the run.
        for name in self.nodes.keys() {
            if !plain.contains_key(name) && !conditional.contains_key(name) {
                return Err(GraphError::DeadEnd(name.clone()));
            }
        }

        Ok(CompiledGraph {
            name: self.name,
            nodes: self.nodes,
            plain_edges: plain,
            conditional_edges: conditional,
            entry,
            checkpointer: self.checkpointer,
            max_steps: self.max_steps,
        })
    }
}

/// A validated, runnable workflow graph.
///
/// See [`CompiledGraph::invoke`](crate::executor) for the execution contract.
pub struct CompiledGraph<S: WorkflowState> {
    pub(crate) name: String,
    pub(crate) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(crate) plain_edges: HashMap<String, String>,
    pub(crate) conditional_edges: HashMap<String, ConditionalEdges<S>>,
    pub(crate) entry: EntryPoint<S>,
    pub(crate) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(crate) max_steps: u32,
}

impl<S: WorkflowState> CompiledGraph<S> {
    /// The graph's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered node names.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of registered nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges (unconditional plus wired conditional targets).
    pub fn edge_count(&self) -> usize {
        self.plain_edges.len()
            + self
                .conditional_edges
                .values()
                .map(|c| c.targets.len())
                .sum::<usize>()
    }

    /// The checkpoint store, if one is attached.
    pub fn checkpointer(&self) -> Option<&Arc<dyn Checkpointer<S>>> {
        self.checkpointer.as_ref()
    }
}

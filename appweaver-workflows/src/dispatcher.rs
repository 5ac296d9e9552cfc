//! Registry mapping domains to their sub-graph wrapper nodes.
//!
//! Adding a domain to the system means registering its bridge here; the
//! coordinator graph derives its dispatch edges and the sequencer's set of
//! supported domains from the registry, so the sequencer itself never
//! changes.

use crate::coordinator::state::CoordinatorState;
use crate::subgraph::{DomainBridge, SubgraphNode};
use appweaver_core::Domain;
use appweaver_graph::Node;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Domain→handler registry consumed by the coordinator graph builder.
#[derive(Default)]
pub struct DomainDispatcher {
    handlers: HashMap<Domain, Arc<dyn Node<CoordinatorState>>>,
}

impl DomainDispatcher {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain bridge, wrapping it in a [`SubgraphNode`].
    pub fn register<B: DomainBridge>(self, bridge: B) -> Self {
        let domain = bridge.domain();
        self.register_node(domain, Arc::new(SubgraphNode::new(bridge)))
    }

    /// Register a raw handler node for a domain. Later registrations for the
    /// same domain replace earlier ones.
    pub fn register_node(
        mut self,
        domain: Domain,
        node: Arc<dyn Node<CoordinatorState>>,
    ) -> Self {
        self.handlers.insert(domain, node);
        self
    }

    /// The set of registered domains.
    pub fn domains(&self) -> HashSet<Domain> {
        self.handlers.keys().copied().collect()
    }

    /// True if the domain has a handler.
    pub fn supports(&self, domain: Domain) -> bool {
        self.handlers.contains_key(&domain)
    }

    /// Number of registered domains.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// True if no domain is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Consume the registry, yielding each domain with its handler.
    pub fn into_handlers(
        self,
    ) -> impl Iterator<Item = (Domain, Arc<dyn Node<CoordinatorState>>)> {
        self.handlers.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::state::CoordinatorPatch;
    use appweaver_graph::NodeError;
    use async_trait::async_trait;

    struct StubNode(&'static str);

    #[async_trait]
    impl Node<CoordinatorState> for StubNode {
        fn name(&self) -> &str {
            self.0
        }

        async fn run(&self, _: &CoordinatorState) -> Result<CoordinatorPatch, NodeError> {
            Ok(CoordinatorPatch::default())
        }
    }

    #[test]
    fn test_registration_and_lookup() {
        let dispatcher = DomainDispatcher::new()
            .register_node(Domain::Application, Arc::new(StubNode("application")))
            .register_node(Domain::Object, Arc::new(StubNode("object")));

        assert_eq!(dispatcher.len(), 2);
        assert!(dispatcher.supports(Domain::Application));
        assert!(!dispatcher.supports(Domain::Layout));
        assert_eq!(dispatcher.domains().len(), 2);
    }

    #[test]
    fn test_reregistration_replaces() {
        let dispatcher = DomainDispatcher::new()
            .register_node(Domain::Object, Arc::new(StubNode("first")))
            .register_node(Domain::Object, Arc::new(StubNode("second")));

        assert_eq!(dispatcher.len(), 1);
        let (_, node) = dispatcher.into_handlers().next().unwrap();
        assert_eq!(node.name(), "second");
    }
}

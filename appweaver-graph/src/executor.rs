//! Sequential graph execution.
//!
//! One logical thread of control per run: each node is awaited to completion
//! (including any nested sub-graph run) before routing picks the next node.
//! Given the same collaborator responses, a run is deterministic.

use crate::edge::END;
use crate::error::{GraphError, GraphResult};
use crate::graph::{CompiledGraph, EntryPoint};
use crate::state::{generate_thread_id, RunConfig, RunReport, StatePatch, WorkflowState};
use tracing::{debug, info, span, warn, Level};

impl<S: WorkflowState> CompiledGraph<S> {
    /// Run the graph to a terminal node.
    ///
    /// If a checkpointer is attached and holds state for the config's thread
    /// id, that state is loaded first; otherwise the run starts from the
    /// state's declared default. The seed patch is then merged, the entry
    /// node resolved, and the node→merge→route loop executed until a router
    /// or edge reaches [`END`]. The state is checkpointed after every merge.
    ///
    /// Node `Err` returns are converted into
    /// [`StatePatch::for_node_error`] patches so a defect inside one node
    /// still lands the run at its error terminal instead of aborting.
    pub async fn invoke(&self, seed: S::Patch, config: RunConfig) -> GraphResult<RunReport<S>> {
        let thread_id = config.thread_id.unwrap_or_else(generate_thread_id);
        let run_span = span!(Level::INFO, "workflow_run", graph = %self.name, thread_id = %thread_id);
        let _guard = run_span.enter();
        info!("starting workflow run");

        let mut state = match &self.checkpointer {
            Some(store) => store
                .load(&thread_id)
                .await
                .map_err(|e| GraphError::Checkpoint(e.to_string()))?
                .unwrap_or_default(),
            None => S::default(),
        };
        state.apply(seed);

        let max_steps = config.max_steps.unwrap_or(self.max_steps);

        let mut current = match &self.entry {
            EntryPoint::Fixed(name) => name.clone(),
            EntryPoint::Routed(edges) => {
                let label = edges.router.route(&state);
                edges
                    .targets
                    .get(label)
                    .cloned()
                    .ok_or_else(|| GraphError::UnwiredLabel {
                        node: edges.from.clone(),
                        label: label.to_string(),
                    })?
            }
        };

        let mut visited = Vec::new();
        let mut steps = 0u32;

        while current != END {
            steps += 1;
            if steps > max_steps {
                return Err(GraphError::MaxStepsExceeded(max_steps));
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| GraphError::node_not_found(&current))?;

            debug!(node = %current, step = steps, "executing node");
            let patch = match node.run(&state).await {
                Ok(patch) => patch,
                Err(err) => {
                    warn!(node = %current, error = %err, "node failed; recording error patch");
                    S::Patch::for_node_error(&current, &err.message)
                }
            };
            state.apply(patch);

            if let Some(store) = &self.checkpointer {
                store
                    .save(&thread_id, &state)
                    .await
                    .map_err(|e| GraphError::Checkpoint(e.to_string()))?;
            }

            visited.push(current.clone());
            current = self.next_node(&current, &state)?;
        }

        info!(steps, "workflow run reached END");
        Ok(RunReport {
            state,
            steps,
            visited,
            thread_id,
        })
    }

    fn next_node(&self, from: &str, state: &S) -> GraphResult<String> {
        if let Some(to) = self.plain_edges.get(from) {
            return Ok(to.clone());
        }
        if let Some(edges) = self.conditional_edges.get(from) {
            let label = edges.router.route(state);
            debug!(node = %from, label, "routed");
            return edges
                .targets
                .get(label)
                .cloned()
                .ok_or_else(|| GraphError::UnwiredLabel {
                    node: from.to_string(),
                    label: label.to_string(),
                });
        }
        Err(GraphError::DeadEnd(from.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{Router, START};
    use crate::graph::GraphBuilder;
    use crate::node::{FunctionNode, NodeError};
    use crate::persistence::InMemoryCheckpointer;
    use crate::state::{LogUpdate, Update};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, Serialize, Deserialize)]
    struct TestState {
        counter: i32,
        trail: Vec<String>,
        error: Option<String>,
        done: bool,
    }

    #[derive(Debug, Default)]
    struct TestPatch {
        counter: Update<i32>,
        trail: LogUpdate<String>,
        error: Update<Option<String>>,
        done: Update<bool>,
    }

    impl StatePatch for TestPatch {
        fn for_node_error(node: &str, message: &str) -> Self {
            Self {
                error: Update::set(Some(format!("{node}: {message}"))),
                ..Self::default()
            }
        }
    }

    impl WorkflowState for TestState {
        type Patch = TestPatch;

        fn apply(&mut self, patch: TestPatch) {
            patch.counter.apply(&mut self.counter);
            patch.trail.apply(&mut self.trail);
            patch.error.apply(&mut self.error);
            patch.done.apply(&mut self.done);
        }
    }

    fn step_node(name: &'static str) -> impl crate::node::Node<TestState> {
        FunctionNode::new(name, move |state: TestState| async move {
            Ok::<_, NodeError>(TestPatch {
                counter: Update::set(state.counter + 1),
                trail: LogUpdate::push(name.to_string()),
                ..TestPatch::default()
            })
        })
    }

    fn finish_node() -> impl crate::node::Node<TestState> {
        FunctionNode::new("finish", |_: TestState| async move {
            Ok::<_, NodeError>(TestPatch {
                done: Update::set(true),
                ..TestPatch::default()
            })
        })
    }

    #[tokio::test]
    async fn test_linear_run() {
        let graph = GraphBuilder::<TestState>::new("linear")
            .node("a", step_node("a"))
            .node("b", step_node("b"))
            .node("finish", finish_node())
            .entry("a")
            .edge("a", "b")
            .edge("b", "finish")
            .edge("finish", END)
            .build()
            .unwrap();

        let report = graph
            .invoke(TestPatch::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(report.visited, vec!["a", "b", "finish"]);
        assert!(report.state.done);
    }

    #[tokio::test]
    async fn test_conditional_loop_until_done() {
        let router = Router::new("check", &["again", "done"], |s: &TestState| {
            if s.counter >= 3 {
                "done"
            } else {
                "again"
            }
        });
        let graph = GraphBuilder::<TestState>::new("loop")
            .node("work", step_node("work"))
            .node("finish", finish_node())
            .entry("work")
            .conditional("work", router, &[("again", "work"), ("done", "finish")])
            .edge("finish", END)
            .build()
            .unwrap();

        let report = graph
            .invoke(TestPatch::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(report.state.counter, 3);
        assert_eq!(report.steps, 4);
    }

    #[tokio::test]
    async fn test_max_steps_guard() {
        let router = Router::new("forever", &["again"], |_: &TestState| "again");
        let graph = GraphBuilder::<TestState>::new("runaway")
            .node("work", step_node("work"))
            .entry("work")
            .conditional("work", router, &[("again", "work")])
            .build()
            .unwrap();

        let result = graph
            .invoke(TestPatch::default(), RunConfig::default().with_max_steps(5))
            .await;
        assert!(matches!(result, Err(GraphError::MaxStepsExceeded(5))));
    }

    #[tokio::test]
    async fn test_node_error_becomes_error_patch() {
        let failing = FunctionNode::new("boom", |_: TestState| async move {
            Err::<TestPatch, _>(NodeError::new("boom", "defect"))
        });
        let graph = GraphBuilder::<TestState>::new("fails")
            .node("boom", failing)
            .entry("boom")
            .edge("boom", END)
            .build()
            .unwrap();

        let report = graph
            .invoke(TestPatch::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(report.state.error.as_deref(), Some("boom: defect"));
    }

    #[tokio::test]
    async fn test_routed_entry() {
        let entry_router = Router::new("entry", &["fresh", "resume"], |s: &TestState| {
            if s.counter > 0 {
                "resume"
            } else {
                "fresh"
            }
        });
        let graph = GraphBuilder::<TestState>::new("routed")
            .node("fresh", step_node("fresh"))
            .node("resume", step_node("resume"))
            .conditional(START, entry_router, &[("fresh", "fresh"), ("resume", "resume")])
            .edge("fresh", END)
            .edge("resume", END)
            .build()
            .unwrap();

        let report = graph
            .invoke(TestPatch::default(), RunConfig::default())
            .await
            .unwrap();
        assert_eq!(report.visited, vec!["fresh"]);

        let seeded = TestPatch {
            counter: Update::set(2),
            ..TestPatch::default()
        };
        let report = graph.invoke(seeded, RunConfig::default()).await.unwrap();
        assert_eq!(report.visited, vec!["resume"]);
    }

    #[tokio::test]
    async fn test_checkpoint_resume_across_invocations() {
        let store = Arc::new(InMemoryCheckpointer::<TestState>::new());
        let graph = GraphBuilder::<TestState>::new("sessioned")
            .node("work", step_node("work"))
            .entry("work")
            .edge("work", END)
            .checkpointer(store.clone())
            .build()
            .unwrap();

        let config = RunConfig::for_thread("session-1");
        let first = graph
            .invoke(TestPatch::default(), config.clone())
            .await
            .unwrap();
        assert_eq!(first.state.counter, 1);

        // Second invocation on the same thread resumes from saved state.
        let second = graph.invoke(TestPatch::default(), config).await.unwrap();
        assert_eq!(second.state.counter, 2);
        assert_eq!(second.state.trail.len(), 2);
    }
}

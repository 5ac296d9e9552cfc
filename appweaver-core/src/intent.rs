//! Intents: classified units of requested work.
//!
//! A single user request decomposes into one or more intents, each tagged
//! with a domain and an action, optionally ordered by dependencies.
//! Dependency sets are validated at classification time: indices must be in
//! range and the graph must be acyclic.

use crate::errors::CoreError;
use crate::identifier::generate_intent_id;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// The closed set of platform domains an intent can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// A platform application.
    Application,
    /// A data object within an application.
    Object,
    /// A page layout.
    Layout,
    /// An automation flow.
    Flow,
}

impl Domain {
    /// Stable string label, used as a routing edge label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Object => "object",
            Self::Layout => "layout",
            Self::Flow => "flow",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The closed set of actions, each belonging to exactly one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Create a new application.
    CreateApplication,
    /// Update an existing application.
    UpdateApplication,
    /// Delete an application.
    DeleteApplication,
    /// Create a new object with fields.
    CreateObject,
    /// Update an existing object.
    UpdateObject,
    /// Delete an object.
    DeleteObject,
    /// Create a page layout.
    CreateLayout,
    /// Update a page layout.
    UpdateLayout,
    /// Create an automation flow.
    CreateFlow,
    /// Update an automation flow.
    UpdateFlow,
}

impl IntentKind {
    /// The domain this action belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            Self::CreateApplication | Self::UpdateApplication | Self::DeleteApplication => {
                Domain::Application
            }
            Self::CreateObject | Self::UpdateObject | Self::DeleteObject => Domain::Object,
            Self::CreateLayout | Self::UpdateLayout => Domain::Layout,
            Self::CreateFlow | Self::UpdateFlow => Domain::Flow,
        }
    }
}

/// One classified unit of requested work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Unique id, assigned at classification.
    pub id: String,
    /// Target domain.
    pub domain: Domain,
    /// Requested action.
    pub kind: IntentKind,
    /// Names of the entities the action applies to.
    pub targets: Vec<String>,
    /// Free-form details for the downstream design stage.
    pub details: String,
}

impl Intent {
    /// Create a new intent with a generated id.
    pub fn new(
        domain: Domain,
        kind: IntentKind,
        targets: Vec<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_intent_id(),
            domain,
            kind,
            targets,
            details: details.into(),
        }
    }
}

/// A directed dependency between two intents in the same batch:
/// `dependent` must not be processed before `depends_on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDependency {
    /// Index of the intent that must wait.
    pub dependent: usize,
    /// Index of the intent it waits for.
    pub depends_on: usize,
}

/// Validate a classified batch: action/domain agreement, dependency index
/// range, and acyclicity of the dependency graph.
pub fn validate_batch(
    intents: &[Intent],
    dependencies: &[IntentDependency],
) -> Result<(), CoreError> {
    if intents.is_empty() {
        return Err(CoreError::IntentValidation(
            "classification produced no intents".to_string(),
        ));
    }
    for (index, intent) in intents.iter().enumerate() {
        if intent.kind.domain() != intent.domain {
            return Err(CoreError::IntentValidation(format!(
                "intent {index}: action {:?} does not belong to domain '{}'",
                intent.kind, intent.domain
            )));
        }
    }
    for dep in dependencies {
        if dep.dependent >= intents.len() || dep.depends_on >= intents.len() {
            return Err(CoreError::IntentValidation(format!(
                "dependency ({}, {}) references an intent outside the batch of {}",
                dep.dependent,
                dep.depends_on,
                intents.len()
            )));
        }
        if dep.dependent == dep.depends_on {
            return Err(CoreError::IntentValidation(format!(
                "intent {} depends on itself",
                dep.dependent
            )));
        }
    }
    detect_dependency_cycle(intents.len(), dependencies)
}

fn detect_dependency_cycle(
    count: usize,
    dependencies: &[IntentDependency],
) -> Result<(), CoreError> {
    fn visit(
        node: usize,
        deps: &[IntentDependency],
        visiting: &mut HashSet<usize>,
        visited: &mut HashSet<usize>,
    ) -> bool {
        if visited.contains(&node) {
            return false;
        }
        if !visiting.insert(node) {
            return true;
        }
        for dep in deps.iter().filter(|d| d.dependent == node) {
            if visit(dep.depends_on, deps, visiting, visited) {
                return true;
            }
        }
        visiting.remove(&node);
        visited.insert(node);
        false
    }

    let mut visiting = HashSet::new();
    let mut visited = HashSet::new();
    for node in 0..count {
        if visit(node, dependencies, &mut visiting, &mut visited) {
            return Err(CoreError::IntentValidation(format!(
                "circular dependency involving intent {node}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn intent(domain: Domain, kind: IntentKind) -> Intent {
        Intent::new(domain, kind, vec!["crm".to_string()], "a crm app")
    }

    #[test]
    fn test_kind_domain_mapping() {
        assert_eq!(IntentKind::CreateApplication.domain(), Domain::Application);
        assert_eq!(IntentKind::DeleteObject.domain(), Domain::Object);
        assert_eq!(IntentKind::UpdateLayout.domain(), Domain::Layout);
        assert_eq!(IntentKind::CreateFlow.domain(), Domain::Flow);
    }

    #[test]
    fn test_validate_empty_batch_rejected() {
        let result = validate_batch(&[], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_domain_action_mismatch() {
        let bad = intent(Domain::Application, IntentKind::CreateObject);
        let result = validate_batch(&[bad], &[]);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("does not belong to domain"));
    }

    #[test]
    fn test_validate_dependency_out_of_range() {
        let intents = vec![intent(Domain::Application, IntentKind::CreateApplication)];
        let deps = vec![IntentDependency {
            dependent: 0,
            depends_on: 3,
        }];
        assert!(validate_batch(&intents, &deps).is_err());
    }

    #[test]
    fn test_validate_cycle_rejected() {
        let intents = vec![
            intent(Domain::Application, IntentKind::CreateApplication),
            intent(Domain::Object, IntentKind::CreateObject),
        ];
        let deps = vec![
            IntentDependency {
                dependent: 0,
                depends_on: 1,
            },
            IntentDependency {
                dependent: 1,
                depends_on: 0,
            },
        ];
        let err = validate_batch(&intents, &deps).unwrap_err();
        assert!(err.to_string().contains("circular dependency"));
    }

    #[test]
    fn test_validate_self_dependency_rejected() {
        let intents = vec![intent(Domain::Application, IntentKind::CreateApplication)];
        let deps = vec![IntentDependency {
            dependent: 0,
            depends_on: 0,
        }];
        assert!(validate_batch(&intents, &deps).is_err());
    }

    #[rstest]
    #[case::chain(vec![(1, 0), (2, 1)])]
    #[case::fan_in(vec![(2, 0), (2, 1)])]
    #[case::none(vec![])]
    fn test_validate_acyclic_accepted(#[case] edges: Vec<(usize, usize)>) {
        let intents = vec![
            intent(Domain::Application, IntentKind::CreateApplication),
            intent(Domain::Object, IntentKind::CreateObject),
            intent(Domain::Object, IntentKind::UpdateObject),
        ];
        let deps: Vec<IntentDependency> = edges
            .into_iter()
            .map(|(dependent, depends_on)| IntentDependency {
                dependent,
                depends_on,
            })
            .collect();
        assert!(validate_batch(&intents, &deps).is_ok());
    }

    #[test]
    fn test_intent_ids_unique() {
        let a = intent(Domain::Application, IntentKind::CreateApplication);
        let b = intent(Domain::Application, IntentKind::CreateApplication);
        assert_ne!(a.id, b.id);
    }
}

//! Mock collaborators for tests.
//!
//! Two flavors per collaborator, mirroring the scripted-queue and
//! function-driven patterns used throughout the workspace tests:
//!
//! - `Scripted*`: configure a queue of responses, returned in order, with
//!   every request recorded for later assertions.
//! - `Fn*`: a closure decides the response from the request.

use crate::extractor::{ExtractionError, StructuredExtractor, ToolInvocation, ToolSchema};
use crate::message::ChatMessage;
use crate::platform::{ChangeOutcome, ChangeRequest, PlatformClient, PlatformError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// A scripted extractor returning queued responses in order.
#[derive(Clone, Default)]
pub struct ScriptedExtractor {
    responses: Arc<Mutex<VecDeque<Result<ToolInvocation, ExtractionError>>>>,
    requests: Arc<Mutex<Vec<(String, Vec<ChatMessage>)>>>,
}

impl ScriptedExtractor {
    /// Create an empty scripted extractor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful structured response.
    pub fn with_invocation(self, invocation: ToolInvocation) -> Self {
        self.responses.lock().push_back(Ok(invocation));
        self
    }

    /// Queue an extraction failure.
    pub fn with_failure(self, error: ExtractionError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Number of extract calls observed.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// System prompts observed, in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(p, _)| p.clone()).collect()
    }
}

#[async_trait]
impl StructuredExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        _tools: &[ToolSchema],
    ) -> Result<ToolInvocation, ExtractionError> {
        self.requests
            .lock()
            .push((system_prompt.to_string(), messages.to_vec()));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(ExtractionError::NoStructuredResponse))
    }
}

/// An extractor controlled by a function of the request.
pub struct FnExtractor<F>
where
    F: Fn(&str, &[ChatMessage], &[ToolSchema]) -> Result<ToolInvocation, ExtractionError>
        + Send
        + Sync,
{
    func: F,
}

impl<F> FnExtractor<F>
where
    F: Fn(&str, &[ChatMessage], &[ToolSchema]) -> Result<ToolInvocation, ExtractionError>
        + Send
        + Sync,
{
    /// Create a function-driven extractor.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> StructuredExtractor for FnExtractor<F>
where
    F: Fn(&str, &[ChatMessage], &[ToolSchema]) -> Result<ToolInvocation, ExtractionError>
        + Send
        + Sync,
{
    async fn extract(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> Result<ToolInvocation, ExtractionError> {
        (self.func)(system_prompt, messages, tools)
    }
}

/// A scripted platform client returning queued outcomes in order.
#[derive(Clone, Default)]
pub struct ScriptedPlatform {
    outcomes: Arc<Mutex<VecDeque<Result<ChangeOutcome, PlatformError>>>>,
    requests: Arc<Mutex<Vec<ChangeRequest>>>,
}

impl ScriptedPlatform {
    /// Create an empty scripted platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful outcome.
    pub fn with_outcome(self, outcome: ChangeOutcome) -> Self {
        self.outcomes.lock().push_back(Ok(outcome));
        self
    }

    /// Queue a failure.
    pub fn with_failure(self, error: PlatformError) -> Self {
        self.outcomes.lock().push_back(Err(error));
        self
    }

    /// Change requests observed, in call order.
    pub fn recorded_requests(&self) -> Vec<ChangeRequest> {
        self.requests.lock().clone()
    }

    /// Number of apply_change calls observed.
    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl PlatformClient for ScriptedPlatform {
    async fn apply_change(&self, request: ChangeRequest) -> Result<ChangeOutcome, PlatformError> {
        self.requests.lock().push(request);
        self.outcomes
            .lock()
            .pop_front()
            .unwrap_or(Err(PlatformError::Unreachable(
                "no scripted outcome left".to_string(),
            )))
    }
}

/// A platform client controlled by a function of the request.
pub struct FnPlatform<F>
where
    F: Fn(&ChangeRequest) -> Result<ChangeOutcome, PlatformError> + Send + Sync,
{
    func: F,
}

impl<F> FnPlatform<F>
where
    F: Fn(&ChangeRequest) -> Result<ChangeOutcome, PlatformError> + Send + Sync,
{
    /// Create a function-driven platform client.
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F> PlatformClient for FnPlatform<F>
where
    F: Fn(&ChangeRequest) -> Result<ChangeOutcome, PlatformError> + Send + Sync,
{
    async fn apply_change(&self, request: ChangeRequest) -> Result<ChangeOutcome, PlatformError> {
        (self.func)(&request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_scripted_extractor_in_order() {
        let extractor = ScriptedExtractor::new()
            .with_invocation(ToolInvocation::new("first", json!({})))
            .with_failure(ExtractionError::NoStructuredResponse);

        let first = extractor.extract("p", &[], &[]).await.unwrap();
        assert_eq!(first.tool_name, "first");

        let second = extractor.extract("p", &[], &[]).await;
        assert!(matches!(second, Err(ExtractionError::NoStructuredResponse)));
        assert_eq!(extractor.call_count(), 2);
    }

    #[tokio::test]
    async fn test_scripted_extractor_exhausted_signals_absence() {
        let extractor = ScriptedExtractor::new();
        let result = extractor.extract("p", &[], &[]).await;
        assert!(matches!(result, Err(ExtractionError::NoStructuredResponse)));
    }

    #[tokio::test]
    async fn test_fn_platform_sees_request() {
        let platform = FnPlatform::new(|request: &ChangeRequest| {
            Ok(ChangeOutcome::new(
                format!("{:?}_1", request.kind),
                json!({}),
            ))
        });

        let outcome = platform
            .apply_change(ChangeRequest::new(
                crate::platform::ResourceKind::Object,
                crate::platform::ChangeAction::Create,
                json!({"name": "invoice"}),
            ))
            .await
            .unwrap();
        assert!(outcome.resource_id.starts_with("Object"));
    }

    #[tokio::test]
    async fn test_scripted_platform_records_requests() {
        let platform = ScriptedPlatform::new()
            .with_outcome(ChangeOutcome::new("app_1", json!({})));

        platform
            .apply_change(ChangeRequest::new(
                crate::platform::ResourceKind::Application,
                crate::platform::ChangeAction::Create,
                json!({"name": "crm"}),
            ))
            .await
            .unwrap();

        assert_eq!(platform.call_count(), 1);
        assert_eq!(
            platform.recorded_requests()[0].kind,
            crate::platform::ResourceKind::Application
        );
    }
}

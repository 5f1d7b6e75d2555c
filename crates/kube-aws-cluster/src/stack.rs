//! Stack submission, progress polling and failure diagnostics.
//!
//! A failed stack produces a long event history, most of which is noise:
//! resources that were cancelled because a sibling failed. The reduction in
//! [`stack_event_err_msgs`] keeps only the events that name a root cause.

use kube_aws_core::ClusterConfig;
use tracing::{debug, error, info, warn};

use crate::api::{CreateStackRequest, StackApi, StackDescription};
use crate::error::{ClusterError, Result};
use crate::status::StackStatus;
use crate::types::{OrchestratorConfig, StackEvent, StackHandle, StackInfo, StackTag};

/// Status reason the provider gives resources cancelled by a sibling failure.
pub const CANCELLATION_MARKER: &str = "Resource creation cancelled";

/// Build the tag list for a stack from the configured tags.
///
/// Always returns a list; no tags are added beyond those configured.
#[must_use]
pub fn stack_tags(config: &ClusterConfig) -> Vec<StackTag> {
    config
        .stack_tags
        .iter()
        .map(|(k, v)| StackTag::new(k, v))
        .collect()
}

/// Submit a stack creation request for the cluster.
///
/// The request is sent once. A name collision or template error comes back
/// as the provider reported it.
///
/// # Errors
///
/// Returns `ClusterError::Api` with the provider's error.
pub async fn create_stack(
    config: &ClusterConfig,
    api: &dyn StackApi,
    template_body: &str,
) -> Result<StackHandle> {
    let request = CreateStackRequest {
        stack_name: config.stack_name().to_string(),
        template_body: template_body.to_string(),
        tags: stack_tags(config),
    };

    let handle = api.create_stack(&request).await.inspect_err(|e| {
        warn!(stack = %request.stack_name, error = %e, "Stack submission rejected");
    })?;

    info!(
        stack = %request.stack_name,
        stack_id = %handle,
        tags = request.tags.len(),
        "Stack creation submitted"
    );

    Ok(handle)
}

/// Ask the provider to validate a rendered template.
///
/// # Errors
///
/// Returns `ClusterError::Api` with the provider's validation message.
pub async fn validate_stack(api: &dyn StackApi, template_body: &str) -> Result<()> {
    api.validate_template(template_body).await?;
    debug!(bytes = template_body.len(), "Template validated");
    Ok(())
}

/// Returns true if the event only records a cancellation caused by another
/// resource's failure.
#[must_use]
pub fn is_cancellation_cascade(event: &StackEvent) -> bool {
    event
        .resource_status_reason
        .as_deref()
        .is_some_and(|r| r.contains(CANCELLATION_MARKER))
}

/// Reduce a stack's event history to root-cause messages.
///
/// Keeps `CREATE_FAILED` events that are not cancellation cascades and
/// renders each as `status type [logical_id] [reason]`, skipping absent
/// fields. Input order is preserved.
#[must_use]
pub fn stack_event_err_msgs(events: &[StackEvent]) -> Vec<String> {
    events
        .iter()
        .filter(|e| e.resource_status == StackStatus::CreateFailed)
        .filter(|e| !is_cancellation_cascade(e))
        .map(format_event)
        .collect()
}

fn format_event(event: &StackEvent) -> String {
    [
        Some(event.resource_status.as_str()),
        event.resource_type.as_deref(),
        event.logical_resource_id.as_deref(),
        event.resource_status_reason.as_deref(),
    ]
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

/// Fetch a failed stack's events and reduce them to root-cause messages.
///
/// # Errors
///
/// Returns `ClusterError::Api` if the events cannot be fetched.
pub async fn wait_and_describe_failure(
    api: &dyn StackApi,
    handle: &StackHandle,
) -> Result<Vec<String>> {
    let events = api.describe_stack_events(handle.as_str()).await?;
    let messages = stack_event_err_msgs(&events);
    debug!(
        stack_id = %handle,
        events = events.len(),
        failures = messages.len(),
        "Reduced stack events"
    );
    Ok(messages)
}

/// Poll a stack until creation settles.
///
/// Sleeps `config.poll_interval()` between polls. There is no deadline;
/// wrap the call in `tokio::time::timeout` to bound it.
///
/// # Errors
///
/// - `ClusterError::StackFailed` if creation failed or rolled back
/// - `ClusterError::UnexpectedStackStatus` for any other settled status
/// - `ClusterError::StackNotFound` if the stack disappeared
/// - `ClusterError::Api` if a request fails
pub async fn wait_for_stack(
    api: &dyn StackApi,
    handle: &StackHandle,
    config: &OrchestratorConfig,
) -> Result<StackInfo> {
    loop {
        let stack = api
            .describe_stack(handle.as_str())
            .await?
            .ok_or_else(|| ClusterError::StackNotFound(handle.to_string()))?;

        match stack.status {
            StackStatus::CreateComplete => {
                info!(stack = %stack.stack_name, "Stack created");
                return Ok(stack_info(stack));
            }
            StackStatus::CreateInProgress => {
                debug!(stack = %stack.stack_name, "Stack creation in progress");
                tokio::time::sleep(config.poll_interval()).await;
            }
            status if status.is_creation_failure() => {
                let messages = wait_and_describe_failure(api, handle).await?;
                error!(
                    stack = %stack.stack_name,
                    status = %status,
                    reason = ?stack.status_reason,
                    failures = ?messages,
                    "Stack creation failed"
                );
                return Err(ClusterError::StackFailed {
                    status,
                    reason: stack.status_reason,
                    messages,
                });
            }
            status => return Err(ClusterError::UnexpectedStackStatus(status)),
        }
    }
}

/// Describe a stack by name or id.
///
/// # Errors
///
/// Returns `ClusterError::StackNotFound` if it does not exist and
/// `ClusterError::Api` if the request fails.
pub async fn describe_stack(api: &dyn StackApi, stack: &str) -> Result<StackInfo> {
    api.describe_stack(stack)
        .await?
        .map(stack_info)
        .ok_or_else(|| ClusterError::StackNotFound(stack.to_string()))
}

/// Request deletion of a stack.
///
/// # Errors
///
/// Returns `ClusterError::Api` if the request fails.
pub async fn delete_stack(api: &dyn StackApi, stack_name: &str) -> Result<()> {
    api.delete_stack(stack_name).await?;
    info!(stack = %stack_name, "Stack deletion requested");
    Ok(())
}

fn stack_info(stack: StackDescription) -> StackInfo {
    StackInfo {
        handle: StackHandle::new(stack.stack_id),
        name: stack.stack_name,
        status: stack.status,
        status_reason: stack.status_reason,
        outputs: stack.outputs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::mock::MockStackApi;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn config(tags: &[(&str, &str)]) -> ClusterConfig {
        ClusterConfig {
            cluster_name: "test-cluster-name".to_string(),
            stack_tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_stack_without_tags() {
        let api = MockStackApi::new();
        create_stack(&config(&[]), &api, "{}").await.unwrap();

        let requests = api.create_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].stack_name, "test-cluster-name");
        assert_eq!(requests[0].template_body, "{}");
        assert!(requests[0].tags.is_empty());
    }

    #[tokio::test]
    async fn create_stack_with_tags() {
        let api = MockStackApi::new();
        create_stack(
            &config(&[("Name", "Test"), ("Environment", "Production")]),
            &api,
            "{}",
        )
        .await
        .unwrap();

        let mut tags = api.create_requests()[0].tags.clone();
        tags.sort();
        assert_eq!(
            tags,
            vec![
                StackTag::new("Environment", "Production"),
                StackTag::new("Name", "Test"),
            ]
        );
    }

    #[tokio::test]
    async fn create_stack_returns_provider_handle() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();
        assert!(handle.as_str().contains("test-cluster-name"));
    }

    #[tokio::test]
    async fn duplicate_stack_name_rejected_verbatim() {
        let api = MockStackApi::new();
        create_stack(&config(&[]), &api, "{}").await.unwrap();

        let err = create_stack(&config(&[]), &api, "{}").await.unwrap_err();
        match err {
            ClusterError::Api(e) => assert_eq!(e.code(), Some("AlreadyExistsException")),
            other => panic!("expected provider error, got {other:?}"),
        }
        assert_eq!(api.create_requests().len(), 2);
    }

    #[tokio::test]
    async fn template_validation_errors_surface() {
        let api = MockStackApi::new();
        validate_stack(&api, "{}").await.unwrap();

        api.reject_templates(ApiError::service("ValidationError", "Template format error"));
        let err = validate_stack(&api, "{").await.unwrap_err();
        assert_eq!(err.to_string(), "ValidationError: Template format error");
    }

    fn failure_events() -> Vec<StackEvent> {
        vec![
            StackEvent::new("CREATE_FAILED", "Computer")
                .with_logical_id("test_comp")
                .with_reason("BAD HD"),
            StackEvent::new("SUCCESS", "Computer"),
            StackEvent::new("CREATE_FAILED", "Computer").with_reason("Resource creation cancelled"),
            StackEvent::new("CREATE_FAILED", "Computer"),
        ]
    }

    #[test]
    fn reduces_failure_events() {
        assert_eq!(
            stack_event_err_msgs(&failure_events()),
            vec![
                "CREATE_FAILED Computer test_comp BAD HD".to_string(),
                "CREATE_FAILED Computer".to_string(),
            ]
        );
    }

    #[test]
    fn reduction_of_nothing() {
        assert!(stack_event_err_msgs(&[]).is_empty());
        assert!(stack_event_err_msgs(&[StackEvent::new("CREATE_COMPLETE", "Vpc")]).is_empty());
    }

    #[test]
    fn reduction_skips_empty_fields() {
        let mut event = StackEvent::new("CREATE_FAILED", "").with_reason("quota exceeded");
        event.logical_resource_id = Some(String::new());
        assert_eq!(
            stack_event_err_msgs(&[event]),
            vec!["CREATE_FAILED quota exceeded".to_string()]
        );
    }

    #[test]
    fn cancellation_marker_matches_substring() {
        let event = StackEvent::new("CREATE_FAILED", "AWS::EC2::Subnet")
            .with_reason("Resource creation cancelled by user request");
        assert!(is_cancellation_cascade(&event));
        assert!(!is_cancellation_cascade(&StackEvent::new("CREATE_FAILED", "x")));
    }

    #[tokio::test]
    async fn describe_failure_reads_events_once() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();
        api.set_events(&handle, failure_events());

        let messages = wait_and_describe_failure(&api, &handle).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(api.event_calls(), 1);
    }

    fn fast() -> OrchestratorConfig {
        OrchestratorConfig {
            poll_interval_seconds: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wait_until_complete() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();
        api.script_statuses(
            &handle,
            &[
                StackStatus::CreateInProgress,
                StackStatus::CreateInProgress,
                StackStatus::CreateComplete,
            ],
        );
        let mut outputs = BTreeMap::new();
        outputs.insert("ControllerIP".to_string(), "10.0.0.50".to_string());
        api.set_outputs(&handle, outputs);

        let start = tokio::time::Instant::now();
        let info = wait_for_stack(&api, &handle, &fast()).await.unwrap();
        assert_eq!(info.status, StackStatus::CreateComplete);
        assert_eq!(info.handle, handle);
        assert_eq!(info.outputs["ControllerIP"], "10.0.0.50");
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert_eq!(api.event_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_reports_failure() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();
        api.script_statuses(
            &handle,
            &[StackStatus::CreateInProgress, StackStatus::RollbackComplete],
        );
        api.set_status_reason(&handle, "The following resource(s) failed to create: [Computer]");
        api.set_events(&handle, failure_events());

        let err = wait_for_stack(&api, &handle, &fast()).await.unwrap_err();
        match err {
            ClusterError::StackFailed {
                status,
                reason,
                messages,
            } => {
                assert_eq!(status, StackStatus::RollbackComplete);
                assert_eq!(
                    reason.as_deref(),
                    Some("The following resource(s) failed to create: [Computer]")
                );
                assert_eq!(messages.len(), 2);
            }
            other => panic!("expected StackFailed, got {other:?}"),
        }
        assert_eq!(api.event_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_rejects_unexpected_status() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();
        api.script_statuses(&handle, &[StackStatus::DeleteComplete]);

        let err = wait_for_stack(&api, &handle, &fast()).await.unwrap_err();
        assert!(matches!(
            err,
            ClusterError::UnexpectedStackStatus(StackStatus::DeleteComplete)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_is_bounded_by_caller() {
        let api = MockStackApi::new();
        let handle = create_stack(&config(&[]), &api, "{}").await.unwrap();

        let result =
            tokio::time::timeout(Duration::from_secs(30), wait_for_stack(&api, &handle, &fast()))
                .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn describe_and_delete() {
        let api = MockStackApi::new();
        create_stack(&config(&[]), &api, "{}").await.unwrap();

        let info = describe_stack(&api, "test-cluster-name").await.unwrap();
        assert_eq!(info.name, "test-cluster-name");
        assert_eq!(info.status, StackStatus::CreateInProgress);

        delete_stack(&api, "test-cluster-name").await.unwrap();
        let err = describe_stack(&api, "test-cluster-name").await.unwrap_err();
        assert!(matches!(err, ClusterError::StackNotFound(_)));
    }
}

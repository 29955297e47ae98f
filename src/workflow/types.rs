/// Core workflow type definitions
///
/// A workflow pairs a task description with the URL whose content the task
/// runs against. Field names serialize in camelCase to match the JSON API.

use crate::error::{PipelineError, PipelineResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A stored workflow definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Store-assigned identifier, immutable after creation
    pub id: i64,
    pub name: String,
    /// Also used as the "task" in execution prompts
    pub description: String,
    /// Content source; not validated until fetch time
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful update, never earlier than `created_at`
    pub modified_at: DateTime<Utc>,
}

/// Fields required to create a workflow
///
/// Each field is optional at the wire level so that a missing field becomes a
/// validation error instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewWorkflow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

/// Validated creation input
#[derive(Debug, Clone, PartialEq)]
pub struct ValidNewWorkflow {
    pub name: String,
    pub description: String,
    pub url: String,
}

/// Partial update. Omitted and empty fields both keep the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkflowPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
}

impl NewWorkflow {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            description: Some(description.into()),
            url: Some(url.into()),
        }
    }

    /// Reject the request if any of name/description/url is absent or empty
    pub fn validate(self) -> PipelineResult<ValidNewWorkflow> {
        match (non_empty(self.name), non_empty(self.description), non_empty(self.url)) {
            (Some(name), Some(description), Some(url)) => Ok(ValidNewWorkflow {
                name,
                description,
                url,
            }),
            _ => Err(PipelineError::Validation(
                "name, description and url are required".to_string(),
            )),
        }
    }
}

impl WorkflowPatch {
    /// Drop empty strings so they coalesce to the stored value.
    /// Clearing a field through an update is therefore impossible.
    pub fn normalized(self) -> Self {
        Self {
            name: non_empty(self.name),
            description: non_empty(self.description),
            url: non_empty(self.url),
        }
    }

    /// Apply the coalescing update to `workflow` in place
    pub fn apply_to(self, workflow: &mut Workflow, modified_at: DateTime<Utc>) {
        let patch = self.normalized();
        if let Some(name) = patch.name {
            workflow.name = name;
        }
        if let Some(description) = patch.description {
            workflow.description = description;
        }
        if let Some(url) = patch.url {
            workflow.url = url;
        }
        workflow.modified_at = modified_at;
    }
}

/// Current time truncated to the millisecond precision the store persists
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Next `modifiedAt` for a record last modified at `previous`, strictly later than it
pub fn next_modified_at(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_millis();
    if now > previous {
        now
    } else {
        previous + Duration::milliseconds(1)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Workflow {
        let at = now_millis();
        Workflow {
            id: 1,
            name: "News digest".to_string(),
            description: "summarising news".to_string(),
            url: "https://example.com".to_string(),
            created_at: at,
            modified_at: at,
        }
    }

    #[test]
    fn validate_rejects_missing_and_empty_fields() {
        let missing = NewWorkflow {
            name: Some("n".to_string()),
            description: None,
            url: Some("u".to_string()),
        };
        assert!(matches!(missing.validate(), Err(PipelineError::Validation(_))));

        let empty = NewWorkflow::new("n", "", "u");
        assert!(matches!(empty.validate(), Err(PipelineError::Validation(_))));

        let ok = NewWorkflow::new("n", "d", "u").validate().unwrap();
        assert_eq!(ok.description, "d");
    }

    #[test]
    fn patch_coalesces_omitted_and_empty_fields() {
        let mut workflow = sample();
        let later = next_modified_at(workflow.modified_at);
        WorkflowPatch {
            name: Some("Renamed".to_string()),
            description: Some(String::new()),
            url: None,
        }
        .apply_to(&mut workflow, later);

        assert_eq!(workflow.name, "Renamed");
        assert_eq!(workflow.description, "summarising news");
        assert_eq!(workflow.url, "https://example.com");
        assert_eq!(workflow.modified_at, later);
    }

    #[test]
    fn next_modified_at_is_strictly_later() {
        let far_future = Utc::now() + Duration::hours(1);
        assert!(next_modified_at(far_future) > far_future);
        let past = Utc::now() - Duration::hours(1);
        assert!(next_modified_at(past) > past);
    }

    #[test]
    fn serializes_camel_case_timestamps() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("modifiedAt").is_some());
        assert!(json.get("created_at").is_none());
    }
}

//! Completion webhooks.
//!
//! When a request carries a `notification_url`, the worker POSTs the job's
//! final status there. Delivery is best effort: one attempt, failures are
//! logged by the caller and never change the job outcome.

use crate::config::NotificationConfig;
use crate::job::JobKey;
use crate::orchestrator::{JobError, JobOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Notification endpoint returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

/// Body POSTed to the notification URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobNotification {
    pub folder_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angles_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobNotification {
    pub fn from_result(key: &JobKey, result: &Result<JobOutcome, JobError>) -> Self {
        match result {
            Ok(outcome) => Self {
                folder_id: key.to_string(),
                status: JobStatus::Succeeded,
                video_key: Some(outcome.video_key.clone()),
                angles_key: Some(outcome.angles_key.clone()),
                error: None,
            },
            Err(e) => Self {
                folder_id: key.to_string(),
                status: JobStatus::Failed,
                video_key: None,
                angles_key: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// HTTP client for completion webhooks.
#[derive(Debug, Clone)]
pub struct Notifier {
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client })
    }

    #[instrument(skip(self, notification), fields(folder_id = %notification.folder_id))]
    pub async fn send(&self, url: &str, notification: &JobNotification) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(notification).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }

        debug!(url = %url, status = status.as_u16(), "Notification delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_success_payload() {
        let key = JobKey::parse("abc").unwrap();
        let outcome = JobOutcome {
            video_key: "exercise_videos/abc/pose_video.mp4".to_string(),
            angles_key: "exercise_videos/abc/pose_angles.json".to_string(),
            frames_read: 10,
            frames_annotated: 8,
        };

        let value = serde_json::to_value(JobNotification::from_result(&key, &Ok(outcome))).unwrap();

        assert_eq!(value["folder_id"], "abc");
        assert_eq!(value["status"], "succeeded");
        assert_eq!(value["video_key"], "exercise_videos/abc/pose_video.mp4");
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_failure_payload() {
        let key = JobKey::parse("abc").unwrap();
        let result = Err(JobError::Fetch(StorageError::NotFound(
            "exercise_videos/abc/video.mp4".to_string(),
        )));

        let value = serde_json::to_value(JobNotification::from_result(&key, &result)).unwrap();

        assert_eq!(value["status"], "failed");
        assert!(value["error"]
            .as_str()
            .unwrap()
            .contains("exercise_videos/abc/video.mp4"));
        assert!(value.get("video_key").is_none());
    }
}

//! Job keys and the storage layout derived from them.

use crate::config::StorageConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

const MAX_KEY_LEN: usize = 256;

/// Reasons a folder id is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobKeyError {
    #[error("folder_id must not be empty")]
    Empty,

    #[error("folder_id is longer than 256 characters")]
    TooLong,

    #[error("folder_id contains a forbidden character or sequence: {0:?}")]
    Forbidden(String),
}

/// Opaque identifier grouping one input video and its outputs.
///
/// A key is always a single storage path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JobKey(String);

impl JobKey {
    pub fn parse(value: &str) -> Result<Self, JobKeyError> {
        if value.is_empty() {
            return Err(JobKeyError::Empty);
        }
        if value.chars().count() > MAX_KEY_LEN {
            return Err(JobKeyError::TooLong);
        }
        if value.contains('/') || value.contains('\\') || value.contains("..") {
            return Err(JobKeyError::Forbidden(value.to_string()));
        }
        if value.chars().any(char::is_control) {
            return Err(JobKeyError::Forbidden(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for JobKey {
    type Error = JobKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<JobKey> for String {
    fn from(key: JobKey) -> Self {
        key.0
    }
}

/// Where a job's objects live: `{root}/{folder_id}/{object}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub root_prefix: String,
    pub input_object: String,
    pub video_object: String,
    pub angles_object: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            root_prefix: "exercise_videos".to_string(),
            input_object: "video.mp4".to_string(),
            video_object: "pose_video.mp4".to_string(),
            angles_object: "pose_angles.json".to_string(),
        }
    }
}

impl From<&StorageConfig> for StorageLayout {
    fn from(config: &StorageConfig) -> Self {
        Self {
            root_prefix: config.root_prefix.clone(),
            input_object: config.input_object.clone(),
            video_object: config.video_object.clone(),
            angles_object: config.angles_object.clone(),
        }
    }
}

impl StorageLayout {
    fn key(&self, job: &JobKey, object: &str) -> String {
        format!("{}/{}/{}", self.root_prefix, job, object)
    }

    pub fn input_key(&self, job: &JobKey) -> String {
        self.key(job, &self.input_object)
    }

    pub fn video_key(&self, job: &JobKey) -> String {
        self.key(job, &self.video_object)
    }

    pub fn angles_key(&self, job: &JobKey) -> String {
        self.key(job, &self.angles_object)
    }

    /// Job whose input video was written at `path`, if any.
    ///
    /// Matches `{root}/{folder_id}/{input_object}` only; result objects and
    /// anything nested deeper are ignored.
    pub fn job_for_upload(&self, path: &str) -> Option<JobKey> {
        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [root, folder, object]
                if *root == self.root_prefix && *object == self.input_object =>
            {
                JobKey::parse(folder).ok()
            }
            _ => None,
        }
    }
}

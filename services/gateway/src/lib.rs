//! Pose Gateway
//!
//! Asynchronous exercise-video analysis service. A request names a folder in
//! object storage; the service downloads the folder's input video, runs the
//! pose pipeline from `pose-core` over it, and uploads the annotated video and
//! the joint-angle time-series back into the same folder.
//!
//! ## Architecture
//!
//! ```text
//!  POST /process-video        ┌───────────┐        ┌──────────────┐
//!  POST /storage-events ─────▶│ JobQueue  │───────▶│ Worker (xN)  │
//!                             └───────────┘        └──────┬───────┘
//!                                                         │
//!               ┌─────────────────────────────────────────┤
//!               ▼                                         ▼
//!        ┌──────────────┐   spawn_blocking   ┌────────────────────┐
//!        │ Orchestrator │───────────────────▶│ VideoPipeline      │
//!        └──────┬───────┘                    │ (codec + model)    │
//!               │                            └────────────────────┘
//!               ▼
//!        ┌──────────────┐   exercise_videos/{folder_id}/video.mp4
//!        │ ObjectStore  │   exercise_videos/{folder_id}/pose_video.mp4
//!        └──────────────┘   exercise_videos/{folder_id}/pose_angles.json
//! ```

pub mod api;
pub mod config;
pub mod job;
pub mod notify;
pub mod orchestrator;
pub mod storage;
pub mod telemetry;
pub mod worker;

pub use api::{create_router, AppState};
pub use config::{ConfigValidationError, GatewayConfig};
pub use job::{JobKey, JobKeyError, StorageLayout};
pub use notify::{JobNotification, JobStatus, Notifier};
pub use orchestrator::{JobError, JobOutcome, Orchestrator};
pub use storage::{MemoryStore, ObjectStore, S3Store, StorageError};
pub use worker::{JobQueue, JobRequest, QueueError, WorkerPool};

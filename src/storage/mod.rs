//! Storage gateway: a capability-style wrapper over the object-storage and
//! message-queue collaborators.
//!
//! Handlers only ever see the [`StorageGateway`] trait, so the vendor can be
//! swapped or mocked in tests. All operations are awaited remote calls; any
//! of them can fail with `AppError::StorageUnavailable`, which callers may
//! treat as retryable. The gateway itself performs no retries.

pub mod aws;
pub mod mock;

pub use aws::AwsStorageGateway;
pub use mock::MockStorageGateway;

use crate::error::AppError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// A message received from the notification queue.
///
/// The `receipt` identifies this delivery for [`StorageGateway::acknowledge`];
/// an unacknowledged message stays on the queue.
#[derive(Debug, Clone)]
pub struct Notification {
    pub body: String,
    pub attributes: HashMap<String, String>,
    pub receipt: String,
}

#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Store `content` under `name`, overwriting any existing object
    /// (last write wins).
    async fn put_object(&self, name: &str, content: Bytes) -> Result<(), AppError>;

    /// Fetch the content of the object `name`.
    /// Returns `AppError::NotFound` if the object does not exist.
    async fn get_object(&self, name: &str) -> Result<Bytes, AppError>;

    async fn object_exists(&self, name: &str) -> Result<bool, AppError>;

    /// Delete the object `name`. Deleting an absent object is not an error.
    async fn delete_object(&self, name: &str) -> Result<(), AppError>;

    /// Send a notification message to the queue, returning the vendor's
    /// message id.
    async fn enqueue_notification(
        &self,
        attributes: HashMap<String, String>,
        body: &str,
    ) -> Result<String, AppError>;

    /// Receive at most one pending notification without removing it from
    /// the queue.
    async fn dequeue_one_notification(&self) -> Result<Option<Notification>, AppError>;

    /// Remove a previously received notification from the queue.
    async fn acknowledge(&self, notification: &Notification) -> Result<(), AppError>;
}

/// Derives the object key for an uploaded file: the base name of the
/// supplied filename, with any path components stripped.
pub fn object_name_for(filename: &str) -> String {
    filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_strips_path_components() {
        assert_eq!(object_name_for("report.pdf"), "report.pdf");
        assert_eq!(object_name_for("/tmp/uploads/report.pdf"), "report.pdf");
        assert_eq!(object_name_for("C:\\Users\\me\\report.pdf"), "report.pdf");
    }

    #[test]
    fn test_object_name_empty_for_directory_paths() {
        assert_eq!(object_name_for("uploads/"), "");
        assert_eq!(object_name_for(""), "");
    }
}

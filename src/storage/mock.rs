//! In-memory storage gateway for testing.

use crate::error::AppError;
use crate::storage::{Notification, StorageGateway};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Mock storage gateway that keeps objects and queue messages in memory.
///
/// Messages behave like the real queue: dequeuing does not remove a message,
/// only `acknowledge` does.
pub struct MockStorageGateway {
    objects: Arc<Mutex<HashMap<String, Bytes>>>,
    queue: Arc<Mutex<Vec<Notification>>>,
    should_fail: bool,
}

impl MockStorageGateway {
    pub fn new() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
            should_fail: false,
        }
    }

    /// Create a mock gateway whose every operation fails with
    /// `StorageUnavailable`.
    pub fn failing() -> Self {
        Self {
            objects: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(Vec::new())),
            should_fail: true,
        }
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.should_fail {
            return Err(AppError::StorageUnavailable(
                "mock storage backend failure".into(),
            ));
        }
        Ok(())
    }

    /// Number of objects currently stored.
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Number of messages currently on the queue.
    pub async fn queued_count(&self) -> usize {
        self.queue.lock().await.len()
    }
}

impl Default for MockStorageGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageGateway for MockStorageGateway {
    async fn put_object(&self, name: &str, content: Bytes) -> Result<(), AppError> {
        self.check_available()?;
        self.objects.lock().await.insert(name.to_string(), content);
        Ok(())
    }

    async fn get_object(&self, name: &str) -> Result<Bytes, AppError> {
        self.check_available()?;
        self.objects
            .lock()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("object {} not found", name)))
    }

    async fn object_exists(&self, name: &str) -> Result<bool, AppError> {
        self.check_available()?;
        Ok(self.objects.lock().await.contains_key(name))
    }

    async fn delete_object(&self, name: &str) -> Result<(), AppError> {
        self.check_available()?;
        self.objects.lock().await.remove(name);
        Ok(())
    }

    async fn enqueue_notification(
        &self,
        attributes: HashMap<String, String>,
        body: &str,
    ) -> Result<String, AppError> {
        self.check_available()?;
        let message_id = format!("mock-{}", Uuid::new_v4());
        self.queue.lock().await.push(Notification {
            body: body.to_string(),
            attributes,
            receipt: message_id.clone(),
        });
        Ok(message_id)
    }

    async fn dequeue_one_notification(&self) -> Result<Option<Notification>, AppError> {
        self.check_available()?;
        Ok(self.queue.lock().await.first().cloned())
    }

    async fn acknowledge(&self, notification: &Notification) -> Result<(), AppError> {
        self.check_available()?;
        self.queue
            .lock()
            .await
            .retain(|queued| queued.receipt != notification.receipt);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_gateway_object_round_trip() {
        let gateway = MockStorageGateway::new();

        gateway
            .put_object("report.pdf", Bytes::from_static(b"%PDF-1.4"))
            .await
            .unwrap();
        assert!(gateway.object_exists("report.pdf").await.unwrap());

        let content = gateway.get_object("report.pdf").await.unwrap();
        assert_eq!(content, Bytes::from_static(b"%PDF-1.4"));
    }

    #[tokio::test]
    async fn test_mock_gateway_delete_is_idempotent() {
        let gateway = MockStorageGateway::new();

        gateway
            .put_object("notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();
        gateway.delete_object("notes.txt").await.unwrap();
        assert!(!gateway.object_exists("notes.txt").await.unwrap());

        // Deleting an absent object is not an error.
        gateway.delete_object("notes.txt").await.unwrap();
    }

    #[tokio::test]
    async fn test_mock_gateway_queue_ack_removes_message() {
        let gateway = MockStorageGateway::new();

        let mut attributes = HashMap::new();
        attributes.insert("event".to_string(), "task_created".to_string());
        gateway
            .enqueue_notification(attributes, "task 1 created")
            .await
            .unwrap();

        let received = gateway.dequeue_one_notification().await.unwrap().unwrap();
        assert_eq!(received.body, "task 1 created");
        assert_eq!(received.attributes.get("event").unwrap(), "task_created");

        // Receiving does not remove the message; acknowledging does.
        assert_eq!(gateway.queued_count().await, 1);
        gateway.acknowledge(&received).await.unwrap();
        assert_eq!(gateway.queued_count().await, 0);
        assert!(gateway.dequeue_one_notification().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failing_gateway() {
        let gateway = MockStorageGateway::failing();

        let result = gateway.put_object("x", Bytes::from_static(b"y")).await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));

        let result = gateway.dequeue_one_notification().await;
        assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    }
}

//! AWS-backed storage gateway (S3 for objects, SQS for notifications).
//!
//! Clients are built from the SDK's default credential resolution:
//! environment variables (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`),
//! IAM roles, or the shared credentials file. The region can be overridden
//! through configuration; bucket and queue settings come from
//! [`StorageConfig`](crate::config::StorageConfig).

use crate::config::StorageConfig;
use crate::error::AppError;
use crate::storage::{Notification, StorageGateway};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_sqs::types::MessageAttributeValue;
use bytes::Bytes;
use std::collections::HashMap;

/// Storage gateway over AWS S3 and SQS.
pub struct AwsStorageGateway {
    s3: aws_sdk_s3::Client,
    sqs: aws_sdk_sqs::Client,
    bucket: String,
    queue_url: String,
}

impl AwsStorageGateway {
    /// Create a gateway with prebuilt clients (useful for tests pointing at
    /// a local S3/SQS-compatible endpoint).
    pub fn new(
        s3: aws_sdk_s3::Client,
        sqs: aws_sdk_sqs::Client,
        bucket: impl Into<String>,
        queue_url: impl Into<String>,
    ) -> Self {
        Self {
            s3,
            sqs,
            bucket: bucket.into(),
            queue_url: queue_url.into(),
        }
    }

    /// Create a gateway from application configuration and the default AWS
    /// credential chain.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let mut loader = aws_config::from_env();
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        let sdk_config = loader.load().await;

        log::info!(
            "storage gateway ready: bucket {}, queue {}",
            config.bucket,
            config.queue_name
        );

        Self::new(
            aws_sdk_s3::Client::new(&sdk_config),
            aws_sdk_sqs::Client::new(&sdk_config),
            config.bucket.clone(),
            config.queue_url.clone(),
        )
    }
}

/// Logs the vendor error and collapses it into `StorageUnavailable` so no
/// backend detail reaches the client.
fn storage_err<E: std::fmt::Debug>(context: &str, err: E) -> AppError {
    log::error!("{} failed: {:?}", context, err);
    AppError::StorageUnavailable(format!("{} failed", context))
}

#[async_trait]
impl StorageGateway for AwsStorageGateway {
    async fn put_object(&self, name: &str, content: Bytes) -> Result<(), AppError> {
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(ByteStream::from(content))
            .send()
            .await
            .map_err(|e| storage_err("object upload", e))?;
        Ok(())
    }

    async fn get_object(&self, name: &str) -> Result<Bytes, AppError> {
        let resp = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    AppError::NotFound(format!("object {} not found", name))
                } else {
                    storage_err("object download", e)
                }
            })?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| storage_err("object download", e))?;
        Ok(data.into_bytes())
    }

    async fn object_exists(&self, name: &str) -> Result<bool, AppError> {
        match self
            .s3
            .head_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_not_found())
                    .unwrap_or(false)
                {
                    Ok(false)
                } else {
                    Err(storage_err("object lookup", e))
                }
            }
        }
    }

    async fn delete_object(&self, name: &str) -> Result<(), AppError> {
        // S3 deletes are idempotent: removing an absent key succeeds.
        self.s3
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| storage_err("object delete", e))?;
        Ok(())
    }

    async fn enqueue_notification(
        &self,
        attributes: HashMap<String, String>,
        body: &str,
    ) -> Result<String, AppError> {
        let mut request = self
            .sqs
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body);

        for (key, value) in attributes {
            let attribute = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| storage_err("notification enqueue", e))?;
            request = request.message_attributes(key, attribute);
        }

        let out = request
            .send()
            .await
            .map_err(|e| storage_err("notification enqueue", e))?;

        out.message_id()
            .map(str::to_string)
            .ok_or_else(|| AppError::StorageUnavailable("queue returned no message id".into()))
    }

    async fn dequeue_one_notification(&self) -> Result<Option<Notification>, AppError> {
        let out = self
            .sqs
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| storage_err("notification dequeue", e))?;

        let message = match out.messages().first() {
            Some(message) => message,
            None => return Ok(None),
        };

        let attributes = message
            .message_attributes()
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|(k, v)| {
                        v.string_value().map(|value| (k.clone(), value.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(Notification {
            body: message.body().unwrap_or_default().to_string(),
            attributes,
            receipt: message.receipt_handle().unwrap_or_default().to_string(),
        }))
    }

    async fn acknowledge(&self, notification: &Notification) -> Result<(), AppError> {
        self.sqs
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&notification.receipt)
            .send()
            .await
            .map_err(|e| storage_err("notification acknowledge", e))?;
        Ok(())
    }
}

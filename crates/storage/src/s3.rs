//! S3-backed store for deployments with object storage.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{validate_key, FileStore, FileStream, StoreError};

pub struct S3FileStore {
    client: Client,
    bucket: String,
    key_prefix: String,
}

impl S3FileStore {
    pub fn new(client: Client, bucket: String, key_prefix: String) -> Self {
        Self { client, bucket, key_prefix }
    }

    /// Build a client from ambient AWS configuration (env vars, profile,
    /// instance metadata).
    pub async fn from_env(bucket: String, key_prefix: String) -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(Client::new(&config), bucket, key_prefix)
    }

    fn full_key(&self, key: &str) -> Result<String, StoreError> {
        validate_key(key)?;
        if self.key_prefix.is_empty() {
            Ok(key.to_string())
        } else {
            Ok(format!("{}/{}", self.key_prefix.trim_end_matches('/'), key))
        }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let full_key = self.full_key(key)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<FileStream, StoreError> {
        let full_key = self.full_key(key)?;
        match self.client.get_object().bucket(&self.bucket).key(&full_key).send().await {
            Ok(response) => Ok(Box::new(response.body.into_async_read())),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    Err(StoreError::NotFound(key.to_string()))
                } else {
                    Err(StoreError::S3(service_err.to_string()))
                }
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let full_key = self.full_key(key)?;
        // S3 DeleteObject succeeds for keys that do not exist, which matches
        // the trait contract.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|err| StoreError::S3(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prefix_is_prepended_once() {
        let config = aws_config::load_from_env().await;
        let store =
            S3FileStore::new(Client::new(&config), "bucket".to_string(), "uploads/".to_string());
        assert_eq!(store.full_key("7/a.csv").unwrap(), "uploads/7/a.csv");

        let bare = S3FileStore::new(Client::new(&config), "bucket".to_string(), String::new());
        assert_eq!(bare.full_key("7/a.csv").unwrap(), "7/a.csv");
    }
}

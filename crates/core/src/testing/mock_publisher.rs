//! Mock artifact publisher for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::JobParameters;
use crate::resolver::{ArtifactPublisher, PublishError, ResultReference};

/// Publisher that returns `{base}/{output_id}` URLs and records calls.
#[derive(Debug, Clone)]
pub struct MockPublisher {
    base_url: String,
    published: Arc<RwLock<Vec<JobParameters>>>,
    fail: Arc<RwLock<bool>>,
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new("https://mock.example.com/results")
    }
}

impl MockPublisher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            published: Arc::new(RwLock::new(Vec::new())),
            fail: Arc::new(RwLock::new(false)),
        }
    }

    /// Make subsequent publishes fail with an upload error.
    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn published(&self) -> Vec<JobParameters> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl ArtifactPublisher for MockPublisher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, params: &JobParameters) -> Result<ResultReference, PublishError> {
        if *self.fail.read().await {
            return Err(PublishError::Upload("mock upload failure".to_string()));
        }
        self.published.write().await.push(params.clone());
        Ok(ResultReference::Url(format!(
            "{}/{}",
            self.base_url, params.output_id
        )))
    }
}

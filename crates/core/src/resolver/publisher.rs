//! Artifact publishing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::types::ResultReference;
use crate::job::JobParameters;

/// Placeholder substituted with the job's output identifier.
pub const OUTPUT_ID_PLACEHOLDER: &str = "{output_id}";

/// Errors raised while addressing a finished artifact.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The template cannot address an artifact.
    #[error("Invalid result template: {0}")]
    InvalidTemplate(String),

    /// The unit reported success but no artifact carries its output id.
    #[error("No artifact found for output {output_id}")]
    ArtifactMissing { output_id: String },

    /// Hosting the artifact failed.
    #[error("Failed to upload artifact: {0}")]
    Upload(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Maps a succeeded job to a [`ResultReference`].
///
/// This is the hosting seam: a local template, a CDN upload or anything else
/// that can address the artifact named by `params.output_id`.
#[async_trait]
pub trait ArtifactPublisher: Send + Sync {
    /// Returns the name of this publisher implementation.
    fn name(&self) -> &str;

    async fn publish(&self, params: &JobParameters) -> Result<ResultReference, PublishError>;
}

/// Publishes by substituting the output id into a URL or path template.
#[derive(Debug, Clone)]
pub struct TemplatePublisher {
    template: String,
    artifact_dir: Option<PathBuf>,
}

impl TemplatePublisher {
    pub fn new(template: impl Into<String>) -> Result<Self, PublishError> {
        let template = template.into();
        if !template.contains(OUTPUT_ID_PLACEHOLDER) {
            return Err(PublishError::InvalidTemplate(format!(
                "template must contain {}",
                OUTPUT_ID_PLACEHOLDER
            )));
        }
        Ok(Self {
            template,
            artifact_dir: None,
        })
    }

    /// Requires an entry named after the output id (any extension) in `dir`
    /// before publishing.
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Pure mapping from output id to reference.
    pub fn reference_for(&self, output_id: &str) -> ResultReference {
        let rendered = self.template.replace(OUTPUT_ID_PLACEHOLDER, output_id);
        if rendered.starts_with("http://") || rendered.starts_with("https://") {
            ResultReference::Url(rendered)
        } else {
            ResultReference::Path(PathBuf::from(rendered))
        }
    }

    async fn artifact_exists(&self, dir: &Path, output_id: &str) -> Result<bool, PublishError> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name == output_id || name.starts_with(&format!("{}.", output_id)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl ArtifactPublisher for TemplatePublisher {
    fn name(&self) -> &str {
        "template"
    }

    async fn publish(&self, params: &JobParameters) -> Result<ResultReference, PublishError> {
        if let Some(dir) = &self.artifact_dir {
            if !self.artifact_exists(dir, &params.output_id).await? {
                return Err(PublishError::ArtifactMissing {
                    output_id: params.output_id.clone(),
                });
            }
        }

        let reference = self.reference_for(&params.output_id);
        debug!(job_id = %params.job_id, reference = %reference, "Published artifact");
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(output_id: &str) -> JobParameters {
        JobParameters {
            job_id: "job-1".to_string(),
            input_path: PathBuf::from("in.jpg"),
            auxiliary_path: PathBuf::from("aux.jpg"),
            output_id: output_id.to_string(),
        }
    }

    #[test]
    fn test_template_requires_placeholder() {
        assert!(matches!(
            TemplatePublisher::new("/results/latest"),
            Err(PublishError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn test_url_template() {
        let publisher = TemplatePublisher::new("https://cdn.example.com/w/{output_id}").unwrap();
        assert_eq!(
            publisher.reference_for("out123"),
            ResultReference::Url("https://cdn.example.com/w/out123".to_string())
        );
    }

    #[test]
    fn test_path_template() {
        let publisher = TemplatePublisher::new("/results/{output_id}.gif").unwrap();
        let reference = publisher.reference_for("out123");
        assert_eq!(reference, ResultReference::Path(PathBuf::from("/results/out123.gif")));
        assert!(!reference.is_url());
        assert_eq!(reference.to_string(), "/results/out123.gif");
    }

    #[tokio::test]
    async fn test_publish_without_artifact_dir() {
        let publisher = TemplatePublisher::new("/results/{output_id}").unwrap();
        let reference = publisher.publish(&params("out123")).await.unwrap();
        assert_eq!(reference.to_string(), "/results/out123");
    }

    #[tokio::test]
    async fn test_publish_requires_artifact_when_dir_set() {
        let dir = TempDir::new().unwrap();
        let publisher = TemplatePublisher::new("/results/{output_id}.gif")
            .unwrap()
            .with_artifact_dir(dir.path());

        let missing = publisher.publish(&params("out123")).await;
        assert!(matches!(missing, Err(PublishError::ArtifactMissing { .. })));

        std::fs::write(dir.path().join("out123.gif"), b"GIF89a").unwrap();
        let reference = publisher.publish(&params("out123")).await.unwrap();
        assert_eq!(reference.to_string(), "/results/out123.gif");
    }

    #[tokio::test]
    async fn test_artifact_prefix_must_be_exact() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("out1234.gif"), b"GIF89a").unwrap();
        let publisher = TemplatePublisher::new("/results/{output_id}")
            .unwrap()
            .with_artifact_dir(dir.path());

        assert!(publisher.publish(&params("out123")).await.is_err());
    }
}

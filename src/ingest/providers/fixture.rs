// src/ingest/providers/fixture.rs
use async_trait::async_trait;

use super::records_from_document;
use crate::error::FetchError;
use crate::ingest::types::{FetchSession, Fetcher, RawReview};

/// Reads a local JSON document. Useful for offline runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

#[async_trait]
impl Fetcher for FileFetcher {
    async fn open_session(&self) -> Result<Box<dyn FetchSession>, FetchError> {
        Ok(Box::new(FileSession))
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

struct FileSession;

#[async_trait]
impl FetchSession for FileSession {
    async fn load(&mut self, source: &str) -> Result<Vec<RawReview>, FetchError> {
        let path = source.strip_prefix("file://").unwrap_or(source);
        let body = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FetchError::Network(format!("reading {path}: {e}")))?;
        records_from_document(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_records_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.json");
        std::fs::write(&path, r#"[{"text":"Nice","rating":"4 stars","author":"Ana"}]"#).unwrap();

        let mut session = FileFetcher.open_session().await.unwrap();
        let records = session.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].author.as_deref(), Some("Ana"));
    }

    #[tokio::test]
    async fn missing_file_is_retryable() {
        let mut session = FileFetcher.open_session().await.unwrap();
        let err = session.load("/definitely/not/here.json").await.unwrap_err();
        assert!(err.is_retryable());
    }
}

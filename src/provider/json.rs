use std::{fs, path::PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::provider::{AuthorPayload, Provider, PublicationPayload};

/// Serves an [`AuthorPayload`] stored as JSON on disk.
///
/// The document is taken to be already complete, so filling a publication returns it as is.
#[derive(Debug, Clone)]
pub struct JsonProvider {
    path: PathBuf,
}

impl JsonProvider {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Provider for JsonProvider {
    fn name(&self) -> &'static str {
        "json"
    }

    fn author(&self, profile_id: &str) -> anyhow::Result<AuthorPayload> {
        debug!(profile_id, path = %self.path.display(), "loading payload");
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read payload {}", self.path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("malformed payload {}", self.path.display()))
    }

    fn fill_publication(
        &self,
        publication: PublicationPayload,
    ) -> anyhow::Result<PublicationPayload> {
        Ok(publication)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_payload_from_disk() {
        let tmp = NamedTempFile::new().expect("tmp file");
        fs::write(
            tmp.path(),
            r#"{"citedby": 17, "hindex": 2, "i10index": 1, "cites_per_year": {"2023": 2}}"#,
        )
        .unwrap();
        let provider = JsonProvider::new(tmp.path().to_path_buf());
        let payload = provider.author("anyone").unwrap();
        assert_eq!(payload.citedby, Some(17));
        assert_eq!(payload.i10index, Some(1));
    }

    #[test]
    fn missing_and_malformed_payloads_fail() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonProvider::new(dir.path().join("nope.json"));
        let err = missing.author("x").unwrap_err();
        assert!(format!("{err:#}").contains("failed to read payload"));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        let err = JsonProvider::new(bad).author("x").unwrap_err();
        assert!(format!("{err:#}").contains("malformed payload"));
    }
}

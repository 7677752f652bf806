//! Failure screenshots written to a directory.

use std::path::{Path, PathBuf};

use action_primitives::{ScreenshotHook, ScreenshotRequest};
use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct DirectoryScreenshotHook {
    dir: PathBuf,
}

impl DirectoryScreenshotHook {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(request: &ScreenshotRequest) -> String {
        let label: String = request
            .label
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        format!(
            "{}_{}_{}.png",
            label,
            request.target.name(),
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        )
    }
}

#[async_trait]
impl ScreenshotHook for DirectoryScreenshotHook {
    async fn capture(&self, request: ScreenshotRequest) {
        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            warn!(dir = %self.dir.display(), ?err, "cannot create screenshot directory");
            return;
        }
        let path = self.dir.join(Self::file_name(&request));
        match tokio::fs::write(&path, &request.png).await {
            Ok(()) => info!(
                path = %path.display(),
                target = %request.target,
                error = %request.error,
                "saved failure screenshot"
            ),
            Err(err) => warn!(path = %path.display(), ?err, "failed to write screenshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mailpilot_core_types::{ErrorKind, LogicalTarget};

    #[tokio::test]
    async fn writes_png_named_after_provider_and_target() {
        let dir = tempfile::tempdir().unwrap();
        let hook = DirectoryScreenshotHook::new(dir.path().join("shots"));
        hook.capture(ScreenshotRequest {
            label: "gmail".into(),
            target: LogicalTarget::SendButton,
            error: ErrorKind::AllCandidatesExhausted,
            png: vec![1, 2, 3],
        })
        .await;

        let entries: Vec<_> = std::fs::read_dir(hook.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("gmail_send_button_"));
        assert!(entries[0].ends_with(".png"));
    }
}

//! Home directory provisioning for newly created accounts.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use onboard_core::config::HomeDirectoryConfig;
use onboard_core::error::{OnboardError, Result};

#[async_trait]
pub trait HomeDirectoryProvisioner: Send + Sync {
    /// Location the account's home directory lives at.
    fn path_for(&self, username: &str) -> Result<PathBuf>;

    /// Drive letter mapped to the home directory, if any.
    fn drive(&self) -> Option<&str>;

    /// Create the home directory. Succeeds when it already exists; the root
    /// itself must already be present.
    async fn provision(&self, username: &str) -> Result<PathBuf>;
}

/// Creates `<root>/<username>` on a local or mounted file system.
///
/// The root has to be an absolute path on this host and must exist. A UNC
/// share is only absolute on Windows; elsewhere mount it and point `root`
/// at the mount.
pub struct FsHomeDirectory {
    root: PathBuf,
    drive: Option<String>,
}

impl FsHomeDirectory {
    pub fn new(root: impl Into<PathBuf>, drive: Option<String>) -> Self {
        Self {
            root: root.into(),
            drive,
        }
    }

    pub fn from_config(config: &HomeDirectoryConfig) -> Self {
        Self::new(&config.root, config.drive.clone())
    }
}

#[async_trait]
impl HomeDirectoryProvisioner for FsHomeDirectory {
    fn path_for(&self, username: &str) -> Result<PathBuf> {
        let name = username.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return Err(OnboardError::HomeDirectory(format!(
                "invalid username for home directory: {username:?}"
            )));
        }
        if !self.root.is_absolute() {
            return Err(OnboardError::HomeDirectory(format!(
                "home directory root {} is not an absolute path on this host",
                self.root.display()
            )));
        }
        Ok(self.root.join(name))
    }

    fn drive(&self) -> Option<&str> {
        self.drive.as_deref()
    }

    async fn provision(&self, username: &str) -> Result<PathBuf> {
        let path = self.path_for(username)?;
        let root_ok = tokio::fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !root_ok {
            return Err(OnboardError::HomeDirectory(format!(
                "home directory root {} is not an existing directory",
                self.root.display()
            )));
        }

        match tokio::fs::create_dir(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => {}
            Err(e) => {
                return Err(OnboardError::HomeDirectory(format!(
                    "failed to create {}: {e}",
                    path.display()
                )))
            }
        }
        debug!(path = %path.display(), "home directory ready");
        Ok(path)
    }
}

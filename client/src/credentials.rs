use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CREDENTIALS_FILE: &str = "credentials.yaml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Credentials {
    token: Option<String>,
}

/// The persisted credential token.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn open_default() -> Result<Self> {
        let dir = shared::config_dir()?;
        Ok(Self::at(dir.join(CREDENTIALS_FILE)))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {:?}", self.path))?;
        let credentials: Credentials = serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid credentials file {:?}", self.path))?;

        Ok(credentials.token.filter(|t| !t.is_empty()))
    }

    pub fn store(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let yaml = serde_yaml::to_string(&Credentials {
            token: Some(token.to_string()),
        })?;
        fs::write(&self.path, yaml)
            .with_context(|| format!("Failed to write {:?}", self.path))?;
        restrict_permissions(&self.path)?;

        info!("Stored credential in {:?}", self.path);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Removed stored credential");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No stored credential to remove");
                Ok(())
            }
            Err(e) => Err(e).with_context(|| format!("Failed to remove {:?}", self.path)),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("Failed to restrict permissions on {:?}", path))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::task::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: User,
}

#[derive(Debug)]
pub struct SessionStore {
    pub data_dir: PathBuf,
    session_path: PathBuf,
}

impl SessionStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let session_path = data_dir.join("session.json");
        info!(
            data_dir = %data_dir.display(),
            session = %session_path.display(),
            "opened session store"
        );

        Ok(Self {
            data_dir,
            session_path,
        })
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> anyhow::Result<Option<Session>> {
        if !self.session_path.exists() {
            debug!("no stored session");
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.session_path)
            .with_context(|| format!("failed reading {}", self.session_path.display()))?;
        let session: Session = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing {}", self.session_path.display()))?;

        debug!(user = %session.user.username, "loaded stored session");
        Ok(Some(session))
    }

    #[tracing::instrument(skip(self, session), fields(user = %session.user.username))]
    pub fn save(&self, session: &Session) -> anyhow::Result<()> {
        let dir = self
            .session_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let serialized = serde_json::to_string_pretty(session)?;
        temp.write_all(serialized.as_bytes())?;
        temp.flush()?;

        temp.persist(&self.session_path).map_err(|err| {
            anyhow!(
                "failed to persist {}: {}",
                self.session_path.display(),
                err
            )
        })?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub fn clear(&self) -> anyhow::Result<()> {
        if self.session_path.exists() {
            fs::remove_file(&self.session_path)
                .with_context(|| format!("failed removing {}", self.session_path.display()))?;
            info!("cleared stored session");
        }
        Ok(())
    }

    pub fn require(&self) -> anyhow::Result<Session> {
        self.load()?
            .ok_or_else(|| anyhow!("not logged in; run `tether login <email>` first"))
    }
}

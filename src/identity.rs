//! Local identity provider: one user per credential file.

use crate::config::IdentityConfig;
use crate::errors::IdentityError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, sync::watch};
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub is_anonymous: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct IdentityProvider {
    inner: Arc<IdentityInner>,
}

struct IdentityInner {
    credential_path: PathBuf,
    allow_anonymous: bool,
    state: watch::Sender<Option<User>>,
}

impl IdentityProvider {
    /// Restores the signed-in user from the credential file, if any.
    pub async fn initialize(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let user = load_credential(&config.credential_path).await?;
        if let Some(user) = &user {
            info!(uid = %user.uid, "restored existing credential");
        }

        let (state, _) = watch::channel(user);
        Ok(Self {
            inner: Arc::new(IdentityInner {
                credential_path: config.credential_path.clone(),
                allow_anonymous: config.allow_anonymous,
                state,
            }),
        })
    }

    pub fn current_user(&self) -> Option<User> {
        self.inner.state.borrow().clone()
    }

    /// Push channel of identity state; the current value is marked unseen.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        let mut receiver = self.inner.state.subscribe();
        receiver.mark_changed();
        receiver
    }

    pub async fn sign_in_anonymously(&self) -> Result<User, IdentityError> {
        if !self.inner.allow_anonymous {
            return Err(IdentityError::OperationNotAllowed);
        }

        let user = User {
            uid: Uuid::new_v4().to_string(),
            is_anonymous: true,
            created_at: Utc::now(),
        };
        persist_credential(&self.inner.credential_path, &user).await?;

        info!(uid = %user.uid, "signed in anonymously");
        self.inner.state.send_replace(Some(user.clone()));
        Ok(user)
    }
}

async fn load_credential(path: &Path) -> Result<Option<User>, IdentityError> {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(user) => Ok(Some(user)),
            Err(err) => {
                error!("failed to parse credential file: {err}");
                Ok(None)
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

async fn persist_credential(path: &Path, user: &User) -> Result<(), IdentityError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    let payload = serde_json::to_vec_pretty(user)?;
    fs::write(path, payload).await?;
    Ok(())
}

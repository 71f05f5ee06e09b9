//! JSON-file-backed credential store.
//!
//! Owns user accounts and pending account requests. All mutations funnel
//! through a single `tokio::sync::Mutex` so concurrent approve/deny/create
//! calls cannot interleave read-modify-write cycles, and every mutation is
//! written to disk (temp file + rename) before the in-memory copy is
//! updated, so a failed write leaves both sides on the previous state.

mod models;

pub use models::*;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

const STORE_FILE: &str = "modresolve.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("failed to persist store: {0}")]
    Io(#[from] std::io::Error),
}

/// The persisted document. Insertion order of both lists is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    users: Vec<User>,
    requests: Vec<AccountRequest>,
}

struct Inner {
    path: PathBuf,
    data: StoreData,
}

/// Bootstrap identity for the protected root administrator.
#[derive(Debug, Clone)]
pub struct RootAdmin {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

pub struct Store {
    inner: Mutex<Inner>,
    root_admin_email: String,
}

impl Store {
    /// Open (or create) the store under `data_dir` and ensure the root
    /// administrator exists. Bootstrap is idempotent: an existing record
    /// for the root admin email is left untouched.
    pub async fn open(data_dir: &Path, root_admin: RootAdmin) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir: {}", data_dir.display()))?;

        let path = data_dir.join(STORE_FILE);
        let mut data = load_or_recover(&path)?;

        if !data.users.iter().any(|u| u.email == root_admin.email) {
            info!(email = %root_admin.email, "Bootstrapping root administrator account");
            data.users.push(User {
                name: root_admin.name,
                email: root_admin.email.clone(),
                password_hash: root_admin.password_hash,
                is_admin: true,
            });
            write_atomic(&path, &data).await?;
        }

        Ok(Self {
            inner: Mutex::new(Inner { path, data }),
            root_admin_email: root_admin.email,
        })
    }

    pub fn root_admin_email(&self) -> &str {
        &self.root_admin_email
    }

    pub async fn list_users(&self) -> Vec<User> {
        self.inner.lock().await.data.users.clone()
    }

    pub async fn list_requests(&self) -> Vec<AccountRequest> {
        self.inner.lock().await.data.requests.clone()
    }

    pub async fn find_user_by_email(&self, email: &str) -> Option<User> {
        let inner = self.inner.lock().await;
        inner.data.users.iter().find(|u| u.email == email).cloned()
    }

    pub async fn find_request_by_email(&self, email: &str) -> Option<AccountRequest> {
        let inner = self.inner.lock().await;
        inner
            .data
            .requests
            .iter()
            .find(|r| r.email == email)
            .cloned()
    }

    /// Create a user directly. `password_hash` must already be an argon2
    /// hash; the store never sees plaintext credentials.
    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.data.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }

        let user = User {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_admin,
        };

        let mut data = inner.data.clone();
        data.users.push(user.clone());
        write_atomic(&inner.path, &data).await?;
        inner.data = data;

        Ok(user)
    }

    /// Create a pending account request. The email must be unused across
    /// both the user and request namespaces.
    pub async fn create_request(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<AccountRequest, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.data.users.iter().any(|u| u.email == email) {
            return Err(StoreError::Conflict(
                "An account with this email already exists".to_string(),
            ));
        }
        if inner.data.requests.iter().any(|r| r.email == email) {
            return Err(StoreError::Conflict(
                "An account with this email has already been requested".to_string(),
            ));
        }

        let request = AccountRequest {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };

        let mut data = inner.data.clone();
        data.requests.push(request.clone());
        write_atomic(&inner.path, &data).await?;
        inner.data = data;

        Ok(request)
    }

    /// Promote a pending request to a non-admin user and remove it, in one
    /// step. If a user with that email already exists the request is still
    /// consumed without error.
    pub async fn approve_request(&self, email: &str) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(pos) = inner.data.requests.iter().position(|r| r.email == email) else {
            return Err(StoreError::NotFound("Request not found".to_string()));
        };

        let mut data = inner.data.clone();
        let request = data.requests.remove(pos);

        let user = match data.users.iter().find(|u| u.email == email) {
            Some(existing) => {
                warn!(email, "Approving request for an email that is already a user");
                existing.clone()
            }
            None => {
                let user = User {
                    name: request.name,
                    email: request.email,
                    password_hash: request.password_hash,
                    is_admin: false,
                };
                data.users.push(user.clone());
                user
            }
        };

        write_atomic(&inner.path, &data).await?;
        inner.data = data;

        info!(email, "Account request approved");
        Ok(user)
    }

    /// Discard a pending request. Absent requests are a no-op.
    pub async fn deny_request(&self, email: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(pos) = inner.data.requests.iter().position(|r| r.email == email) else {
            return Ok(());
        };

        let mut data = inner.data.clone();
        data.requests.remove(pos);
        write_atomic(&inner.path, &data).await?;
        inner.data = data;

        info!(email, "Account request denied");
        Ok(())
    }

    /// Remove a user. The root administrator can never be deleted; deleting
    /// a missing user is a no-op.
    pub async fn delete_user(&self, email: &str) -> Result<(), StoreError> {
        if email == self.root_admin_email {
            return Err(StoreError::Forbidden(
                "The root administrator account cannot be deleted".to_string(),
            ));
        }

        let mut inner = self.inner.lock().await;

        let Some(pos) = inner.data.users.iter().position(|u| u.email == email) else {
            return Ok(());
        };

        let mut data = inner.data.clone();
        data.users.remove(pos);
        write_atomic(&inner.path, &data).await?;
        inner.data = data;

        info!(email, "User deleted");
        Ok(())
    }
}

/// Load the store file, falling back to an empty store if it is missing.
/// A file that exists but fails to parse is moved aside and the store
/// restarts empty; this discards data, so it is logged loudly.
fn load_or_recover(path: &Path) -> Result<StoreData> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No store file found at {}, starting empty", path.display());
            return Ok(StoreData::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read store file: {}", path.display()))
        }
    };

    match serde_json::from_str(&content) {
        Ok(data) => Ok(data),
        Err(e) => {
            let backup = path.with_extension(format!(
                "json.corrupt-{}",
                chrono::Utc::now().format("%Y%m%dT%H%M%S")
            ));
            error!(
                error = %e,
                backup = %backup.display(),
                "Store file is corrupted; moving it aside and RESTARTING WITH AN EMPTY STORE. \
                 Existing user data is being discarded."
            );
            std::fs::rename(path, &backup)
                .with_context(|| format!("Failed to move corrupted store file to {}", backup.display()))?;
            Ok(StoreData::default())
        }
    }
}

/// Write the document to a temp file in the same directory, then rename
/// over the real path so readers never observe a partial file.
async fn write_atomic(path: &Path, data: &StoreData) -> Result<(), std::io::Error> {
    let json = serde_json::to_vec_pretty(data).map_err(std::io::Error::other)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

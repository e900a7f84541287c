use std::collections::HashMap;
use std::collections::HashSet;
use std::path::Path;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs::File;
use tokio::fs::OpenOptions;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::identity::models::EmailAddress;
use crate::domain::identity::models::Login;
use crate::domain::identity::models::NewUser;
use crate::domain::identity::models::Profile;
use crate::domain::identity::models::RefreshToken;
use crate::domain::identity::models::SubjectId;
use crate::domain::identity::models::User;
use crate::domain::identity::ports::IdentityRepository;
use crate::identity::errors::StorageError;

/// Process-local implementation of IdentityRepository.
///
/// Users are appended to a JSON-lines file and replayed on open, so they
/// survive restarts. Profiles and refresh tokens live only in memory.
pub struct FileIdentityRepository {
    path: PathBuf,
    users: RwLock<UserLog>,
    profiles: RwLock<HashMap<SubjectId, EmailAddress>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
}

/// In-memory user index plus the append handle of the backing file.
///
/// Kept under one lock so the uniqueness check, the append and the index
/// update happen as a unit.
struct UserLog {
    file: File,
    by_login: HashMap<String, User>,
    subject_ids: HashSet<SubjectId>,
    next_id: i64,
}

/// One line of the users file.
#[derive(Debug, Serialize, Deserialize)]
struct UserRecord {
    id: i64,
    login: String,
    password_hash: String,
    user_id: Uuid,
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            login: user.login.as_str().to_string(),
            password_hash: user.password_hash.clone(),
            user_id: user.subject_id.0,
        }
    }
}

impl FileIdentityRepository {
    /// Open (or create) the users file at `path` and replay it.
    ///
    /// # Errors
    /// * `Unavailable` - File cannot be opened or read
    /// * `Corrupt` - A line is not a valid user record, or logins repeat
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(&path, e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .await
            .map_err(|e| io_error(&path, e))?;

        let mut log = UserLog {
            file,
            by_login: HashMap::new(),
            subject_ids: HashSet::new(),
            next_id: 1,
        };
        Self::replay(&path, &mut log).await?;

        tracing::info!(
            path = %path.display(),
            users = log.by_login.len(),
            storage = "file",
            "Users file loaded"
        );

        Ok(Self {
            path,
            users: RwLock::new(log),
            profiles: RwLock::new(HashMap::new()),
            refresh_tokens: RwLock::new(HashMap::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn replay(path: &Path, log: &mut UserLog) -> Result<(), StorageError> {
        let reader = File::open(path).await.map_err(|e| io_error(path, e))?;
        let mut reader = BufReader::new(reader);
        let mut line = Vec::new();
        let mut committed = 0u64;
        let mut line_number = 0usize;

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|e| io_error(path, e))?;
            if read == 0 {
                break;
            }
            line_number += 1;

            // An unterminated last line is an append that never completed.
            if line.last() != Some(&b'\n') {
                tracing::warn!(
                    path = %path.display(),
                    line = line_number,
                    bytes = read,
                    "Dropping unterminated trailing record"
                );
                log.file
                    .set_len(committed)
                    .await
                    .map_err(|e| io_error(path, e))?;
                break;
            }
            committed += read as u64;

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let user = parse_record(&line).map_err(|reason| {
                StorageError::Corrupt(format!("{} line {}: {}", path.display(), line_number, reason))
            })?;

            if log.by_login.contains_key(user.login.as_str()) {
                return Err(StorageError::Corrupt(format!(
                    "{} line {}: duplicate login {}",
                    path.display(),
                    line_number,
                    user.login
                )));
            }

            log.next_id = log.next_id.max(user.id + 1);
            log.subject_ids.insert(user.subject_id);
            log.by_login.insert(user.login.as_str().to_string(), user);
        }

        Ok(())
    }
}

fn parse_record(line: &[u8]) -> Result<User, String> {
    let record: UserRecord = serde_json::from_slice(line).map_err(|e| e.to_string())?;
    let login = Login::new(record.login).map_err(|e| e.to_string())?;

    Ok(User {
        id: record.id,
        login,
        password_hash: record.password_hash,
        subject_id: SubjectId(record.user_id),
    })
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Unavailable(format!("{}: {}", path.display(), e))
}

#[async_trait]
impl IdentityRepository for FileIdentityRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StorageError> {
        let mut log = self.users.write().await;

        if log.by_login.contains_key(user.login.as_str()) {
            return Err(StorageError::AlreadyExists(format!("login {}", user.login)));
        }
        if log.subject_ids.contains(&user.subject_id) {
            return Err(StorageError::AlreadyExists(format!("subject {}", user.subject_id)));
        }

        let user = User {
            id: log.next_id,
            login: user.login,
            password_hash: user.password_hash,
            subject_id: user.subject_id,
        };

        let mut line = serde_json::to_string(&UserRecord::from(&user))
            .map_err(|e| StorageError::Unavailable(format!("failed to encode user: {}", e)))?;
        line.push('\n');

        let committed = log
            .file
            .metadata()
            .await
            .map_err(|e| io_error(&self.path, e))?
            .len();

        // Index only after the line is durable in the file.
        let appended = match log.file.write_all(line.as_bytes()).await {
            Ok(()) => log.file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = appended {
            if let Err(rollback) = log.file.set_len(committed).await {
                tracing::error!(path = %self.path.display(), error = %rollback, "Failed to roll back partial user record");
            }
            return Err(io_error(&self.path, e));
        }

        log.next_id += 1;
        log.subject_ids.insert(user.subject_id);
        log.by_login
            .insert(user.login.as_str().to_string(), user.clone());

        tracing::debug!(user_id = user.id, subject_id = %user.subject_id, storage = "file", "User appended");
        Ok(user)
    }

    async fn find_user_by_login(&self, login: &Login) -> Result<Option<User>, StorageError> {
        Ok(self.users.read().await.by_login.get(login.as_str()).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        self.profiles
            .write()
            .await
            .insert(profile.subject_id, profile.email.clone());
        Ok(())
    }

    async fn find_profile(&self, subject_id: &SubjectId) -> Result<Option<Profile>, StorageError> {
        Ok(self
            .profiles
            .read()
            .await
            .get(subject_id)
            .map(|email| Profile {
                subject_id: *subject_id,
                email: email.clone(),
            }))
    }

    async fn create_refresh_token(&self, token: &RefreshToken) -> Result<(), StorageError> {
        let mut tokens = self.refresh_tokens.write().await;

        if tokens.contains_key(&token.token) {
            return Err(StorageError::AlreadyExists("refresh token".to_string()));
        }
        tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn find_refresh_token(&self, token: &str) -> Result<Option<RefreshToken>, StorageError> {
        Ok(self.refresh_tokens.read().await.get(token).cloned())
    }

    async fn revoke_refresh_token(&self, token: &str) -> Result<(), StorageError> {
        match self.refresh_tokens.write().await.get_mut(token) {
            Some(stored) => {
                stored.revoked = true;
                Ok(())
            }
            None => Err(StorageError::NotFound("refresh token".to_string())),
        }
    }

    async fn rotate_refresh_token(
        &self,
        presented: &str,
        replacement: &RefreshToken,
        now: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut tokens = self.refresh_tokens.write().await;

        if !tokens.get(presented).is_some_and(|t| t.is_active(now)) {
            return Ok(false);
        }
        if tokens.contains_key(&replacement.token) {
            return Err(StorageError::AlreadyExists("refresh token".to_string()));
        }

        if let Some(stored) = tokens.get_mut(presented) {
            stored.revoked = true;
        }
        tokens.insert(replacement.token.clone(), replacement.clone());
        Ok(true)
    }

    async fn delete_expired_refresh_tokens(&self, now: DateTime<Utc>) -> Result<u64, StorageError> {
        let mut tokens = self.refresh_tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, token| !token.is_expired(now));
        Ok((before - tokens.len()) as u64)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let log = self.users.read().await;
        log.file
            .metadata()
            .await
            .map(|_| ())
            .map_err(|e| io_error(&self.path, e))
    }

    async fn close(&self) -> Result<(), StorageError> {
        let mut log = self.users.write().await;
        log.file.flush().await.map_err(|e| io_error(&self.path, e))?;
        log.file.sync_all().await.map_err(|e| io_error(&self.path, e))?;
        tracing::info!(path = %self.path.display(), storage = "file", "Users file closed");
        Ok(())
    }
}

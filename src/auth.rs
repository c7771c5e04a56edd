//! Password hashing, login and in-memory sessions with idle expiry.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rand::RngCore;
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::database::{Database, Repository};
use crate::error::{AppError, Result};
use crate::models::{Config, Role, User, UserInput, UserView};
use crate::validation::Validate;

pub const SESSION_COOKIE: &str = "clinic_session";

const HASH_SCHEME: &str = "pbkdf2-sha256";
const HASH_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;

/// `pbkdf2-sha256$<rounds>$<salt hex>$<digest hex>`
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{HASH_SCHEME}${HASH_ROUNDS}${}${}",
        hex::encode(salt),
        hex::encode(derive(password, &salt, HASH_ROUNDS))
    )
}

/// Check a password against a stored hash. The round count comes from the
/// stored value, so older hashes keep verifying after `HASH_ROUNDS` changes.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(HASH_SCHEME), Some(rounds), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(rounds) = rounds.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    if rounds == 0 || expected.len() != DIGEST_LEN {
        return false;
    }

    derive(password, &salt, rounds)[..].ct_eq(&expected).into()
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; DIGEST_LEN] {
    let mut out = [0u8; DIGEST_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}

/// Build the stored record for a create/update body. A missing password on
/// update keeps the existing hash (empty string reaches the repository).
pub fn user_from_input(id: Option<i64>, input: &UserInput) -> Result<User> {
    input.validate()?;
    let password = input.password.as_deref().filter(|p| !p.is_empty());
    if id.is_none() && password.is_none() {
        return Err(AppError::validation("A password is required for new users"));
    }

    Ok(User {
        id,
        username: input.username.trim().to_string(),
        password_hash: password.map(hash_password).unwrap_or_default(),
        active: input.active,
        role: input.role,
        created_at: None,
    })
}

/// Check credentials. Unknown users, wrong passwords and inactive accounts all
/// come back as `Unauthorized`.
pub async fn authenticate(db: &Database, username: &str, password: &str) -> Result<UserView> {
    let user = db
        .find_user_by_username(username.trim())
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !user.active || !verify_password(password, &user.password_hash) {
        warn!("Rejected login for {}", username);
        return Err(AppError::Unauthorized);
    }

    let id = user.id.ok_or_else(|| AppError::Internal("stored user without id".into()))?;
    Ok(UserView {
        id,
        username: user.username,
        role: user.role,
    })
}

/// Create the first admin from `ADMIN_USERNAME`/`ADMIN_PASSWORD` when the
/// users table is empty.
pub async fn bootstrap_admin(db: &Database, config: &Config) -> Result<Option<User>> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(None);
    };
    if db.user_count().await? > 0 {
        debug!("Users exist, skipping admin bootstrap");
        return Ok(None);
    }

    let input = UserInput {
        username: username.clone(),
        password: Some(password.clone()),
        active: true,
        role: Role::Admin,
    };
    let user = Repository::<User>::insert(db, &user_from_input(None, &input)?).await?;
    info!("👤 Created initial admin user '{}'", user.username);
    Ok(Some(user))
}

#[derive(Debug, Clone)]
struct Session {
    user: UserView,
    last_seen: DateTime<Utc>,
}

/// Live sessions keyed by token. A session expires once it has been idle for
/// longer than the configured period; every successful lookup resets the clock.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    idle: TimeDelta,
}

impl SessionStore {
    pub fn new(idle_minutes: i64) -> Result<Self> {
        let idle = TimeDelta::try_minutes(idle_minutes)
            .filter(|idle| *idle > TimeDelta::zero())
            .ok_or_else(|| {
                AppError::Config(format!("Session idle time of {idle_minutes} minutes is out of range"))
            })?;

        Ok(Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle,
        })
    }

    pub async fn create(&self, user: UserView) -> String {
        self.create_at(user, Utc::now()).await
    }

    pub async fn create_at(&self, user: UserView, now: DateTime<Utc>) -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        self.sessions.write().await.insert(
            token.clone(),
            Session {
                user,
                last_seen: now,
            },
        );
        token
    }

    /// Resolve and refresh a session.
    pub async fn touch(&self, token: &str) -> Option<UserView> {
        self.touch_at(token, Utc::now()).await
    }

    pub async fn touch_at(&self, token: &str, now: DateTime<Utc>) -> Option<UserView> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(token)?;

        if now - session.last_seen > self.idle {
            sessions.remove(token);
            debug!("Session expired after inactivity");
            return None;
        }

        session.last_seen = now;
        Some(session.user.clone())
    }

    pub async fn remove(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    /// Drop every idle session; returns how many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| now - session.last_seen <= self.idle);
        before - sessions.len()
    }
}

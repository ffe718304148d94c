//! Accounts, sessions and role checks for the portal dashboards.
//!
//! Passwords are stored as SHA-256 digests of a per-account random salt
//! followed by the password, and checked without an early exit. A successful login yields an opaque UUID
//! session token that expires after a fixed time-to-live.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PortalError;
use crate::model::{normalize_email, Dashboard, Role};

pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const MIN_PASSWORD_CHARS: usize = 8;

struct Account {
    id: Uuid,
    email: String,
    role: Role,
    salt: String,
    password_hash: [u8; 32],
}

struct Session {
    account_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// What a valid session token proves about its holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Claims {
    pub account_id: Uuid,
    pub email: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl Claims {
    pub fn can_view(&self, dashboard: Dashboard) -> bool {
        self.role.can_view(dashboard)
    }
}

/// An issued session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionToken {
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService {
    accounts: RwLock<HashMap<String, Account>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
    ttl: Duration,
}

impl Default for AuthService {
    fn default() -> Self {
        Self::new()
    }
}

fn hash_password(salt: &str, password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

/// Digest comparison that touches every byte whatever the first mismatch.
fn digests_match(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

fn new_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

impl AuthService {
    pub fn new() -> Self {
        Self::with_ttl(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Create an account. Emails are case-insensitive and unique.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<Uuid, PortalError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(PortalError::invalid(
                "password",
                format!("must be at least {MIN_PASSWORD_CHARS} characters"),
            ));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(&email) {
            return Err(PortalError::Conflict(format!(
                "an account for {email} already exists"
            )));
        }
        let salt = new_salt();
        let account = Account {
            id: Uuid::new_v4(),
            password_hash: hash_password(&salt, password),
            salt,
            email: email.clone(),
            role,
        };
        let id = account.id;
        accounts.insert(email, account);
        tracing::info!(%id, %role, "registered account");
        Ok(id)
    }

    /// Check credentials and open a session.
    ///
    /// Unknown emails and wrong passwords fail the same way.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionToken, PortalError> {
        let email = normalize_email(email).map_err(|_| PortalError::Unauthorized)?;
        let account_id = {
            let accounts = self.accounts.read().await;
            let account = accounts.get(&email).ok_or(PortalError::Unauthorized)?;
            if !digests_match(&hash_password(&account.salt, password), &account.password_hash) {
                tracing::warn!("failed login attempt");
                return Err(PortalError::Unauthorized);
            }
            account.id
        };

        let session = SessionToken {
            token: Uuid::new_v4(),
            expires_at: Utc::now() + self.ttl,
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.expires_at > Utc::now());
        sessions.insert(
            session.token,
            Session {
                account_id,
                expires_at: session.expires_at,
            },
        );
        Ok(session)
    }

    /// Resolve a token to its claims. Expired sessions are dropped.
    pub async fn authenticate(&self, token: Uuid) -> Result<Claims, PortalError> {
        let (account_id, expires_at) = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(&token).ok_or(PortalError::SessionExpired)?;
            (session.account_id, session.expires_at)
        };
        if expires_at <= Utc::now() {
            self.sessions.write().await.remove(&token);
            return Err(PortalError::SessionExpired);
        }

        let accounts = self.accounts.read().await;
        let account = accounts
            .values()
            .find(|a| a.id == account_id)
            .ok_or(PortalError::SessionExpired)?;
        Ok(Claims {
            account_id,
            email: account.email.clone(),
            role: account.role,
            expires_at,
        })
    }

    /// Revoke a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: Uuid) {
        self.sessions.write().await.remove(&token);
    }

    /// Authenticate and check that the holder may view `dashboard`.
    pub async fn require_role(
        &self,
        token: Uuid,
        dashboard: Dashboard,
    ) -> Result<Claims, PortalError> {
        let claims = self.authenticate(token).await?;
        if !claims.can_view(dashboard) {
            return Err(PortalError::Forbidden {
                role: claims.role.to_string(),
                area: dashboard.to_string(),
            });
        }
        Ok(claims)
    }
}

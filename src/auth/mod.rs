//! Credentials and bearer tokens.
//!
//! Passwords are stored as Argon2id PHC strings. Access tokens are opaque
//! random UUIDs mapped to a username and an expiry; they live only in memory.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, ParamsBuilder, Version};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use dashmap::DashMap;
use uuid::Uuid;

use crate::config::schema::AuthConfig;
use crate::http::error::ApiError;
use crate::http::server::AppState;

pub(crate) const INVALID_CREDENTIALS: &str = "Could not validate credentials";
const NOT_ADMIN: &str = "The user doesn't have enough privileges";

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct AuthService {
    sessions: DashMap<String, Session>,
    token_ttl: Duration,
    memory_kib: u32,
    time_cost: u32,
    admins: HashSet<String>,
    /// Verified in place of a stored hash when the username is unknown.
    decoy_hash: OnceLock<Option<String>>,
}

impl AuthService {
    pub fn from_config(config: &AuthConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            token_ttl: Duration::from_secs(config.token_ttl_secs),
            memory_kib: config.password_memory_kib,
            time_cost: config.password_time_cost,
            admins: config.admin_usernames.iter().cloned().collect(),
            decoy_hash: OnceLock::new(),
        }
    }

    fn hasher(&self) -> Result<Argon2<'static>, ApiError> {
        let params = ParamsBuilder::new()
            .m_cost(self.memory_kib)
            .t_cost(self.time_cost)
            .p_cost(1)
            .build()
            .map_err(ApiError::internal)?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash with a fresh random salt. CPU-bound; call from a blocking task.
    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes()).map_err(ApiError::internal)?;
        let hash = self
            .hasher()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(ApiError::internal)?;
        Ok(hash.to_string())
    }

    /// Cost parameters are read from the stored hash, not from config.
    pub fn verify_password(&self, password: &str, stored: &str) -> bool {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(error = %e, "Stored password hash is unreadable");
                false
            }
        }
    }

    /// Verify `password` against `stored`, or against the decoy hash when
    /// there is no stored hash. Always false in the second case.
    pub fn verify_or_decoy(&self, password: &str, stored: Option<&str>) -> bool {
        match stored {
            Some(stored) => self.verify_password(password, stored),
            None => {
                let decoy = self
                    .decoy_hash
                    .get_or_init(|| self.hash_password(&Uuid::new_v4().to_string()).ok());
                if let Some(decoy) = decoy {
                    let _ = self.verify_password(password, decoy);
                }
                false
            }
        }
    }

    /// Whether `username` is listed in `auth.admin_usernames`.
    pub fn is_configured_admin(&self, username: &str) -> bool {
        self.admins.contains(username)
    }

    /// Issue a token, dropping every session that has already expired.
    pub fn issue_token(&self, username: &str) -> String {
        let now = Instant::now();
        self.sessions.retain(|_, s| s.expires_at > now);

        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at: now + self.token_ttl,
            },
        );
        token
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Username behind a live token. Expired tokens are dropped on lookup.
    pub fn authenticate(&self, token: &str) -> Option<String> {
        let session = self.sessions.get(token)?.clone();
        if session.expires_at <= Instant::now() {
            self.sessions.remove(token);
            return None;
        }
        Some(session.username)
    }
}

/// The authenticated caller, extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub username: String,
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".into()))?;

        let username = state
            .auth
            .authenticate(token.trim())
            .ok_or_else(|| ApiError::Unauthenticated(INVALID_CREDENTIALS.into()))?;

        Ok(CurrentUser { username })
    }
}

/// An authenticated caller whose account carries the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub username: String,
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let CurrentUser { username } = CurrentUser::from_request_parts(parts, state).await?;
        match state.store.find_user(&username) {
            Some(user) if user.is_admin => Ok(AdminUser { username }),
            _ => Err(ApiError::Forbidden(NOT_ADMIN.into())),
        }
    }
}

/// Run a password hash off the async executor.
pub async fn hash_blocking(auth: Arc<AuthService>, password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || auth.hash_password(&password))
        .await
        .map_err(ApiError::internal)?
}

/// Run a password check off the async executor. With no stored hash the
/// decoy is verified instead and the result is always false.
pub async fn verify_blocking(
    auth: Arc<AuthService>,
    password: String,
    stored: Option<String>,
) -> bool {
    tokio::task::spawn_blocking(move || auth.verify_or_decoy(&password, stored.as_deref()))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(ttl_secs: u64) -> AuthService {
        AuthService::from_config(&AuthConfig {
            token_ttl_secs: ttl_secs,
            password_memory_kib: 64,
            password_time_cost: 1,
            admin_usernames: vec!["root".into()],
            ..AuthConfig::default()
        })
    }

    #[test]
    fn hash_round_trip() {
        let auth = service(60);
        let hash = auth.hash_password("password123").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(auth.verify_password("password123", &hash));
        assert!(!auth.verify_password("password124", &hash));
        assert!(!auth.verify_password("password123", "not-a-hash"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let auth = service(60);
        assert_ne!(auth.hash_password("pw").unwrap(), auth.hash_password("pw").unwrap());
    }

    #[test]
    fn tokens_resolve_until_expiry() {
        let auth = service(60);
        let token = auth.issue_token("ada");
        assert_eq!(auth.authenticate(&token).as_deref(), Some("ada"));
        assert!(auth.authenticate("bogus").is_none());

        let expired = service(0);
        let token = expired.issue_token("ada");
        assert!(expired.authenticate(&token).is_none());
        assert!(expired.sessions.is_empty());
    }

    #[test]
    fn expired_sessions_are_pruned_on_issue() {
        let auth = service(0);
        for _ in 0..1000 {
            auth.issue_token("ada");
        }
        assert_eq!(auth.session_count(), 1);

        let live = service(60);
        live.issue_token("ada");
        live.issue_token("bob");
        assert_eq!(live.session_count(), 2);
    }

    #[test]
    fn unknown_user_still_pays_for_a_verification() {
        let auth = service(60);
        assert!(!auth.verify_or_decoy("password123", None));
        let decoy = auth.decoy_hash.get().cloned().flatten().unwrap();
        assert!(decoy.starts_with("$argon2id$"));

        let hash = auth.hash_password("password123").unwrap();
        assert!(auth.verify_or_decoy("password123", Some(&hash)));
    }

    #[test]
    fn admin_list_comes_from_config() {
        let auth = service(60);
        assert!(auth.is_configured_admin("root"));
        assert!(!auth.is_configured_admin("ada"));
    }
}

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use handyhub_core::{AppConfig, Environment};
use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

const API_KEYS_VAR: &str = "HANDYHUB_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request id, available to handlers as an extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

type KeyHash = [u8; 32];

/// Bearer keys accepted by the protected API.
///
/// Only salted SHA-256 hashes of the configured keys are kept in memory.
#[derive(Clone)]
pub struct AuthState {
    key_hashes: Arc<Vec<KeyHash>>,
    salt: Arc<str>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("keys", &self.key_hashes.len())
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl AuthState {
    /// Builds auth config from `HANDYHUB_API_KEYS` (comma-separated bearer
    /// tokens) and the configured hash salt.
    pub fn from_env(config: &AppConfig) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(
            &raw,
            config.api_key_hash_salt.as_deref(),
            config.env == Environment::Development,
        )
    }

    /// With no keys configured, development runs open and every other
    /// environment refuses to start. Keys without a salt are refused outside
    /// development as well.
    pub fn from_keys(raw: &str, salt: Option<&str>, is_development: bool) -> anyhow::Result<Self> {
        let keys: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();

        if keys.is_empty() {
            if is_development {
                tracing::warn!(
                    "{API_KEYS_VAR} not set; bearer auth disabled in development environment"
                );
                return Ok(Self {
                    key_hashes: Arc::new(Vec::new()),
                    salt: Arc::from(""),
                    enabled: false,
                });
            }

            anyhow::bail!(
                "{API_KEYS_VAR} is required outside development; provide comma-separated bearer tokens"
            );
        }

        let salt = match salt {
            Some(salt) if !salt.is_empty() => salt,
            _ if is_development => "",
            _ => anyhow::bail!("HANDYHUB_API_KEY_HASH_SALT is required when API keys are configured"),
        };

        Ok(Self {
            key_hashes: Arc::new(keys.iter().map(|k| hash_key(salt, k)).collect()),
            salt: Arc::from(salt),
            enabled: true,
        })
    }

    fn allows(&self, token: &str) -> bool {
        let candidate = hash_key(&self.salt, token);
        let matched = self
            .key_hashes
            .iter()
            .fold(subtle::Choice::from(0), |acc, known| {
                acc | known[..].ct_eq(&candidate[..])
            });
        matched.into()
    }
}

fn hash_key(salt: &str, key: &str) -> KeyHash {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

/// Requests counted in the current window.
#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

impl RateLimitWindow {
    /// Count one request at `now`, opening a new window once `length` has
    /// passed. Returns `false` when the request is over the limit.
    fn admit(&mut self, now: Instant, length: Duration, max_requests: usize) -> bool {
        if now.saturating_duration_since(self.started_at) >= length {
            self.started_at = now;
            self.count = 0;
        }
        if self.count >= max_requests {
            return false;
        }
        self.count += 1;
        true
    }
}

/// Fixed-window limiter shared by all protected routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    state: Arc<Mutex<RateLimitWindow>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        let current = RateLimitWindow {
            started_at: Instant::now(),
            count: 0,
        };
        Self {
            max_requests,
            window,
            state: Arc::new(Mutex::new(current)),
        }
    }
}

#[derive(Debug, Serialize)]
struct RejectionBody {
    error: Rejection,
}

#[derive(Debug, Serialize)]
struct Rejection {
    code: &'static str,
    message: &'static str,
}

fn reject(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    let body = RejectionBody {
        error: Rejection { code, message },
    };
    (status, Json(body)).into_response()
}

/// Tags every request with an id, reusing the caller's `x-request-id` when
/// it sent one, and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let incoming = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());
    let id = incoming.map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    match HeaderValue::from_str(&id) {
        Ok(value) => {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        Err(_) => tracing::debug!(request_id = %id, "request id is not a valid header value"),
    }
    response
}

/// Rejects protected requests without a known bearer key.
pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    if !auth.enabled {
        return next.run(req).await;
    }

    let authorized = extract_bearer_token(req.headers().get(AUTHORIZATION))
        .is_some_and(|token| auth.allows(token));
    if authorized {
        next.run(req).await
    } else {
        reject(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        )
    }
}

pub async fn enforce_rate_limit(
    State(limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let admitted = limit
        .state
        .lock()
        .await
        .admit(Instant::now(), limit.window, limit.max_requests);

    if !admitted {
        tracing::warn!(
            max_requests = limit.max_requests,
            window_secs = limit.window.as_secs(),
            "rate limit exceeded"
        );
        return reject(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests; slow down and retry shortly",
        );
    }
    next.run(req).await
}

fn extract_bearer_token(header: Option<&HeaderValue>) -> Option<&str> {
    let (scheme, token) = header?.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        for raw in ["Bearer test-token", "bearer test-token", "BEARER  test-token "] {
            let header = HeaderValue::from_static(raw);
            assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"), "{raw}");
        }
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_ignored() {
        for raw in ["Basic abc123", "Bearer ", "Bearer"] {
            let header = HeaderValue::from_static(raw);
            assert_eq!(extract_bearer_token(Some(&header)), None, "{raw}");
        }
        assert_eq!(extract_bearer_token(None), None);
    }

    #[test]
    fn rate_window_resets_after_its_length() {
        let start = Instant::now();
        let length = Duration::from_secs(60);
        let mut window = RateLimitWindow {
            started_at: start,
            count: 0,
        };

        assert!(window.admit(start, length, 2));
        assert!(window.admit(start + Duration::from_secs(1), length, 2));
        assert!(!window.admit(start + Duration::from_secs(59), length, 2));
        assert!(window.admit(start + length, length, 2));
        assert_eq!(window.count, 1);
    }

    #[test]
    fn auth_disabled_when_no_keys_in_dev() {
        let state = AuthState::from_keys("", None, true).expect("dev allows missing keys");
        assert!(!state.enabled);
    }

    #[test]
    fn auth_requires_keys_outside_dev() {
        assert!(AuthState::from_keys(" , ", Some("salt"), false).is_err());
    }

    #[test]
    fn auth_requires_salt_outside_dev() {
        assert!(AuthState::from_keys("key-1", None, false).is_err());
    }

    #[test]
    fn auth_matches_configured_keys_only() {
        let state = AuthState::from_keys("key-1, key-2", Some("pepper"), false).expect("auth");
        assert!(state.enabled);
        assert!(state.allows("key-1"));
        assert!(state.allows("key-2"));
        assert!(!state.allows("key-3"));
        assert!(!state.allows(""));
    }

    #[test]
    fn hash_depends_on_salt() {
        assert_ne!(hash_key("a", "key"), hash_key("b", "key"));
        assert_eq!(hash_key("a", "key"), hash_key("a", "key"));
    }

    #[test]
    fn debug_hides_hashes() {
        let state = AuthState::from_keys("key-1", Some("pepper"), false).expect("auth");
        let debug = format!("{state:?}");
        assert!(debug.contains("keys: 1"));
        assert!(!debug.contains("pepper"));
    }
}

//! Shared-password gate.
//!
//! The session cookie carries the BLAKE3 digest of the password rather than
//! the password itself. Comparisons go through `blake3::Hash`, whose
//! equality is constant-time.
use crate::AppState;
use crate::routes::error_response;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

pub const SITE_AUTH_COOKIE: &str = "site-auth";

/// Paths reachable without a session cookie.
const OPEN_PATHS: &[&str] = &["/api/auth", "/health"];

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 30;

#[derive(Debug, Clone)]
pub struct SiteGate {
    marker: blake3::Hash,
    secure_cookie: bool,
}

impl SiteGate {
    pub fn new(password: &str, secure_cookie: bool) -> Self {
        Self {
            marker: blake3::hash(password.as_bytes()),
            secure_cookie,
        }
    }

    /// Build a gate only when a password is actually configured.
    pub fn from_config(password: Option<&str>, secure_cookie: bool) -> Option<Self> {
        password
            .filter(|p| !p.is_empty())
            .map(|p| Self::new(p, secure_cookie))
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        blake3::hash(candidate.as_bytes()) == self.marker
    }

    /// `Set-Cookie` value issued after a successful login.
    pub fn session_cookie(&self) -> String {
        let mut cookie = format!(
            "{SITE_AUTH_COOKIE}={}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax",
            self.marker.to_hex()
        );
        if self.secure_cookie {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// Whether the request carries a valid session cookie.
    pub fn admits(&self, headers: &HeaderMap) -> bool {
        cookie_values(headers, SITE_AUTH_COOKIE)
            .filter_map(|raw| blake3::Hash::from_hex(raw).ok())
            .any(|presented| presented == self.marker)
    }
}

fn cookie_values<'a>(headers: &'a HeaderMap, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(move |pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

pub async fn require_site_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(gate) = state.gate.as_deref() else {
        return next.run(request).await;
    };
    if OPEN_PATHS.contains(&request.uri().path()) || gate.admits(request.headers()) {
        return next.run(request).await;
    }
    tracing::debug!(
        target: "server.gate",
        method = %request.method(),
        path = %request.uri().path(),
        "gate.rejected"
    );
    error_response(StatusCode::UNAUTHORIZED, "unauthorized")
}

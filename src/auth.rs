use std::convert::Infallible;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pbkdf2::{
    Pbkdf2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::{Deserialize, Serialize};

use crate::{config::AppConfig, models::User, repository::RepositoryState};

// --- Password Hasher ---

/// hash_password
///
/// Derives a salted PBKDF2-SHA256 hash of the plaintext and emits it as a
/// self-describing PHC string (algorithm, parameters, and salt embedded).
/// A fresh random salt is generated on every call, so repeated hashes of the
/// same plaintext differ while all remain independently verifiable.
pub fn hash_password(plaintext: &str) -> Result<String, pbkdf2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Pbkdf2.hash_password(plaintext.as_bytes(), &salt)?.to_string())
}

/// verify_password
///
/// Recomputes the derivation using the salt and parameters embedded in the stored
/// PHC string and compares in constant time. Any malformed or mismatched hash
/// yields `false`; this function never panics and has no side effects.
pub fn verify_password(plaintext: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Pbkdf2.verify_password(plaintext.as_bytes(), &parsed).is_ok()
}

// --- Session Token ---

/// Name of the cookie carrying the signed session token.
pub const SESSION_COOKIE: &str = "session";
/// Name of the single-use cookie carrying a flash message across a redirect.
pub const FLASH_COOKIE: &str = "flash";

// Sessions outlive a browsing session but not a forgotten device.
const SESSION_TTL_SECS: i64 = 60 * 60 * 24 * 7;

/// Claims
///
/// The payload structure signed into the session token. The token is opaque to the
/// client; the server trusts it only after signature and expiry validation.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the id of the authenticated user. Re-resolved against the
    /// users table on every request.
    pub sub: i64,
    /// Expiration Time (exp): timestamp after which the token must not be accepted.
    pub exp: usize,
    /// Issued At (iat): timestamp when the token was issued.
    pub iat: usize,
}

/// mint_session_token
///
/// Signs a session token for the given user id with the configured secret.
pub fn mint_session_token(
    secret: &str,
    user_id: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        iat: now as usize,
        exp: (now + SESSION_TTL_SECS) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// session_cookie
///
/// Builds the HttpOnly cookie that establishes the session identity for a client.
/// Adding this cookie to the response jar is the `login` operation.
pub fn session_cookie(
    secret: &str,
    user_id: i64,
) -> Result<Cookie<'static>, jsonwebtoken::errors::Error> {
    let token = mint_session_token(secret, user_id)?;
    Ok(Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build())
}

/// clear_session
///
/// The `logout` operation: removes the session cookie from the client.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
}

// --- Flash Messages ---

/// flash_cookie
///
/// Builds the single-use cookie that carries a user-visible message across a
/// redirect (constraint violations, authentication failures, login prompts).
pub fn flash_cookie(message: &str) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, message.to_string()))
        .path("/")
        .build()
}

/// take_flash
///
/// Consumes the pending flash message, if any: returns the jar with the cookie
/// removed alongside the message for the current render.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build((FLASH_COOKIE, "")).path("/").build());
    (jar, message)
}

// --- Identity Extractor ---

/// Identity
///
/// The resolved identity of a request: either an anonymous visitor or an
/// authenticated `User`. Handlers distinguish the two by pattern matching; the
/// "not logged in" state is an expected value, never an intercepted failure.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(User),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    /// The authenticated user, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }
}

/// Identity Extractor Implementation
///
/// Implements Axum's FromRequestParts trait, making `Identity` usable as a function
/// argument in any handler. Resolution is infallible by design:
/// 1. Cookie Extraction: read the session cookie from the request headers.
/// 2. Token Validation: verify the signature and expiry of the embedded token.
/// 3. DB Lookup: re-resolve the user by stored id through the repository. This
///    prevents access if the account vanished after the token was issued.
///
/// Any failure along the way (missing cookie, tampered or expired token, unknown
/// user id) resolves to `Identity::Anonymous` rather than an error response.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    // Allows the extractor to pull the Repository State from the app state.
    RepositoryState: FromRef<S>,
    // Allows the extractor to pull the AppConfig (for the signing secret).
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        // 1. Cookie Extraction
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Identity::Anonymous);
        };

        // 2. Token Validation
        let decoding_key = DecodingKey::from_secret(config.secret_key.as_bytes());
        let mut validation = Validation::default();
        // Ensure expiration time validation is always active.
        validation.validate_exp = true;

        let token_data = match decode::<Claims>(cookie.value(), &decoding_key, &validation) {
            Ok(data) => data,
            // Expired, tampered, or malformed tokens all degrade to anonymous.
            Err(_) => return Ok(Identity::Anonymous),
        };

        // 3. Database Lookup (Final Verification)
        match repo.find_user_by_id(token_data.claims.sub).await {
            Some(user) => Ok(Identity::Authenticated(user)),
            None => Ok(Identity::Anonymous),
        }
    }
}

// --- Authorization Gate ---

/// AdminUser
///
/// Extractor gating the administrator-only routes. Wraps the resolved `Identity`
/// and permits execution only for an authenticated user holding the admin role.
///
/// Rejections:
/// - Anonymous visitors are redirected to the login page with a flash prompt,
///   not handed a bare error.
/// - Authenticated non-admins receive 403 Forbidden.
///
/// Because extractors run before the handler body, no side-effecting logic in a
/// gated handler can execute for an unauthorized request.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = match Identity::from_request_parts(parts, state).await {
            Ok(identity) => identity,
            Err(never) => match never {},
        };

        match identity {
            Identity::Anonymous => Err((
                CookieJar::new().add(flash_cookie("You need to log in first.")),
                Redirect::to("/login"),
            )
                .into_response()),
            Identity::Authenticated(user) if user.is_admin() => Ok(AdminUser(user)),
            Identity::Authenticated(_) => Err(StatusCode::FORBIDDEN.into_response()),
        }
    }
}

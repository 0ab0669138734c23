#![cfg(feature = "web")]

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::AppError;
use crate::flash::{set_flash, take_flash};

/// Name of the cookie carrying the admin session id
pub const SESSION_COOKIE: &str = "session";
const SESSION_DURATION: u64 = 24 * 60 * 60; // 24 hours in seconds

/// The single administrator account
///
/// Only an Argon2 hash of the password is kept once the server is running.
pub struct AdminCredentials {
    username: String,
    password_hash: String,
}

impl AdminCredentials {
    /// Hash the configured admin password
    ///
    /// # Arguments
    /// * `username` - Admin login name
    /// * `password` - Plain text password (only its hash is kept)
    ///
    /// # Returns
    /// * `Result<Self, String>` - The credentials, or an error message
    ///
    /// # Errors
    /// * Returns an error if either field is empty or hashing fails
    pub fn new(username: &str, password: &str) -> Result<Self, String> {
        if username.is_empty() || password.is_empty() {
            return Err("Admin username and password cannot be empty".to_string());
        }
        Ok(AdminCredentials {
            username: username.to_string(),
            password_hash: hash_password(password)?,
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a submitted username/password pair
    pub fn verify(&self, username: &str, password: &str) -> bool {
        username == self.username && verify_password(password, &self.password_hash).unwrap_or(false)
    }
}

/// Login form data
#[derive(Debug, Deserialize)]
pub struct AdminLogin {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Authenticated admin session
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: String,
    pub expires_at: SystemTime,
}

lazy_static! {
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
}

/// Hash a password using Argon2
fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err("Password hashing failed".to_string()),
    }
}

/// Verify a password against a stored Argon2 hash
fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(hash) => hash,
        Err(_) => return Err("Invalid password hash format".to_string()),
    };

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(_) => Ok(true),
        Err(_) => Ok(false), // Password didn't match
    }
}

/// Create a new session
///
/// Expired sessions are dropped at the same time.
///
/// # Arguments
/// * `username` - Admin the session belongs to
///
/// # Returns
/// * `String` - The new session id
pub fn create_session(username: &str) -> String {
    let session_id = Uuid::new_v4().to_string();
    let expires_at = SystemTime::now() + Duration::from_secs(SESSION_DURATION);

    let session = Session {
        user_id: username.to_string(),
        expires_at,
    };

    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    // Drop expired sessions while we hold the lock anyway
    let now = SystemTime::now();
    sessions.retain(|_, s| s.expires_at > now);
    sessions.insert(session_id.clone(), session);

    session_id
}

/// Validate a session
///
/// # Arguments
/// * `session_id` - Session id from the cookie
///
/// # Returns
/// * `Option<String>` - Username of a live session, None when unknown or expired
pub fn validate_session(session_id: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap_or_else(|e| e.into_inner());

    sessions
        .get(session_id)
        .filter(|session| session.expires_at > SystemTime::now())
        .map(|session| session.user_id.clone())
}

pub fn end_session(session_id: &str) {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.remove(session_id);
}

/// Admin logged in on this request, if any
pub fn current_admin(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| validate_session(cookie.value()))
}

fn session_cookie(value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie
}

/// Serve the admin login form
pub async fn serve_login_page(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), AppError> {
    let (jar, flash) = take_flash(jar);
    let body = state
        .templates
        .render("admin_login", &json!({ "flash": flash }))?;
    Ok((jar, Html(body)))
}

/// Handle admin login
///
/// Valid credentials open a session and go to the panel; anything else goes
/// back to the login form with a message.
///
/// # Arguments
/// * `state` - Application state holding the admin credentials
/// * `jar` - Cookie jar for the session and flash cookies
/// * `credentials` - Submitted login form
///
/// # Returns
/// * `Response` - Redirect to `/admin-panel` or back to `/admin`
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<AdminLogin>,
) -> Response {
    if state
        .admin
        .verify(&credentials.username, &credentials.password)
    {
        let session_id = create_session(&credentials.username);
        info!("admin {} logged in", credentials.username);
        (jar.add(session_cookie(session_id)), Redirect::to("/admin-panel")).into_response()
    } else {
        warn!("failed admin login for {:?}", credentials.username);
        (
            set_flash(jar, "Invalid Username or Password"),
            Redirect::to("/admin"),
        )
            .into_response()
    }
}

/// Handle admin logout
///
/// Ends the server-side session and clears the cookie.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        end_session(cookie.value());
    }

    (jar.remove(session_cookie(String::new())), Redirect::to("/admin"))
}

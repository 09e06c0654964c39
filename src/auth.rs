use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;
use regex::Regex;
use std::sync::OnceLock;
use crate::models::models::{TokenData, User};
use crate::core::db;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, now_iso, store, verify_password};
use crate::config::*;
use crate::users::{user_json, validated_bio, validated_name};

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").expect("Regex should compile")
    })
}

/// Mints a bearer token for `user_id` and records it in the token registry
/// so a password change can revoke it later.
pub fn issue_token(store: &Store, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

/// Deletes every outstanding token belonging to `user_id`.
pub fn revoke_user_tokens(store: &Store, user_id: &str) -> anyhow::Result<()> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut kept = Vec::new();
    for token in tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => {
                store.delete(&key)?;
            }
            _ => kept.push(token),
        }
    }
    store.set_json(TOKENS_LIST_KEY, &kept)?;
    Ok(())
}

pub fn register(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let name = match validated_name(body["name"].as_str().unwrap_or("")) {
        Ok(name) => name,
        Err(err) => return Ok(err.into()),
    };
    let bio = match validated_bio(body["bio"].as_str().unwrap_or("")) {
        Ok(bio) => bio,
        Err(err) => return Ok(err.into()),
    };
    let email = body["email"].as_str().unwrap_or("").trim().to_lowercase();
    let password = body["password"].as_str().unwrap_or("");

    if !email_regex().is_match(&email) {
        return Ok(ApiError::BadRequest("Please enter a valid email".to_string()).into());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Ok(
            ApiError::BadRequest("Password must be at least 6 characters".to_string()).into(),
        );
    }

    // Email uniqueness is case-insensitive; the stored email is lowercased.
    if db::find_user_by_email(&store, &email)?.is_some() {
        return Ok(ApiError::Conflict("Email already registered".to_string()).into());
    }

    let user = User {
        id: Uuid::new_v4().to_string(),
        name,
        email,
        password: hash_password(password)?,
        bio,
        avatar: DEFAULT_AVATAR.to_string(),
        followers: Vec::new(),
        following: Vec::new(),
        is_active: true,
        created_at: now_iso(),
        last_login: now_iso(),
    };
    db::register_user(&store, &user)?;

    let token = issue_token(&store, &user.id)?;
    let resp = serde_json::json!({
        "token": token,
        "user": user_json(&user),
    });
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn login(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let creds: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let email = creds["email"].as_str().unwrap_or_default();
    let password = creds["password"].as_str().unwrap_or_default();

    // Disabled accounts fail the lookup and land on the same 401 as a bad
    // password.
    let Some(mut user) = db::find_user_by_email(&store, email)? else {
        return Ok(ApiError::Unauthorized.into());
    };
    if !verify_password(password, &user.password) {
        return Ok(ApiError::Unauthorized.into());
    }

    user.last_login = now_iso();
    db::save_user(&store, &user)?;

    let token = issue_token(&store, &user.id)?;
    let resp = serde_json::json!({
        "token": token,
        "user": user_json(&user),
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn logout(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let auth_header = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    if !auth_header.starts_with("Bearer ") {
        return Ok(ApiError::Unauthorized.into());
    }

    let token = auth_header.strip_prefix("Bearer ").unwrap();
    store.delete(&token_key(token))?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.retain(|t| t != token);
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    let resp = serde_json::json!({ "message": "Logged out successfully" });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

pub fn me(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    match db::load_active_user(&store, &user_id)? {
        Some(user) => {
            let resp = serde_json::json!({ "user": user_json(&user) });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        None => Ok(ApiError::Unauthorized.into()),
    }
}

/// Resolves the bearer token to an acting user id. Expired tokens and
/// tokens whose user has since been disabled both fail.
pub fn validate_token(req: &Request) -> Option<String> {
    let store = store();
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let now = chrono::Utc::now();
        let age_hours = (now - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > token_expiration_hours() {
            return None;
        }
    }

    match db::load_active_user(&store, &data.user_id) {
        Ok(Some(_)) => Some(data.user_id),
        _ => None,
    }
}

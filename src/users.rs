use spin_sdk::http::{Request, Response};
use crate::models::models::User;
use crate::core::db;
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, sanitize_text, store, validate_uuid, verify_password};
use crate::core::query_params::{get_string, page_params, paginate, parse_query_params};
use crate::auth::{issue_token, revoke_user_tokens, validate_token};
use crate::posts::{author_index, post_json};
use crate::config::*;

/// Public user projection: canonical `id`, no password hash, counts
/// derived from the stored edge arrays.
pub fn user_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "bio": user.bio,
        "avatar": user.avatar,
        "followers": user.followers,
        "following": user.following,
        "followerCount": user.followers.len(),
        "followingCount": user.following.len(),
        "createdAt": user.created_at,
    })
}

/// Sanitizes a display name and enforces the 1-50 character bound on the
/// sanitized text (entity escaping can grow the input, and multibyte
/// characters count once, not per byte).
pub(crate) fn validated_name(raw: &str) -> Result<String, ApiError> {
    let name = sanitize_text(raw);
    if name.is_empty() || name.chars().count() > MAX_NAME_LENGTH {
        return Err(ApiError::BadRequest("Name must be 1-50 characters".to_string()));
    }
    Ok(name)
}

/// Sanitizes a bio and enforces the 500-character bound on the sanitized
/// text.
pub(crate) fn validated_bio(raw: &str) -> Result<String, ApiError> {
    let bio = sanitize_text(raw);
    if bio.chars().count() > MAX_BIO_LENGTH {
        return Err(
            ApiError::BadRequest("Bio cannot be more than 500 characters".to_string()),
        );
    }
    Ok(bio)
}

/// Case-insensitive substring match against name, email, and bio.
pub fn matches_search(user: &User, query: &str) -> bool {
    let q = query.to_lowercase();
    user.name.to_lowercase().contains(&q)
        || user.email.to_lowercase().contains(&q)
        || user.bio.to_lowercase().contains(&q)
}

// === HTTP handlers ===

/// GET /users?search&limit&page — discovery listing. Without `search` this
/// returns the general listing; the client-side search path treats an
/// empty query differently (see `mirror::Mirror::search_users`).
pub fn discover(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let params = parse_query_params(req.uri());
    let (limit, page) = page_params(&params);
    let search = get_string(&params, "search");

    let store = store();
    let mut users: Vec<User> = db::all_active_users(&store)?
        .into_iter()
        .filter(|u| u.id != user_id)
        .filter(|u| search.as_deref().map_or(true, |q| matches_search(u, q)))
        .collect();

    // Newest-created first; registration order breaks ties.
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (page_users, pagination) = paginate(users, limit, page);
    let users: Vec<serde_json::Value> = page_users.iter().map(user_json).collect();

    let resp = serde_json::json!({ "users": users, "pagination": pagination });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

/// GET /users/:id
pub fn get_user_details(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path();
    let user_id = path.trim_start_matches("/users/");
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    match db::load_active_user(&store, user_id)? {
        Some(user) => {
            let resp = serde_json::json!({ "user": user_json(&user) });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        None => Ok(ApiError::NotFound("User not found".to_string()).into()),
    }
}

/// PUT /users/profile — name/bio/avatar updates, plus an optional password
/// change that revokes every outstanding token and returns a fresh one.
pub fn update_profile(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let Some(mut user) = db::load_active_user(&store, &user_id)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };

    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let mut password_changed = false;

    if let Some(name) = body["name"].as_str() {
        user.name = match validated_name(name) {
            Ok(name) => name,
            Err(err) => return Ok(err.into()),
        };
    }

    if let Some(bio) = body["bio"].as_str() {
        user.bio = match validated_bio(bio) {
            Ok(bio) => bio,
            Err(err) => return Ok(err.into()),
        };
    }

    if let Some(avatar) = body["avatar"].as_str() {
        user.avatar = avatar.trim().to_string();
    }

    if let Some(new_password) = body["newPassword"].as_str() {
        if new_password.chars().count() < MIN_PASSWORD_LENGTH {
            return Ok(
                ApiError::BadRequest("Password must be at least 6 characters".to_string()).into(),
            );
        }

        let old_password = body["oldPassword"].as_str().unwrap_or_default();
        if !verify_password(old_password, &user.password) {
            return Ok(ApiError::Unauthorized.into());
        }

        user.password = hash_password(new_password)?;
        password_changed = true;
    }

    db::save_user(&store, &user)?;

    let mut resp = serde_json::json!({
        "message": "Profile updated successfully",
        "user": user_json(&user),
    });
    if password_changed {
        revoke_user_tokens(&store, &user_id)?;
        resp["token"] = serde_json::Value::String(issue_token(&store, &user_id)?);
    }

    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

/// GET /users/:id/posts — an author's active posts, newest-first.
pub fn user_posts(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path();
    let author_id = path.trim_start_matches("/users/").trim_end_matches("/posts");
    if author_id.is_empty() || !validate_uuid(author_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    if db::load_active_user(&store, author_id)?.is_none() {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    let params = parse_query_params(req.uri());
    let (limit, page) = page_params(&params);

    let mut posts: Vec<_> = db::all_active_posts(&store)?
        .into_iter()
        .filter(|p| p.author == author_id)
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let (page_posts, pagination) = paginate(posts, limit, page);
    let authors = author_index(&store)?;
    let posts: Vec<serde_json::Value> =
        page_posts.iter().map(|p| post_json(p, &authors)).collect();

    let resp = serde_json::json!({ "posts": posts, "pagination": pagination });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

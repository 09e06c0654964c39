use spin_sdk::http::{Request, Response};
use uuid::Uuid;
use std::collections::HashMap;
use crate::models::models::{Like, Post, User};
use crate::core::db;
use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, sanitize_text, store, validate_uuid};
use crate::core::query_params::{page_params, paginate, parse_query_params};
use crate::auth::validate_token;
use crate::config::*;

/// Flips `user_id`'s like on `post` and returns `(liked, like_count)`.
/// Like entries keep insertion order; a repeat like removes the existing
/// entry instead of appending a duplicate.
pub fn toggle_like(post: &mut Post, user_id: &str, now: String) -> (bool, usize) {
    if let Some(idx) = post.likes.iter().position(|l| l.user == user_id) {
        post.likes.remove(idx);
        (false, post.likes.len())
    } else {
        post.likes.push(Like {
            user: user_id.to_string(),
            created_at: now,
        });
        (true, post.likes.len())
    }
}

/// Sanitizes post content and enforces the 1-1000 character bound on the
/// sanitized text.
pub(crate) fn validated_content(raw: &str) -> Result<String, ApiError> {
    let content = sanitize_text(raw);
    if content.is_empty() || content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest("Post must be 1-1000 characters".to_string()));
    }
    Ok(content)
}

/// Posts to show `viewer`: their own active posts plus those of authors
/// they follow, newest-first. An empty union falls back to the full recent
/// listing so a fresh account never sees a blank feed.
///
/// `posts` must already be in insertion order; the stable sort keeps that
/// order for equal timestamps.
pub fn derive_feed(posts: Vec<Post>, viewer: &User) -> Vec<Post> {
    let mut feed: Vec<Post> = posts
        .iter()
        .filter(|p| p.author == viewer.id || viewer.following.contains(&p.author))
        .cloned()
        .collect();
    if feed.is_empty() {
        feed = posts;
    }
    feed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    feed
}

/// Outward post shape: canonical `id`, the author embedded as a public
/// projection, and derived counts so clients render without a refetch.
pub fn post_json(post: &Post, authors: &HashMap<String, User>) -> serde_json::Value {
    let author = authors.get(&post.author).map(|u| {
        serde_json::json!({
            "id": u.id,
            "name": u.name,
            "email": u.email,
            "avatar": u.avatar,
            "bio": u.bio,
        })
    });
    serde_json::json!({
        "id": post.id,
        "author": author.unwrap_or(serde_json::json!({ "id": post.author })),
        "content": post.content,
        "likes": post.likes,
        "likeCount": post.likes.len(),
        "comments": post.comments,
        "commentCount": post.comments.len(),
        "createdAt": post.created_at,
        "updatedAt": post.updated_at,
    })
}

pub fn author_index(store: &spin_sdk::key_value::Store) -> anyhow::Result<HashMap<String, User>> {
    Ok(db::all_active_users(store)?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect())
}

// === HTTP handlers ===

/// GET /posts?limit&page
pub fn feed(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let Some(viewer) = db::load_active_user(&store, &user_id)? else {
        return Ok(ApiError::Unauthorized.into());
    };

    let params = parse_query_params(req.uri());
    let (limit, page) = page_params(&params);

    let feed = derive_feed(db::all_active_posts(&store)?, &viewer);
    let (page_posts, pagination) = paginate(feed, limit, page);

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

/// POST /posts
pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let body: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };
    let content = match validated_content(body["content"].as_str().unwrap_or_default()) {
        Ok(content) => content,
        Err(err) => return Ok(err.into()),
    };

    let store = store();
    let post = Post {
        id: Uuid::new_v4().to_string(),
        author: user_id,
        content,
        likes: Vec::new(),
        comments: Vec::new(),
        is_active: true,
        created_at: now_iso(),
        updated_at: None,
    };
    db::register_post(&store, &post)?;

    let authors = author_index(&store)?;
    let resp = serde_json::json!({
        "message": "Post created successfully",
        "post": post_json(&post, &authors),
    });
    Ok(Response::builder()
        .status(201)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

/// GET /posts/:id
pub fn get_post(req: Request) -> anyhow::Result<Response> {
    if validate_token(&req).is_none() {
        return Ok(ApiError::Unauthorized.into());
    }

    let path = req.path();
    let post_id = path.trim_start_matches("/posts/");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    match db::load_active_post(&store, post_id)? {
        Some(post) => {
            let authors = author_index(&store)?;
            let resp = serde_json::json!({ "post": post_json(&post, &authors) });
            Ok(Response::builder()
                .status(200)
                .header("Content-Type", "application/json")
                .body(serde_json::to_vec(&resp)?)
                .build())
        }
        None => Ok(ApiError::NotFound("Post not found".to_string()).into()),
    }
}

/// POST /posts/:id/like — toggle, with the resulting state in the body.
pub fn handle_like(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let path = req.path();
    let post_id = path.trim_start_matches("/posts/").trim_end_matches("/like");
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let Some(mut post) = db::load_active_post(&store, post_id)? else {
        return Ok(ApiError::NotFound("Post not found".to_string()).into());
    };

    let (liked, like_count) = toggle_like(&mut post, &user_id, now_iso());
    db::save_post(&store, &post)?;

    let message = if liked { "Post liked" } else { "Post unliked" };
    let resp = serde_json::json!({
        "message": message,
        "liked": liked,
        "likeCount": like_count,
    });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

use spin_sdk::key_value::Store;
use uuid::Uuid;
use crate::models::models::{Like, Post, User};
use crate::core::helpers::{hash_password, now_iso};
use crate::config::*;

// All isActive filtering lives here. Handlers ask for "active" documents
// and never re-check the flag themselves.

pub fn load_user(store: &Store, id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(id)).map_err(Into::into)
}

/// Loads a user, treating a disabled record as absent.
pub fn load_active_user(store: &Store, id: &str) -> anyhow::Result<Option<User>> {
    Ok(load_user(store, id)?.filter(|u| u.is_active))
}

pub fn save_user(store: &Store, user: &User) -> anyhow::Result<()> {
    store.set_json(&user_key(&user.id), user).map_err(Into::into)
}

pub fn load_post(store: &Store, id: &str) -> anyhow::Result<Option<Post>> {
    store.get_json::<Post>(&post_key(id)).map_err(Into::into)
}

pub fn load_active_post(store: &Store, id: &str) -> anyhow::Result<Option<Post>> {
    Ok(load_post(store, id)?.filter(|p| p.is_active))
}

pub fn save_post(store: &Store, post: &Post) -> anyhow::Result<()> {
    store.set_json(&post_key(&post.id), post).map_err(Into::into)
}

/// All active users, in registration order.
pub fn all_active_users(store: &Store) -> anyhow::Result<Vec<User>> {
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let mut users = Vec::new();
    for id in &ids {
        if let Some(u) = load_active_user(store, id)? {
            users.push(u);
        }
    }
    Ok(users)
}

/// All active posts, newest-first (the feed list is prepended on create).
pub fn all_active_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let ids: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    let mut posts = Vec::new();
    for id in &ids {
        if let Some(p) = load_active_post(store, id)? {
            posts.push(p);
        }
    }
    Ok(posts)
}

pub fn find_user_by_email(store: &Store, email: &str) -> anyhow::Result<Option<User>> {
    let needle = email.to_lowercase();
    let ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &ids {
        if let Some(u) = load_active_user(store, id)? {
            if u.email == needle {
                return Ok(Some(u));
            }
        }
    }
    Ok(None)
}

/// Persists a new user and adds it to the registry list.
pub fn register_user(store: &Store, user: &User) -> anyhow::Result<()> {
    save_user(store, user)?;
    let mut ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    ids.push(user.id.clone());
    store.set_json(USERS_LIST_KEY, &ids)?;
    Ok(())
}

/// Persists a new post and prepends it to the feed list.
pub fn register_post(store: &Store, post: &Post) -> anyhow::Result<()> {
    save_post(store, post)?;
    let mut ids: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    ids.insert(0, post.id.clone());
    store.set_json(FEED_KEY, &ids)?;
    Ok(())
}

// === Demo data ===

const DEMO_USERS: &[(&str, &str, &str)] = &[
    (
        "Alice Johnson",
        "alice@example.com",
        "Software Engineer passionate about building scalable web applications.",
    ),
    (
        "Bob Smith",
        "bob@example.com",
        "Product Manager with 5+ years experience in tech startups.",
    ),
    (
        "Emma Davis",
        "emma@example.com",
        "UX Designer creating beautiful and intuitive digital experiences.",
    ),
    (
        "David Wilson",
        "david@example.com",
        "Data Scientist and ML Engineer. Turning data into insights.",
    ),
];

const DEMO_POSTS: &[(&str, &str)] = &[
    (
        "alice@example.com",
        "Just shipped a new feature that reduces our API response time by 40%!",
    ),
    (
        "bob@example.com",
        "Excited to announce that our team just launched the new mobile app!",
    ),
    (
        "emma@example.com",
        "Working on a new design system for our company. Design systems are game-changers!",
    ),
    (
        "david@example.com",
        "Just finished training a model that predicts customer churn with 92% accuracy.",
    ),
];

/// Seeds a handful of demo accounts and posts, with Alice following Bob and
/// one like on the first post. No-op if the demo accounts already exist.
pub fn seed_demo_data(store: &Store) -> anyhow::Result<()> {
    if find_user_by_email(store, DEMO_USERS[0].1)?.is_some() {
        return Ok(());
    }

    let mut by_email: Vec<(String, String)> = Vec::new();
    for (name, email, bio) in DEMO_USERS {
        let user = User {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
            password: hash_password("demo123")?,
            bio: bio.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            followers: Vec::new(),
            following: Vec::new(),
            is_active: true,
            created_at: now_iso(),
            last_login: now_iso(),
        };
        register_user(store, &user)?;
        by_email.push((email.to_string(), user.id));
    }

    let user_id = |email: &str| -> String {
        by_email
            .iter()
            .find(|(e, _)| e == email)
            .map(|(_, id)| id.clone())
            .unwrap_or_default()
    };

    let mut first_post_id = String::new();
    for (email, content) in DEMO_POSTS {
        let post = Post {
            id: Uuid::new_v4().to_string(),
            author: user_id(email),
            content: content.to_string(),
            likes: Vec::new(),
            comments: Vec::new(),
            is_active: true,
            created_at: now_iso(),
            updated_at: None,
        };
        register_post(store, &post)?;
        if first_post_id.is_empty() {
            first_post_id = post.id.clone();
        }
    }

    // Alice follows Bob, kept symmetric on both documents.
    let alice_id = user_id("alice@example.com");
    let bob_id = user_id("bob@example.com");
    if let (Some(mut alice), Some(mut bob)) =
        (load_user(store, &alice_id)?, load_user(store, &bob_id)?)
    {
        alice.following.push(bob.id.clone());
        bob.followers.push(alice.id.clone());
        save_user(store, &alice)?;
        save_user(store, &bob)?;
    }

    // Bob likes Alice's first post.
    if let Some(mut post) = load_post(store, &first_post_id)? {
        post.likes.push(Like {
            user: bob_id,
            created_at: now_iso(),
        });
        save_post(store, &post)?;
    }

    Ok(())
}

/// Clears every document this application owns.
pub fn reset_db_data(store: &Store) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        store.delete(&user_key(id))?;
    }

    let posts: Vec<String> = store.get_json(FEED_KEY)?.unwrap_or_default();
    for id in &posts {
        store.delete(&post_key(id))?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in &tokens {
        store.delete(&token_key(token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(FEED_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}

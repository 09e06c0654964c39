use serde::{Serialize, Deserialize};

/// Stored user document. `password` holds the argon2 hash and is only ever
/// serialized back into the KV store; responses go through
/// `users::user_json`, which drops it.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Stored lowercased; uniqueness is checked case-insensitively.
    pub email: String,
    pub password: String,
    pub bio: String,
    pub avatar: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub is_active: bool,
    pub created_at: String,
    pub last_login: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: String,
    pub content: String,
    pub likes: Vec<Like>,
    pub comments: Vec<Comment>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

/// One like entry. At most one per user per post; the like route toggles
/// membership instead of appending.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub user: String,
    pub created_at: String,
}

// Comments are a read-only surface in this version: carried in the
// document and rendered, but no route mutates them.
#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

impl Post {
    pub fn liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|l| l.user == user_id)
    }
}

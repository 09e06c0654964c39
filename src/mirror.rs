//! Client-session mirror: the in-memory projection a signed-in client
//! keeps of the server's state. Entities are keyed by id, like/follow
//! toggles are applied optimistically, and every optimistic mutation
//! hands back a snapshot so a rejected request can be rolled back instead
//! of leaving the mirror drifted from server truth.

use std::collections::HashMap;
use crate::models::models::{Post, User};
use crate::core::helpers::now_iso;
use crate::posts::toggle_like;
use crate::follow::toggle_follow;
use crate::users::matches_search;

/// Bounded windows: the mirror only ever holds a recent slice, refreshed
/// from the server, never the whole database.
pub const POSTS_WINDOW: usize = 50;
pub const USERS_WINDOW: usize = 50;

#[derive(Default)]
pub struct Mirror {
    current_user: Option<User>,
    posts: HashMap<String, Post>,
    post_order: Vec<String>,
    users: HashMap<String, User>,
}

/// Pre-mutation state captured by an optimistic like, enough to restore
/// the entry exactly (including its position) on rollback.
pub struct LikeSnapshot {
    post_id: String,
    likes: Vec<crate::models::models::Like>,
}

/// Pre-mutation state captured by an optimistic follow.
pub struct FollowSnapshot {
    target_id: String,
    actor_following: Vec<String>,
    target_followers: Vec<String>,
}

impl Mirror {
    /// Builds the session mirror at login / session restore.
    pub fn login(user: User) -> Self {
        Mirror {
            current_user: Some(user),
            ..Default::default()
        }
    }

    /// Discards everything the session held.
    pub fn logout(&mut self) {
        *self = Mirror::default();
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn post(&self, id: &str) -> Option<&Post> {
        self.posts.get(id)
    }

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.get(id)
    }

    /// Recent posts in server order.
    pub fn posts(&self) -> Vec<&Post> {
        self.post_order.iter().filter_map(|id| self.posts.get(id)).collect()
    }

    /// Replaces the post window with a fresh server page.
    pub fn load_posts(&mut self, posts: Vec<Post>) {
        self.posts.clear();
        self.post_order.clear();
        for post in posts.into_iter().take(POSTS_WINDOW) {
            self.post_order.push(post.id.clone());
            self.posts.insert(post.id.clone(), post);
        }
    }

    /// Merges a server page of users into the window. A full window stops
    /// admitting new entries but already-loaded users are still refreshed
    /// with the server's copy.
    pub fn load_users(&mut self, users: Vec<User>) {
        for user in users {
            if self.users.len() >= USERS_WINDOW && !self.users.contains_key(&user.id) {
                continue;
            }
            self.users.insert(user.id.clone(), user);
        }
    }

    /// Patches one entity from a server response without touching the rest
    /// of the window.
    pub fn upsert_post(&mut self, post: Post) {
        if !self.posts.contains_key(&post.id) {
            self.post_order.insert(0, post.id.clone());
            self.post_order.truncate(POSTS_WINDOW);
        }
        self.posts.insert(post.id.clone(), post);
    }

    // === Optimistic like ===

    /// Applies the like toggle locally before the server answers, stamped
    /// with the local clock until the next wholesale refresh. Returns the
    /// prior state for `abort_like`, or None if the post isn't loaded.
    pub fn begin_like(&mut self, post_id: &str) -> Option<LikeSnapshot> {
        let user_id = self.current_user.as_ref()?.id.clone();
        let post = self.posts.get_mut(post_id)?;
        let snapshot = LikeSnapshot {
            post_id: post_id.to_string(),
            likes: post.likes.clone(),
        };
        toggle_like(post, &user_id, now_iso());
        Some(snapshot)
    }

    /// Reconciles with the server's `{liked, likeCount}` answer: if the
    /// optimistic flip disagrees with server truth, flip back. The count
    /// stays derived from the local entries.
    pub fn confirm_like(&mut self, post_id: &str, liked: bool, _like_count: usize) {
        let Some(user_id) = self.current_user.as_ref().map(|u| u.id.clone()) else {
            return;
        };
        let Some(post) = self.posts.get_mut(post_id) else {
            return;
        };
        if post.liked_by(&user_id) != liked {
            // Server disagreed with the optimistic flip; take its word.
            toggle_like(post, &user_id, now_iso());
        }
        debug_assert_eq!(post.liked_by(&user_id), liked);
    }

    /// Restores the pre-toggle state after a failed request.
    pub fn abort_like(&mut self, snapshot: LikeSnapshot) {
        if let Some(post) = self.posts.get_mut(&snapshot.post_id) {
            post.likes = snapshot.likes;
        }
    }

    // === Optimistic follow ===

    /// Applies the follow toggle locally, on both the session user and the
    /// loaded target, mirroring the server's symmetric update.
    pub fn begin_follow(&mut self, target_id: &str) -> Option<FollowSnapshot> {
        let actor = self.current_user.as_mut()?;
        let target = self.users.get_mut(target_id)?;
        let snapshot = FollowSnapshot {
            target_id: target_id.to_string(),
            actor_following: actor.following.clone(),
            target_followers: target.followers.clone(),
        };
        toggle_follow(actor, target).ok()?;
        Some(snapshot)
    }

    /// Reconciles with the server's `{following}` answer.
    pub fn confirm_follow(&mut self, target_id: &str, following: bool) {
        let Some(actor) = self.current_user.as_mut() else {
            return;
        };
        if actor.following.iter().any(|id| id == target_id) != following {
            if let Some(target) = self.users.get_mut(target_id) {
                let _ = toggle_follow(actor, target);
            }
        }
    }

    /// Restores both endpoints after a failed request.
    pub fn abort_follow(&mut self, snapshot: FollowSnapshot) {
        if let Some(actor) = self.current_user.as_mut() {
            actor.following = snapshot.actor_following;
        }
        if let Some(target) = self.users.get_mut(&snapshot.target_id) {
            target.followers = snapshot.target_followers;
        }
    }

    /// Client-path search over loaded users. Unlike the server discovery
    /// route, an empty query yields an empty result, not the full listing.
    pub fn search_users(&self, query: &str) -> Vec<&User> {
        if query.is_empty() {
            return Vec::new();
        }
        let own_id = self.current_user.as_ref().map(|u| u.id.as_str());
        self.users
            .values()
            .filter(|u| Some(u.id.as_str()) != own_id)
            .filter(|u| matches_search(u, query))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::models::Like;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{}@example.com", id),
            password: String::new(),
            bio: String::new(),
            avatar: String::new(),
            followers: Vec::new(),
            following: Vec::new(),
            is_active: true,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            last_login: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            author: author.to_string(),
            content: "hello".to_string(),
            likes: Vec::new(),
            comments: Vec::new(),
            is_active: true,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
            updated_at: None,
        }
    }

    #[test]
    fn optimistic_like_then_confirm() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_posts(vec![post("p1", "bob")]);

        let _snapshot = mirror.begin_like("p1").unwrap();
        assert!(mirror.post("p1").unwrap().liked_by("alice"));

        mirror.confirm_like("p1", true, 1);
        assert!(mirror.post("p1").unwrap().liked_by("alice"));
    }

    #[test]
    fn optimistic_like_rolls_back_on_failure() {
        let mut mirror = Mirror::login(user("alice"));
        let mut p = post("p1", "bob");
        p.likes.push(Like {
            user: "carol".to_string(),
            created_at: "t0".to_string(),
        });
        mirror.load_posts(vec![p]);

        let snapshot = mirror.begin_like("p1").unwrap();
        assert_eq!(mirror.post("p1").unwrap().likes.len(), 2);

        mirror.abort_like(snapshot);
        let likes = &mirror.post("p1").unwrap().likes;
        assert_eq!(likes.len(), 1);
        assert_eq!(likes[0].user, "carol");
    }

    #[test]
    fn confirm_overrides_a_stale_optimistic_like() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_posts(vec![post("p1", "bob")]);

        mirror.begin_like("p1").unwrap();
        // Server says the toggle landed as an unlike (a concurrent call
        // raced ours); the mirror takes server truth.
        mirror.confirm_like("p1", false, 0);
        assert!(!mirror.post("p1").unwrap().liked_by("alice"));
    }

    #[test]
    fn optimistic_follow_round_trip() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_users(vec![user("bob")]);

        let snapshot = mirror.begin_follow("bob").unwrap();
        assert!(mirror.current_user().unwrap().following.contains(&"bob".to_string()));
        assert!(mirror.user("bob").unwrap().followers.contains(&"alice".to_string()));

        mirror.abort_follow(snapshot);
        assert!(mirror.current_user().unwrap().following.is_empty());
        assert!(mirror.user("bob").unwrap().followers.is_empty());
    }

    #[test]
    fn logout_discards_the_session_view() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_posts(vec![post("p1", "bob")]);
        mirror.load_users(vec![user("bob")]);

        mirror.logout();
        assert!(mirror.current_user().is_none());
        assert!(mirror.posts().is_empty());
        assert!(mirror.user("bob").is_none());
    }

    #[test]
    fn client_search_returns_nothing_for_empty_query() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_users(vec![user("bob"), user("carol")]);

        assert!(mirror.search_users("").is_empty());
        let hits = mirror.search_users("bob");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "bob");
    }

    #[test]
    fn client_search_excludes_the_session_user() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_users(vec![user("alice"), user("alicia")]);

        let hits = mirror.search_users("ali");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "alicia");
    }

    #[test]
    fn optimistic_like_is_timestamped() {
        let mut mirror = Mirror::login(user("alice"));
        mirror.load_posts(vec![post("p1", "bob")]);

        mirror.begin_like("p1").unwrap();
        mirror.confirm_like("p1", true, 1);

        let likes = &mirror.post("p1").unwrap().likes;
        assert_eq!(likes.len(), 1);
        assert!(!likes[0].created_at.is_empty());
    }

    #[test]
    fn full_user_window_still_refreshes_loaded_entries() {
        let mut mirror = Mirror::login(user("me"));
        let page: Vec<User> = (0..USERS_WINDOW).map(|i| user(&format!("u{}", i))).collect();
        mirror.load_users(page);

        // The window is full: a later page can't admit newcomers, but a
        // newer copy of an already-loaded user must still land.
        let mut refreshed = user("u0");
        refreshed.bio = "updated bio".to_string();
        mirror.load_users(vec![user("brand_new"), refreshed]);

        assert!(mirror.user("brand_new").is_none());
        assert_eq!(mirror.user("u0").unwrap().bio, "updated bio");
    }

    #[test]
    fn post_window_is_bounded() {
        let mut mirror = Mirror::login(user("alice"));
        let posts: Vec<Post> = (0..POSTS_WINDOW + 20)
            .map(|i| post(&format!("p{}", i), "bob"))
            .collect();
        mirror.load_posts(posts);
        assert_eq!(mirror.posts().len(), POSTS_WINDOW);
    }
}

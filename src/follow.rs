use spin_sdk::http::{Request, Response};
use crate::models::models::User;
use crate::core::db;
use crate::core::errors::ApiError;
use crate::core::helpers::{store, validate_uuid};
use crate::auth::validate_token;

/// Flips the follow edge from `actor` to `target`, keeping the
/// denormalized relation symmetric: `target ∈ actor.following` iff
/// `actor ∈ target.followers`. Returns the new edge state (true when the
/// edge now exists).
///
/// Both documents are mutated in memory; the caller persists them together
/// so a failed write leaves nothing half-applied.
pub fn toggle_follow(actor: &mut User, target: &mut User) -> Result<bool, ApiError> {
    if actor.id == target.id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }

    if actor.following.contains(&target.id) {
        actor.following.retain(|id| id != &target.id);
        target.followers.retain(|id| id != &actor.id);
        Ok(false)
    } else {
        actor.following.push(target.id.clone());
        target.followers.push(actor.id.clone());
        Ok(true)
    }
}

// === HTTP handler ===

/// POST /users/:id/follow — one endpoint serves both directions, based on
/// the edge state at call time.
pub fn handle_follow(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let path = req.path();
    let target_id = path
        .trim_start_matches("/users/")
        .trim_end_matches("/follow");

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }

    let store = store();
    let Some(mut target) = db::load_active_user(&store, target_id)? else {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    };
    let Some(mut actor) = db::load_active_user(&store, &user_id)? else {
        return Ok(ApiError::Unauthorized.into());
    };

    let following = match toggle_follow(&mut actor, &mut target) {
        Ok(f) => f,
        Err(err) => return Ok(err.into()),
    };

    db::save_user(&store, &actor)?;
    db::save_user(&store, &target)?;

    let message = if following {
        "User followed successfully"
    } else {
        "User unfollowed successfully"
    };
    let resp = serde_json::json!({ "message": message, "following": following });
    Ok(Response::builder()
        .status(200)
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(&resp)?)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn edge_is_symmetric(a: &User, b: &User) -> bool {
        a.following.contains(&b.id) == b.followers.contains(&a.id)
            && b.following.contains(&a.id) == a.followers.contains(&b.id)
    }

    #[test]
    fn toggle_creates_then_removes_edge() {
        let mut alice = user("alice");
        let mut bob = user("bob");

        assert_eq!(toggle_follow(&mut alice, &mut bob).unwrap(), true);
        assert!(alice.following.contains(&bob.id));
        assert!(bob.followers.contains(&alice.id));
        assert!(edge_is_symmetric(&alice, &bob));

        assert_eq!(toggle_follow(&mut alice, &mut bob).unwrap(), false);
        assert!(alice.following.is_empty());
        assert!(bob.followers.is_empty());
        assert!(edge_is_symmetric(&alice, &bob));
    }

    #[test]
    fn double_toggle_restores_original_state() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        // Pre-existing edge in the other direction must survive untouched.
        bob.following.push(alice.id.clone());
        alice.followers.push(bob.id.clone());

        toggle_follow(&mut alice, &mut bob).unwrap();
        toggle_follow(&mut alice, &mut bob).unwrap();

        assert!(alice.following.is_empty());
        assert!(bob.followers.is_empty());
        assert_eq!(bob.following, vec![alice.id.clone()]);
        assert_eq!(alice.followers, vec![bob.id.clone()]);
        assert!(edge_is_symmetric(&alice, &bob));
    }

    #[test]
    fn self_follow_is_rejected_and_graph_unchanged() {
        let mut a = user("alice");
        let mut b = user("alice");

        let err = toggle_follow(&mut a, &mut b).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(a.following.is_empty());
        assert!(a.followers.is_empty());
        assert!(b.followers.is_empty());
    }

    #[test]
    fn edges_are_independent_per_pair() {
        let mut alice = user("alice");
        let mut bob = user("bob");
        let mut carol = user("carol");

        toggle_follow(&mut alice, &mut bob).unwrap();
        toggle_follow(&mut alice, &mut carol).unwrap();
        toggle_follow(&mut alice, &mut bob).unwrap();

        assert_eq!(alice.following, vec![carol.id.clone()]);
        assert!(bob.followers.is_empty());
        assert_eq!(carol.followers, vec![alice.id.clone()]);
    }
}

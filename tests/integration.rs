//! End-to-end flow against a running server (`cargo run`, or `spin up`
//! behind a proxy on the same port). Ignored by default so the unit suite
//! needs no server.

use serde_json::json;
use std::sync::Mutex;

const BASE_URL: &str = "http://127.0.0.1:3000";
static TEST_LOCK: Mutex<()> = Mutex::new(());

fn lock_test() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap()
}

async fn register(
    client: &reqwest::Client,
    name: &str,
    email: &str,
) -> (String, String) {
    let resp = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": name,
            "email": email,
            "password": "demo123",
            "bio": format!("{} says hi", name)
        }))
        .send()
        .await
        .expect("Failed to register");

    assert_eq!(resp.status(), 201);
    let body = resp.json::<serde_json::Value>().await.unwrap();
    let token = body["token"].as_str().expect("token missing").to_string();
    let user_id = body["user"]["id"].as_str().expect("user id missing").to_string();
    (token, user_id)
}

fn unique_email(tag: &str) -> String {
    format!("{}_{}@example.com", tag, uuid::Uuid::new_v4().simple())
}

#[ignore]
#[tokio::test]
async fn test_register_login_me_flow() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let email = unique_email("flow");
    let (_, user_id) = register(&client, "Flow Test", &email).await;

    // Duplicate registration fails with 400, case-insensitively.
    let dup = client
        .post(format!("{}/auth/register", BASE_URL))
        .json(&json!({
            "name": "Flow Clone",
            "email": email.to_uppercase(),
            "password": "demo123"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(dup.status(), 400);

    let login = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "demo123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), 200);
    let body = login.json::<serde_json::Value>().await.unwrap();
    let token = body["token"].as_str().unwrap();
    assert_eq!(body["user"]["id"], user_id.as_str());
    assert!(body["user"].get("password").is_none());

    let me = client
        .get(format!("{}/auth/me", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let me = me.json::<serde_json::Value>().await.unwrap();
    assert_eq!(me["user"]["id"], user_id.as_str());

    let bad_login = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({ "email": email, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_login.status(), 401);
}

#[ignore]
#[tokio::test]
async fn test_post_like_toggle() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (author_token, _) = register(&client, "Like Author", &unique_email("author")).await;
    let (liker_token, _) = register(&client, "Like Fan", &unique_email("fan")).await;

    let created = client
        .post(format!("{}/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&json!({ "content": "Toggle me" }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created = created.json::<serde_json::Value>().await.unwrap();
    let post_id = created["post"]["id"].as_str().unwrap().to_string();

    // 0 -> 1
    let liked = client
        .post(format!("{}/posts/{}/like", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", liker_token))
        .send()
        .await
        .unwrap();
    assert_eq!(liked.status(), 200);
    let liked = liked.json::<serde_json::Value>().await.unwrap();
    assert_eq!(liked["liked"], true);
    assert_eq!(liked["likeCount"], 1);

    // 1 -> 0
    let unliked = client
        .post(format!("{}/posts/{}/like", BASE_URL, post_id))
        .header("Authorization", format!("Bearer {}", liker_token))
        .send()
        .await
        .unwrap();
    let unliked = unliked.json::<serde_json::Value>().await.unwrap();
    assert_eq!(unliked["liked"], false);
    assert_eq!(unliked["likeCount"], 0);
}

#[ignore]
#[tokio::test]
async fn test_follow_toggle_and_feed() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (alice_token, alice_id) = register(&client, "Feed Alice", &unique_email("alice")).await;
    let (bob_token, bob_id) = register(&client, "Feed Bob", &unique_email("bob")).await;

    // Self-follow is rejected.
    let selfie = client
        .post(format!("{}/users/{}/follow", BASE_URL, alice_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    assert_eq!(selfie.status(), 400);

    let followed = client
        .post(format!("{}/users/{}/follow", BASE_URL, bob_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap();
    assert_eq!(followed.status(), 200);
    let followed = followed.json::<serde_json::Value>().await.unwrap();
    assert_eq!(followed["following"], true);

    // Both sides of the edge are visible on the target's projection.
    let bob = client
        .get(format!("{}/users/{}", BASE_URL, bob_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(bob["user"]["followers"]
        .as_array()
        .unwrap()
        .iter()
        .any(|id| id == alice_id.as_str()));

    let hello = client
        .post(format!("{}/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", bob_token))
        .json(&json!({ "content": "hello" }))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let hello_id = hello["post"]["id"].as_str().unwrap();

    // Bob's post lands in Alice's feed.
    let feed = client
        .get(format!("{}/posts?limit=50", BASE_URL))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(feed["posts"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"] == hello_id));

    // Second toggle removes the edge again.
    let unfollowed = client
        .post(format!("{}/users/{}/follow", BASE_URL, bob_id))
        .header("Authorization", format!("Bearer {}", alice_token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(unfollowed["following"], false);
}

#[ignore]
#[tokio::test]
async fn test_discovery_search() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let needle = uuid::Uuid::new_v4().simple().to_string();
    let (token, my_id) = register(&client, "Search Self", &unique_email("searcher")).await;
    register(&client, &format!("Needle {}", needle), &unique_email("needle")).await;

    let found = client
        .get(format!("{}/users?search={}", BASE_URL, needle))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    let users = found["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0]["name"].as_str().unwrap().contains(&needle));

    // The requesting user never shows up in discovery.
    let all = client
        .get(format!("{}/users?limit=50", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(all["users"]
        .as_array()
        .unwrap()
        .iter()
        .all(|u| u["id"] != my_id.as_str()));
}

#[ignore]
#[tokio::test]
async fn test_profile_update_and_author_posts() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (token, user_id) = register(&client, "Profile User", &unique_email("profile")).await;

    let updated = client
        .put(format!("{}/users/profile", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "name": "Renamed User", "bio": "new bio" }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated = updated.json::<serde_json::Value>().await.unwrap();
    assert_eq!(updated["user"]["name"], "Renamed User");
    assert_eq!(updated["user"]["bio"], "new bio");

    for i in 0..3 {
        let resp = client
            .post(format!("{}/posts", BASE_URL))
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "content": format!("post number {}", i) }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
    }

    let page = client
        .get(format!("{}/users/{}/posts?limit=2&page=1", BASE_URL, user_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert_eq!(page["posts"].as_array().unwrap().len(), 2);
    assert_eq!(page["pagination"]["total"], 3);
    assert_eq!(page["pagination"]["pages"], 2);

    // Oversized content is rejected.
    let too_long = client
        .post(format!("{}/posts", BASE_URL))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "content": "x".repeat(1001) }))
        .send()
        .await
        .unwrap();
    assert_eq!(too_long.status(), 400);
}

use spin_sdk::http::{Request, Response};
#[cfg(target_arch = "wasm32")]
use spin_sdk::http::IntoResponse;
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;

pub mod config;
pub mod models;
pub mod core;
pub mod auth;
pub mod users;
pub mod posts;
pub mod follow;
pub mod mirror;

use crate::core::errors::ApiError;

fn not_found() -> anyhow::Result<Response> {
    Ok(ApiError::NotFound("Not found".to_string()).into())
}

pub fn route(req: Request) -> anyhow::Result<Response> {
    let path = req.path();
    let method = req.method();

    match (method.to_string().as_str(), path) {
        ("POST", "/auth/register") => auth::register(req),
        ("POST", "/auth/login") => auth::login(req),
        ("POST", "/auth/logout") => auth::logout(req),
        ("GET", "/auth/me") => auth::me(req),
        ("GET", "/posts") => posts::feed(req),
        ("POST", "/posts") => posts::create_post(req),
        ("POST", p) if p.starts_with("/posts/") && p.ends_with("/like") => posts::handle_like(req),
        ("GET", p) if p.starts_with("/posts/") => posts::get_post(req),
        ("GET", "/users") => users::discover(req),
        ("PUT", "/users/profile") => users::update_profile(req),
        ("POST", p) if p.starts_with("/users/") && p.ends_with("/follow") => {
            follow::handle_follow(req)
        }
        ("GET", p) if p.starts_with("/users/") && p.ends_with("/posts") => users::user_posts(req),
        ("GET", p) if p.starts_with("/users/") => users::get_user_details(req),
        _ => not_found(),
    }
}

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    if config::seed_demo_data_enabled() {
        let _ = core::db::seed_demo_data(&core::helpers::store());
    }

    // Persistence failures surface as a generic 500; the detail stays in
    // the server log.
    let resp = match route(req) {
        Ok(resp) => resp,
        Err(err) => {
            eprintln!("request failed: {err:#}");
            ApiError::InternalError(err.to_string()).into()
        }
    };
    Ok(resp)
}

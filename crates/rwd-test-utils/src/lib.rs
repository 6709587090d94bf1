//! Testing utilities for the RWD workspace
//!
//! Shared fixtures for store and server integration tests.

#![allow(missing_docs)]

use rwd_model::{
    ArticleChanges, Credentials, IdAllocator, ManualClock, NewArticle, NewComment, NewUser,
    Timestamp,
};
use rwd_server::{ApiRequest, ApiResponse, App, ServerConfig};
use rwd_store::{IsolationMode, Resolver, SeedDataset, SessionKey, SessionLimits, SessionStore, StoreConfig};
use std::net::SocketAddr;
use std::sync::Arc;

/// 2024-01-01T00:00:00Z
pub const SEED_MILLIS: i64 = 1_704_067_200_000;

pub const DEMO_PASSWORD: &str = "password123";

pub fn seed_time() -> Timestamp {
    Timestamp::from_millis(SEED_MILLIS).unwrap()
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::starting_at(SEED_MILLIS + 60_000))
}

pub fn demo_resolver() -> Resolver {
    let ids = Arc::new(IdAllocator::new());
    let seed = Arc::new(SeedDataset::demo(&ids, seed_time(), "https://img.test/a.png").unwrap());
    Resolver::new(seed, ids, clock())
}

pub fn store_with(mode: IsolationMode, limits: SessionLimits) -> SessionStore {
    let resolver = demo_resolver().with_session_limits(limits);
    SessionStore::new(resolver, mode.gate(), StoreConfig::default())
}

pub fn demo_store() -> SessionStore {
    store_with(IsolationMode::PerCaller, SessionLimits::unbounded())
}

pub fn session(name: &str) -> SessionKey {
    SessionKey::new(name)
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        email: Some(format!("{name}@example.org")),
        username: Some(name.to_string()),
        password: Some("secret".to_string()),
    }
}

pub fn credentials(name: &str) -> Credentials {
    Credentials {
        email: Some(format!("{name}@example.org")),
        password: Some("secret".to_string()),
    }
}

pub fn new_article(title: &str) -> NewArticle {
    NewArticle {
        title: Some(title.to_string()),
        description: Some(format!("About {title}")),
        body: Some(format!("All about {title}.")),
        tag_list: Some(vec!["test".to_string()]),
    }
}

pub fn retitle(title: &str) -> ArticleChanges {
    ArticleChanges {
        title: Some(title.to_string()),
        ..ArticleChanges::default()
    }
}

pub fn new_comment(body: &str) -> NewComment {
    NewComment {
        body: Some(body.to_string()),
    }
}

// Server fixtures

pub fn test_config() -> ServerConfig {
    ServerConfig::default().with_demo_data(true)
}

pub fn app_with(config: &ServerConfig) -> App {
    App::with_clock(config, clock()).unwrap()
}

pub fn demo_app() -> App {
    app_with(&test_config())
}

pub fn addr(ip: &str) -> SocketAddr {
    format!("{ip}:40000").parse().unwrap()
}

pub fn json_body(response: &ApiResponse) -> serde_json::Value {
    response.body.clone().unwrap_or(serde_json::Value::Null)
}

/// Register `name` from `ip` and return the issued token
pub fn register(app: &App, ip: &str, name: &str) -> String {
    let response = app.handle(
        ApiRequest::post("/users")
            .with_remote(addr(ip))
            .with_json(&serde_json::json!({"user": {
                "email": format!("{name}@example.org"),
                "username": name,
                "password": "secret"
            }})),
    );
    assert_eq!(response.status.as_u16(), 201, "{:?}", response.body);
    json_body(&response)["user"]["token"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Create an article with `token` and return its slug
pub fn create_article(app: &App, token: &str, title: &str) -> String {
    let response = app.handle(
        ApiRequest::post("/articles")
            .with_token(token)
            .with_json(&serde_json::json!({"article": {
                "title": title,
                "description": "desc",
                "body": "body",
                "tagList": ["test"]
            }})),
    );
    assert_eq!(response.status.as_u16(), 201, "{:?}", response.body);
    json_body(&response)["article"]["slug"]
        .as_str()
        .unwrap()
        .to_string()
}

//! End-to-end API scenarios through `App::handle`
//!
//! Run with: cargo test --package rwd-server --test api

use pretty_assertions::assert_eq;
use rwd_server::{ApiRequest, ApiResponse, App};
use rwd_store::{IsolationMode, SessionLimits};
use rwd_test_utils::{addr, app_with, create_article, demo_app, json_body, register, test_config};
use serde_json::{json, Value};

fn send(app: &App, request: ApiRequest) -> (u16, Value) {
    let response: ApiResponse = app.handle(request);
    (response.status.as_u16(), json_body(&response))
}

fn get(app: &App, ip: &str, path: &str) -> (u16, Value) {
    send(app, ApiRequest::get(path).with_remote(addr(ip)))
}

fn errors(body: &Value) -> Vec<String> {
    body["errors"]["body"]
        .as_array()
        .map(|messages| {
            messages
                .iter()
                .filter_map(|m| m.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn article_lifecycle_through_the_api() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");
    let slug = create_article(&app, &token, "My First Post");
    assert_eq!(slug, "my-first-post");

    let (status, body) = get(&app, "10.0.0.1", "/articles/my-first-post");
    assert_eq!(status, 200);
    assert_eq!(body["article"]["author"]["username"], "alice");
    assert_eq!(body["article"]["favorited"], false);
    assert_eq!(body["article"]["tagList"], json!(["test"]));

    let (status, body) = send(
        &app,
        ApiRequest::post("/articles/my-first-post/favorite").with_token(&token),
    );
    assert_eq!(status, 200);
    assert_eq!(body["article"]["favorited"], true);
    assert_eq!(body["article"]["favoritesCount"], 1);

    let (status, body) = send(
        &app,
        ApiRequest::post("/articles/my-first-post/comments")
            .with_token(&token)
            .with_json(&json!({"comment": {"body": "First!"}})),
    );
    assert_eq!(status, 200);
    let comment_id = body["comment"]["id"].as_u64().unwrap();

    let (status, body) = get(&app, "10.0.0.1", "/articles/my-first-post/comments");
    assert_eq!(status, 200);
    assert_eq!(body["comments"].as_array().map(Vec::len), Some(1));

    let path = format!("/articles/my-first-post/comments/{comment_id}");
    let (status, body) = send(&app, ApiRequest::delete(path).with_token(&token));
    assert_eq!(status, 204);
    assert_eq!(body, Value::Null);

    let (status, _) = send(
        &app,
        ApiRequest::delete("/articles/my-first-post").with_token(&token),
    );
    assert_eq!(status, 204);

    let (status, body) = get(&app, "10.0.0.1", "/articles/my-first-post");
    assert_eq!(status, 404);
    assert_eq!(errors(&body), vec!["Article not found".to_string()]);
}

#[test]
fn articles_stay_inside_their_session() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");
    create_article(&app, &token, "Secret Plans");

    let (status, _) = get(&app, "10.0.0.2", "/articles/secret-plans");
    assert_eq!(status, 404);
    let (_, body) = get(&app, "10.0.0.2", "/articles");
    assert_eq!(body["articlesCount"], 4);
    let (_, body) = get(&app, "10.0.0.1", "/articles");
    assert_eq!(body["articlesCount"], 5);
}

#[test]
fn dragon_article_exists_only_for_its_creator() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "hiccup");
    let slug = create_article(&app, &token, "How to Train Your Dragon");
    assert_eq!(slug, "how-to-train-your-dragon");

    let (status, body) = send(
        &app,
        ApiRequest::get("/articles/how-to-train-your-dragon").with_token(&token),
    );
    assert_eq!(status, 200);
    assert_eq!(body["article"]["title"], "How to Train Your Dragon");

    let (status, body) = get(&app, "10.0.0.2", "/articles/how-to-train-your-dragon");
    assert_eq!(status, 404);
    assert_eq!(errors(&body), vec!["Article not found".to_string()]);
}

#[test]
fn follow_drives_the_feed() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");

    let (status, body) = send(&app, ApiRequest::get("/articles/feed").with_token(&token));
    assert_eq!(status, 200);
    assert_eq!(body["articlesCount"], 0);

    let (status, body) = send(
        &app,
        ApiRequest::post("/profiles/janesmith/follow").with_token(&token),
    );
    assert_eq!(status, 200);
    assert_eq!(body["profile"]["following"], true);

    let (_, body) = send(&app, ApiRequest::get("/articles/feed").with_token(&token));
    assert_eq!(body["articlesCount"], 1);
    assert_eq!(body["articles"][0]["slug"], "react-hooks-best-practices");

    let (_, body) = send(
        &app,
        ApiRequest::delete("/profiles/janesmith/follow").with_token(&token),
    );
    assert_eq!(body["profile"]["following"], false);

    // Anonymous viewers never follow anyone
    let (_, body) = get(&app, "10.0.0.9", "/profiles/janesmith");
    assert_eq!(body["profile"]["following"], false);
}

#[test]
fn listing_filters_and_pagination() {
    let app = demo_app();
    let count = |query: &[(&str, &str)]| {
        let request = query
            .iter()
            .fold(ApiRequest::get("/articles").with_remote(addr("10.0.0.1")), |r, (k, v)| {
                r.with_query(*k, *v)
            });
        let (status, body) = send(&app, request);
        assert_eq!(status, 200);
        (
            body["articlesCount"].as_u64().unwrap_or_default(),
            body["articles"].as_array().map_or(0, Vec::len),
        )
    };

    assert_eq!(count(&[]), (4, 4));
    assert_eq!(count(&[("tag", "javascript")]), (2, 2));
    assert_eq!(count(&[("author", "johndoe")]), (1, 1));
    assert_eq!(count(&[("favorited", "sarahchen")]), (2, 2));
    assert_eq!(count(&[("author", "nobody")]), (0, 0));
    assert_eq!(count(&[("limit", "1"), ("offset", "1")]), (4, 1));
    assert_eq!(count(&[("offset", "10")]), (4, 0));

    let (status, body) = send(
        &app,
        ApiRequest::get("/articles").with_query("limit", "many"),
    );
    assert_eq!(status, 422);
    assert_eq!(errors(&body), vec!["limit must be a non-negative integer".to_string()]);
}

#[test]
fn seed_counts_and_flags_are_viewer_specific() {
    let app = demo_app();
    let (status, body) = send(
        &app,
        ApiRequest::post("/users/login")
            .with_remote(addr("10.0.0.1"))
            .with_json(&json!({"user": {
                "email": "john.doe@example.com",
                "password": "password123"
            }})),
    );
    assert_eq!(status, 200);
    let token = body["user"]["token"].as_str().unwrap().to_string();

    let (_, body) = send(
        &app,
        ApiRequest::get("/articles/react-hooks-best-practices").with_token(&token),
    );
    assert_eq!(body["article"]["favorited"], true);
    assert_eq!(body["article"]["favoritesCount"], 2);
    assert_eq!(body["article"]["author"]["following"], true);

    let (_, body) = get(&app, "10.0.0.2", "/articles/react-hooks-best-practices");
    assert_eq!(body["article"]["favorited"], false);
    assert_eq!(body["article"]["favoritesCount"], 2);
}

#[test]
fn only_the_author_may_change_an_article() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");

    let (status, body) = send(
        &app,
        ApiRequest::put("/articles/react-hooks-best-practices")
            .with_token(&token)
            .with_json(&json!({"article": {"title": "Mine now"}})),
    );
    assert_eq!(status, 403);
    assert_eq!(errors(&body), vec!["Forbidden".to_string()]);

    let (status, _) = send(
        &app,
        ApiRequest::delete("/articles/react-hooks-best-practices").with_token(&token),
    );
    assert_eq!(status, 403);

    let slug = create_article(&app, &token, "Original");
    let (status, body) = send(
        &app,
        ApiRequest::put(format!("/articles/{slug}"))
            .with_token(&token)
            .with_json(&json!({"article": {"title": "Renamed", "body": "New body"}})),
    );
    assert_eq!(status, 200);
    assert_eq!(body["article"]["slug"], "renamed");
    assert_eq!(body["article"]["body"], "New body");
}

#[test]
fn profile_updates_are_visible_on_next_read() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");

    let (status, body) = send(
        &app,
        ApiRequest::put("/user")
            .with_token(&token)
            .with_json(&json!({"user": {"bio": "Hello there"}})),
    );
    assert_eq!(status, 200);
    assert_eq!(body["user"]["bio"], "Hello there");
    assert_eq!(body["user"]["token"], token.as_str());

    let (_, body) = send(&app, ApiRequest::get("/user").with_token(&token));
    assert_eq!(body["user"]["bio"], "Hello there");
}

#[test]
fn duplicate_registration_conflicts() {
    let app = demo_app();
    register(&app, "10.0.0.1", "alice");
    let (status, body) = send(
        &app,
        ApiRequest::post("/users")
            .with_remote(addr("10.0.0.1"))
            .with_json(&json!({"user": {
                "email": "other@example.org",
                "username": "johndoe",
                "password": "secret"
            }})),
    );
    assert_eq!(status, 409);
    assert_eq!(errors(&body), vec!["User already exists".to_string()]);

    let (status, body) = send(
        &app,
        ApiRequest::post("/users")
            .with_remote(addr("10.0.0.1"))
            .with_json(&json!({"user": {"email": "x@example.org"}})),
    );
    assert_eq!(status, 422);
    assert!(!errors(&body).is_empty());
}

#[test]
fn session_caps_answer_too_many_requests() {
    let config = test_config().with_session_limits(SessionLimits::unbounded().with_max_comments(1));
    let app = app_with(&config);
    let token = register(&app, "10.0.0.1", "alice");
    let comment = |text: &str| {
        send(
            &app,
            ApiRequest::post("/articles/react-hooks-best-practices/comments")
                .with_token(&token)
                .with_json(&json!({"comment": {"body": text}})),
        )
    };

    assert_eq!(comment("one").0, 200);
    let (status, body) = comment("two");
    assert_eq!(status, 429);
    assert_eq!(
        errors(&body),
        vec!["session limit reached: at most 1 comments".to_string()]
    );

    let (_, body) = get(&app, "10.0.0.1", "/articles/react-hooks-best-practices/comments");
    assert_eq!(body["comments"].as_array().map(Vec::len), Some(3));
}

#[test]
fn shared_mode_exposes_writes_to_all_callers() {
    let app = app_with(&test_config().with_isolation(IsolationMode::Shared));
    let token = register(&app, "10.0.0.1", "alice");
    create_article(&app, &token, "Everyone Sees This");

    let (status, body) = get(&app, "10.0.0.2", "/profiles/alice");
    assert_eq!(status, 200);
    assert_eq!(body["profile"]["username"], "alice");
    let (status, _) = get(&app, "192.168.1.1", "/articles/everyone-sees-this");
    assert_eq!(status, 200);
}

#[test]
fn path_prefix_is_required_when_configured() {
    let app = app_with(&test_config().with_path_prefix("/api"));
    let (status, body) = get(&app, "10.0.0.1", "/api/tags");
    assert_eq!(status, 200);
    assert!(body["tags"]
        .as_array()
        .is_some_and(|tags| tags.contains(&json!("react"))));

    let (status, body) = get(&app, "10.0.0.1", "/tags");
    assert_eq!(status, 404);
    assert_eq!(errors(&body), vec!["Not found".to_string()]);
}

#[test]
fn unknown_comment_and_profile_are_not_found() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");

    let (status, body) = send(
        &app,
        ApiRequest::delete("/articles/react-hooks-best-practices/comments/999999")
            .with_token(&token),
    );
    assert_eq!(status, 404);
    assert_eq!(errors(&body), vec!["Comment not found".to_string()]);

    let (status, _) = send(
        &app,
        ApiRequest::delete("/articles/react-hooks-best-practices/comments/abc")
            .with_token(&token),
    );
    assert_eq!(status, 404);

    let (status, body) = get(&app, "10.0.0.1", "/profiles/ghost");
    assert_eq!(status, 404);
    assert_eq!(errors(&body), vec!["Profile not found".to_string()]);
}

#[test]
fn default_caps_bound_an_unconfigured_server() {
    let app = demo_app();
    let token = register(&app, "10.0.0.1", "alice");
    for i in 0..20 {
        create_article(&app, &token, &format!("Post {i}"));
    }

    let (status, body) = send(
        &app,
        ApiRequest::post("/articles")
            .with_token(&token)
            .with_json(&json!({"article": {
                "title": "One Too Many",
                "description": "desc",
                "body": "body"
            }})),
    );
    assert_eq!(status, 429);
    assert_eq!(
        errors(&body),
        vec!["session limit reached: at most 20 articles".to_string()]
    );
}

#[test]
fn anonymous_traffic_does_not_create_sessions() {
    let app = demo_app();
    for i in 0..100 {
        let (status, _) = get(&app, &format!("10.3.{}.{}", i / 10, i % 10), "/articles");
        assert_eq!(status, 200);
    }
    for i in 0..10 {
        let (status, _) = send(
            &app,
            ApiRequest::post("/users/login")
                .with_remote(addr(&format!("10.4.0.{i}")))
                .with_json(&json!({"user": {
                    "email": "nobody@example.org",
                    "password": "wrong"
                }})),
        );
        assert_eq!(status, 401);
    }
    assert_eq!(app.store().session_count(), 0);

    register(&app, "10.0.0.1", "alice");
    assert_eq!(app.store().session_count(), 1);
}

#[test]
fn a_new_login_replaces_the_previous_token() {
    let app = demo_app();
    let first = register(&app, "10.0.0.1", "alice");
    let login = || {
        let (status, body) = send(
            &app,
            ApiRequest::post("/users/login")
                .with_remote(addr("10.0.0.1"))
                .with_json(&json!({"user": {
                    "email": "alice@example.org",
                    "password": "secret"
                }})),
        );
        assert_eq!(status, 200);
        body["user"]["token"].as_str().unwrap().to_string()
    };
    let tokens: Vec<String> = (0..5).map(|_| login()).collect();

    assert_eq!(app.store().tokens().len(), 1);
    for stale in std::iter::once(&first).chain(&tokens[..4]) {
        let (status, _) = send(&app, ApiRequest::get("/user").with_token(stale));
        assert_eq!(status, 401);
    }
    let (status, body) = send(&app, ApiRequest::get("/user").with_token(&tokens[4]));
    assert_eq!(status, 200);
    assert_eq!(body["user"]["username"], "alice");
}

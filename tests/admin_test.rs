mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_admin_login() {
    let app = spawn_app().await;

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": app.admin_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["is_admin"], true);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "admin", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");

    let (status, body) = app
        .json("POST", "/api/auth/login", None, Some(json!({ "username": "admin" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username and password required");

    app.user_token("alice").await;
    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "user-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access only");
}

#[tokio::test]
async fn test_registration_rules() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (_, invite) = app
        .json("POST", "/api/admin/invite-codes", Some(&admin), None)
        .await;
    let code = invite["code"].as_str().unwrap().to_string();

    let register = |username: &str, invite: &str| {
        json!({ "username": username, "password": "secret", "inviteCode": invite })
    };

    let (status, body) = app
        .json("POST", "/api/auth/register", None, Some(register("bob", "nope-nope-nope")))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid invite code");

    let (status, body) = app
        .json("POST", "/api/auth/register", None, Some(register("api", &code)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "This username is reserved");

    let (status, body) = app
        .json("POST", "/api/auth/register", None, Some(json!({ "username": "bob" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username, password, and invite code required");

    let (status, body) = app
        .json("POST", "/api/auth/register", None, Some(register("bob", &code)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "bob");

    // Codes stay usable after the first registration
    let (status, _) = app
        .json("POST", "/api/auth/register", None, Some(register("carol", &code)))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json("POST", "/api/auth/register", None, Some(register("bob", &code)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Username already taken");
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = spawn_app().await;
    let user = app.user_token("alice").await;

    for (method, uri) in [
        ("GET", "/api/admin/users"),
        ("GET", "/api/admin/settings"),
        ("POST", "/api/admin/invite-codes"),
    ] {
        let (status, _) = app.json(method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{} {}", method, uri);

        let (status, body) = app.json(method, uri, Some(&user), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, uri);
        assert_eq!(body["error"], "Admin access required");
    }

    let (status, body) = app
        .json("GET", "/api/admin/users", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_invite_code_management() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.user_token("alice").await;

    let (status, codes) = app
        .json("GET", "/api/admin/invite-codes", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let codes = codes.as_array().unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0]["use_count"], 1);
    assert_eq!(codes[0]["used_by"], json!(["alice"]));
    assert_eq!(codes[0]["created_by"], "admin");
    let id = codes[0]["id"].as_str().unwrap().to_string();
    let code = codes[0]["code"].as_str().unwrap().to_string();

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/admin/invite-codes/{}", id),
            Some(&admin),
            Some(json!({ "disabled": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["disabled"], true);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({ "username": "bob", "password": "pw", "inviteCode": code })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid invite code");

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/invite-codes/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json("DELETE", &format!("/api/admin/invite-codes/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Code not found");

    // The account created with the code survives its deletion
    let (status, _) = app.json("GET", "/api/users/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let (status, settings) = app
        .json("GET", "/api/admin/settings", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settings["max_expiration_days"], "30");
    assert_eq!(settings["max_file_size_mb"], "10");
    assert_eq!(settings["homepage_type"], "user_list");

    let (status, body) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            Some(json!({ "max_expiration_days": 400, "max_file_size_mb": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Max expiration must be 1-365 days");

    // Nothing from the rejected request was written
    let (_, settings) = app
        .json("GET", "/api/admin/settings", Some(&admin), None)
        .await;
    assert_eq!(settings["max_file_size_mb"], "10");

    let (status, body) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            Some(json!({ "homepage_type": "user_page", "homepage_user": "ghost" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User not found");

    let (status, _) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            Some(json!({ "max_expiration_days": "7", "max_file_size_mb": 5 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, settings) = app
        .json("GET", "/api/admin/settings", Some(&admin), None)
        .await;
    assert_eq!(settings["max_expiration_days"], "7");
    assert_eq!(settings["max_file_size_mb"], "5");

    let (status, body) = app
        .create_text(&admin, json!({ "content": "x", "expiresIn": 8 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Expiration cannot exceed 7 days");
}

#[tokio::test]
async fn test_update_user() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    app.user_token("alice").await;

    let (_, users) = app.json("GET", "/api/admin/users", Some(&admin), None).await;
    let users = users.as_array().unwrap().clone();
    assert_eq!(users.len(), 2);
    let alice = users.iter().find(|u| u["username"] == "alice").unwrap();
    let admin_row = users.iter().find(|u| u["username"] == "admin").unwrap();
    let alice_id = alice["id"].as_str().unwrap().to_string();
    let admin_id = admin_row["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/admin/users/{}", alice_id),
            Some(&admin),
            Some(json!({ "resetPassword": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_password = body["newPassword"].as_str().unwrap().to_string();

    let (status, _) = app
        .json(
            "POST",
            "/api/users/alice/unlock",
            None,
            Some(json!({ "password": "user-pass" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .json(
            "POST",
            "/api/users/alice/unlock",
            None,
            Some(json!({ "password": new_password })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .json(
            "PUT",
            &format!("/api/admin/users/{}", alice_id),
            Some(&admin),
            Some(json!({ "isAdmin": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("newPassword").is_none());

    // Admins cannot demote themselves
    let (status, _) = app
        .json(
            "PUT",
            &format!("/api/admin/users/{}", admin_id),
            Some(&admin),
            Some(json!({ "isAdmin": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = app.json("GET", "/api/admin/users", Some(&admin), None).await;
    assert!(users.as_array().unwrap().iter().all(|u| u["is_admin"] == true));

    let (status, body) = app
        .json(
            "PUT",
            "/api/admin/users/no-such-user",
            Some(&admin),
            Some(json!({ "resetPassword": true })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_delete_user_removes_pastes_and_files() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let alice = app.user_token("alice").await;

    let (status, _) = app
        .multipart(&alice, &[("name", "notes")], Some(("notes.txt", b"alice's file")))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, created) = app.create_text(&alice, json!({ "content": "hi" })).await;
    let text_id = created["paste"]["id"].as_str().unwrap().to_string();
    assert_eq!(app.stored_files(), 1);

    let (_, users) = app.json("GET", "/api/admin/users", Some(&admin), None).await;
    let users = users.as_array().unwrap().clone();
    let alice_row = users.iter().find(|u| u["username"] == "alice").unwrap();
    assert_eq!(alice_row["paste_count"], 2);
    let alice_id = alice_row["id"].as_str().unwrap().to_string();
    let admin_id = users.iter().find(|u| u["username"] == "admin").unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    let (status, body) = app
        .json("DELETE", &format!("/api/admin/users/{}", admin_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Cannot delete yourself");

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/users/{}", alice_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.stored_files(), 0);

    let (status, _) = app
        .json("GET", &format!("/api/pastes/{}", text_id), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // An outstanding session for the deleted account no longer works
    let (status, body) = app.create_text(&alice, json!({ "content": "ghost" })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid or expired token");

    let (status, _) = app
        .json("DELETE", &format!("/api/admin/users/{}", alice_id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_homepage_modes() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let alice = app.user_token("alice").await;
    app.create_text(&alice, json!({ "content": "one" })).await;

    let (status, body) = app.json("GET", "/api/homepage", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"], "user_list");
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["username"], "alice");
    assert_eq!(users[0]["paste_count"], 1);

    let (status, _) = app
        .json(
            "PUT",
            "/api/admin/settings",
            Some(&admin),
            Some(json!({ "homepage_type": "user_page", "homepage_user": "alice" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json("GET", "/api/homepage", None, None).await;
    assert_eq!(body, json!({ "type": "redirect", "username": "alice" }));
}

#[tokio::test]
async fn test_user_page() {
    let app = spawn_app().await;
    let alice = app.user_token("alice").await;
    app.create_text(&alice, json!({ "name": "open", "content": "public" }))
        .await;
    app.create_text(
        &alice,
        json!({ "name": "locked", "content": "private", "passwordOption": "random" }),
    )
    .await;

    let (status, body) = app.json("GET", "/api/users/alice", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "alice");
    let pastes = body["pastes"].as_array().unwrap();
    assert_eq!(pastes.len(), 2);
    assert!(pastes.iter().all(|p| p.get("content").is_none()));
    let locked = pastes.iter().find(|p| p["name"] == "locked").unwrap();
    assert_eq!(locked["has_password"], true);

    let (status, body) = app.json("GET", "/api/users/nobody", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");

    let (status, body) = app
        .json("POST", "/api/users/nobody/unlock", None, Some(json!({ "password": "x" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn test_health_and_request_id() {
    let app = spawn_app().await;

    let response = app
        .send(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "trace-me-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "trace-me-42");

    let body = common::read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");
    assert_eq!(body["storage"], "available");

    let response = app
        .send(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await;
    let minted = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(minted).is_ok());
}

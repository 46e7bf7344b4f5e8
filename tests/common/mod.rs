#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{Request, StatusCode},
    response::Response,
};
use http_body_util::BodyExt;
use pastebin_backend::config::AppConfig;
use pastebin_backend::infrastructure::{database::run_migrations, seed};
use pastebin_backend::services::storage::{LocalStorageService, StorageService};
use pastebin_backend::{AppState, create_app};
use sea_orm::{Database, DatabaseConnection};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration_test_secret";
pub const BOUNDARY: &str = "----pastebin-test-boundary-7f3a";

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub db: DatabaseConnection,
    pub admin_password: String,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub fn storage_root(&self) -> &Path {
        self.upload_dir.path()
    }

    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn send(&self, req: Request<Body>) -> Response {
        self.app.clone().oneshot(req).await.unwrap()
    }

    /// Sends a JSON request and returns the status with the parsed body
    /// (`Value::Null` for an empty or non-JSON body).
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.send(req).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn multipart(
        &self,
        token: &str,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
    ) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/pastes")
            .header("Authorization", format!("Bearer {}", token))
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, file)))
            .unwrap();
        let response = self.send(req).await;
        let status = response.status();
        (status, read_json(response).await)
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                Some(serde_json::json!({
                    "username": "admin",
                    "password": self.admin_password,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers `username` through a fresh invite code and returns a session
    /// token for it.
    pub async fn user_token(&self, username: &str) -> String {
        let admin = self.admin_token().await;
        let (_, invite) = self
            .json("POST", "/api/admin/invite-codes", Some(&admin), None)
            .await;
        let code = invite["code"].as_str().unwrap().to_string();

        let (status, body) = self
            .json(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "password": "user-pass",
                    "inviteCode": code,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "register failed: {}", body);

        let (status, body) = self
            .json(
                "POST",
                &format!("/api/users/{}/unlock", username),
                None,
                Some(serde_json::json!({ "password": "user-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "unlock failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Posts a password to `/verify` as if it came from the socket peer
    /// `peer`, optionally carrying an `x-forwarded-for` header.
    pub async fn verify_from(
        &self,
        paste_id: &str,
        password: &str,
        peer: &str,
        forwarded_for: Option<&str>,
    ) -> StatusCode {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/api/pastes/{}/verify", paste_id))
            .header("Content-Type", "application/json");
        if let Some(forwarded) = forwarded_for {
            builder = builder.header("x-forwarded-for", forwarded);
        }
        let mut req = builder
            .body(Body::from(
                serde_json::json!({ "password": password }).to_string(),
            ))
            .unwrap();
        let peer: SocketAddr = peer.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(peer));
        self.send(req).await.status()
    }

    pub async fn create_text(&self, token: &str, body: Value) -> (StatusCode, Value) {
        self.json("POST", "/api/pastes", Some(token), Some(body)).await
    }
}

pub async fn read_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn read_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn setup_db() -> (DatabaseConnection, String) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    run_migrations(&db).await.unwrap();
    seed::seed_default_settings(&db).await.unwrap();
    let admin_password = seed::bootstrap_admin(&db).await.unwrap().unwrap();
    (db, admin_password)
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: JWT_SECRET.to_string(),
        verify_max_attempts: 3,
        verify_max_attempts_per_paste: 6,
        ..AppConfig::development()
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_config()).await
}

pub async fn spawn_app_with(config: AppConfig) -> TestApp {
    let (db, admin_password) = setup_db().await;
    let upload_dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageService> = Arc::new(LocalStorageService::new(upload_dir.path()));

    let state = AppState::new(db.clone(), storage, config);
    let app = create_app(state.clone());

    TestApp {
        app,
        state,
        db,
        admin_password,
        upload_dir,
    }
}

#![allow(dead_code)]

use std::sync::Arc;

use auth::Authenticator;
use auth::PasswordHasher;
use chrono::Duration;
use identity_service::domain::identity::service::IdentityService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories::FileIdentityRepository;
use serde_json::json;
use serde_json::Value;
use tempfile::TempDir;

pub const SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";

/// Test application that spawns a real server on the file-backed store
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub data_dir: TempDir,
    pub api_client: reqwest::Client,
    pub authenticator: Arc<Authenticator>,
}

/// Session returned by a successful login or refresh
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Option<String>,
    pub token: String,
    pub refresh_token: String,
}

impl TestApp {
    /// Spawn the application in a background task with default token lifetimes
    pub async fn spawn() -> Self {
        Self::spawn_with_ttls(Duration::hours(1), Duration::hours(24)).await
    }

    /// Spawn the application with explicit access and refresh token lifetimes
    pub async fn spawn_with_ttls(access_ttl: Duration, refresh_ttl: Duration) -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp dir");

        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(
            FileIdentityRepository::open(data_dir.path().join("identity.users"))
                .await
                .expect("Failed to open users file"),
        );

        // Cheap Argon2 parameters keep the suite fast
        let authenticator = Arc::new(Authenticator::with_hasher(
            PasswordHasher::with_params(1024, 1, 1).expect("Invalid Argon2 parameters"),
            SECRET,
            access_ttl,
        ));

        let identity_service = Arc::new(IdentityService::new(
            repository,
            Arc::clone(&authenticator),
            refresh_ttl,
        ));

        let router = create_router(identity_service);

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            data_dir,
            api_client: reqwest::Client::new(),
            authenticator,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make PUT request with Bearer token
    pub fn put_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client
            .put(&format!("{}{}", self.address, path))
            .bearer_auth(token)
    }

    pub async fn register(&self, login: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/register")
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, login: &str, password: &str) -> reqwest::Response {
        self.post("/api/auth/login")
            .json(&json!({ "login": login, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post("/api/auth/token/refresh")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn logout(&self, refresh_token: &str) -> reqwest::Response {
        self.post("/api/auth/logout")
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register and return the subject id
    pub async fn register_user(&self, login: &str, password: &str) -> String {
        let response = self.register(login, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Failed to parse response");
        body["data"]["user_id"]
            .as_str()
            .expect("Missing user_id")
            .to_string()
    }

    /// Log in and return the session
    pub async fn login_user(&self, login: &str, password: &str) -> Session {
        let response = self.login(login, password).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        session_from(response).await
    }
}

pub async fn session_from(response: reqwest::Response) -> Session {
    let body: Value = response.json().await.expect("Failed to parse response");
    let data = &body["data"];
    Session {
        user_id: data["user_id"].as_str().map(str::to_string),
        token: data["token"].as_str().expect("Missing token").to_string(),
        refresh_token: data["refresh_token"]
            .as_str()
            .expect("Missing refresh_token")
            .to_string(),
    }
}

//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tubehub::error::AppError;
use tubehub::storage::{DurationReader, MediaStore, MediaUpload, StoredMedia};
use tubehub::{AppState, config};

/// Media store that keeps objects in memory
#[derive(Default)]
pub struct InMemoryMediaStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryMediaStore {
    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl MediaStore for InMemoryMediaStore {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredMedia, AppError> {
        self.objects.lock().unwrap().insert(key.to_string(), data);
        Ok(StoredMedia {
            key: key.to_string(),
            url: format!("https://media.test.example.com/{}", key),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Reports the same duration for every upload
pub struct FixedDuration(pub f64);

#[async_trait]
impl DurationReader for FixedDuration {
    async fn duration(&self, _video: &MediaUpload) -> Result<f64, AppError> {
        Ok(self.0)
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub media: Arc<InMemoryMediaStore>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A registered, logged-in user
pub struct TestUser {
    pub id: String,
    pub user_name: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            cors_origin: None,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        storage: config::StorageConfig {
            media: config::MediaStorageConfig {
                bucket: "test-media".to_string(),
                public_url: "https://media.test.example.com".to_string(),
            },
        },
        cloudflare: config::CloudflareConfig {
            account_id: "test-account".to_string(),
            r2_access_key_id: "test-key".to_string(),
            r2_secret_access_key: "test-secret".to_string(),
        },
        auth: config::AuthConfig {
            access_token_secret: "test-access-secret-32-bytes-long!!".to_string(),
            access_token_ttl: 86_400,
            refresh_token_secret: "test-refresh-secret-32-bytes-long!".to_string(),
            refresh_token_ttl: 864_000,
        },
        uploads: config::UploadConfig {
            max_video_bytes: 1024 * 1024,
            max_image_bytes: 64 * 1024,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let media = Arc::new(InMemoryMediaStore::default());
        let state = AppState::with_backends(config, media.clone(), Arc::new(FixedDuration(12.5)))
            .await
            .unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tubehub::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            media,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// URL under `/api/v1`
    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.addr, path)
    }

    /// Register through the API and log in
    pub async fn register(&self, user_name: &str) -> TestUser {
        let response = self
            .client
            .post(self.api("/users/register"))
            .multipart(registration_form(user_name))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "register {}", user_name);
        let body: Value = response.json().await.unwrap();
        let id = body["data"]["_id"].as_str().unwrap().to_string();

        let (access_token, refresh_token) = self.login(user_name, "password123").await;

        TestUser {
            id,
            user_name: user_name.to_string(),
            access_token,
            refresh_token,
        }
    }

    pub async fn login(&self, user_name: &str, password: &str) -> (String, String) {
        let response = self
            .client
            .post(self.api("/users/login"))
            .json(&serde_json::json!({ "userName": user_name, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login {}", user_name);
        let body: Value = response.json().await.unwrap();

        (
            body["data"]["accessToken"].as_str().unwrap().to_string(),
            body["data"]["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    /// Publish a video through the API
    pub async fn publish_video(&self, user: &TestUser, title: &str) -> Value {
        let response = self
            .client
            .post(self.api("/videos"))
            .bearer_auth(&user.access_token)
            .multipart(video_form(title))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "publish {}", title);
        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }
}

pub fn png_part() -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G', 1, 2, 3])
        .file_name("image.png")
        .mime_str("image/png")
        .unwrap()
}

pub fn mp4_part() -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(vec![0, 0, 0, 24, b'f', b't', b'y', b'p'])
        .file_name("clip.mp4")
        .mime_str("video/mp4")
        .unwrap()
}

pub fn registration_form(user_name: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("fullName", format!("{} Test", user_name))
        .text("email", format!("{}@example.com", user_name))
        .text("userName", user_name.to_string())
        .text("password", "password123")
        .part("avatar", png_part())
}

pub fn video_form(title: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("description", format!("About {}", title))
        .part("videoFile", mp4_part())
        .part("thumbnail", png_part())
}

//! Test helper module for fleet-service integration tests.
//!
//! Spawns the HTTP application on a random port with the in-memory store
//! and a temporary document directory.

#![allow(dead_code)]

use fleet_service::config::{BootstrapAdmin, FleetConfig, StorageConfig, StoreBackend};
use fleet_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::Config;
use tempfile::TempDir;

pub const ROOT_USERNAME: &str = "root";
pub const ROOT_PASSWORD: &str = "Lkw-Flotte-2024";

/// Test application with running HTTP server.
pub struct TestApp {
    pub address: String,
    /// Token of the bootstrap superuser.
    pub token: String,
    client: reqwest::Client,
    storage: TempDir,
}

impl TestApp {
    /// Spawn the application with an empty store and log in as superuser.
    pub async fn spawn() -> Self {
        let storage = TempDir::new().expect("Failed to create storage dir");
        let config = FleetConfig {
            common: Config { port: 0 },
            service_name: "fleet-service-test".to_string(),
            log_level: "error".to_string(),
            otlp_endpoint: None,
            store: StoreBackend::Memory,
            database: None,
            storage: StorageConfig {
                local_path: storage.path().to_string_lossy().into_owned(),
            },
            bootstrap_admin: Some(BootstrapAdmin {
                username: ROOT_USERNAME.to_string(),
                password: ROOT_PASSWORD.to_string(),
            }),
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build application");
        let address = format!("http://127.0.0.1:{}", app.port());
        tokio::spawn(app.run_until_stopped());

        let client = reqwest::Client::new();
        let mut test_app = Self {
            address,
            token: String::new(),
            client,
            storage,
        };
        test_app.token = test_app.login(ROOT_USERNAME, ROOT_PASSWORD).await;
        test_app
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Directory backing the document storage.
    pub fn storage_path(&self) -> &std::path::Path {
        self.storage.path()
    }

    /// Upload `data` as the single file field of a multipart PUT.
    pub async fn upload(&self, path: &str, file_name: &str, data: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.client
            .put(self.url(path))
            .header("x-admin-token", &self.token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Log in and return the token, panicking on failure.
    pub async fn login(&self, username: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), 200, "login failed for {}", username);
        let body: Value = response.json().await.expect("Failed to parse response");
        body["token"].as_str().expect("token missing").to_string()
    }

    pub async fn get_as(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("x-admin-token", token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_as(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("x-admin-token", token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn patch_as(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .header("x-admin-token", token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete_as(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("x-admin-token", token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.get_as(&self.token, path).await
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.post_as(&self.token, path, body).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> reqwest::Response {
        self.patch_as(&self.token, path, body).await
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.delete_as(&self.token, path).await
    }

    /// Create an owning firm and return its id.
    pub async fn create_own_firm(&self, name: &str) -> i64 {
        let response = self
            .post(
                "/own-firms",
                json!({
                    "name": name,
                    "address": "Hafenstraße 1, 20457 Hamburg",
                    "iban": "DE02120300000000202051",
                    "bank_name": "Hamburger Sparkasse"
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        id_of(response).await
    }

    /// Create a customer of the given firm and return its id.
    pub async fn create_customer(&self, own_firm_id: i64, name: &str) -> i64 {
        let response = self
            .post(
                "/customers",
                json!({ "own_firm_id": own_firm_id, "name": name }),
            )
            .await;
        assert_eq!(response.status(), 201);
        id_of(response).await
    }

    /// Create a non-superuser admin with access to the given firms and
    /// return its token.
    pub async fn create_admin(&self, username: &str, own_firm_ids: &[i64]) -> String {
        let password = "Tourplan#2024!";
        let response = self
            .post(
                "/admins",
                json!({
                    "username": username,
                    "name": username,
                    "password": password,
                    "own_firm_ids": own_firm_ids
                }),
            )
            .await;
        assert_eq!(response.status(), 201);
        self.login(username, password).await
    }

    /// Audit messages of a firm, newest first.
    pub async fn audit_messages(&self, own_firm_id: i64) -> Vec<String> {
        let response = self
            .get(&format!(
                "/audit-log?own_firm_id={}",
                own_firm_id
            ))
            .await;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.expect("Failed to parse response");
        body.as_array()
            .expect("audit log is not a list")
            .iter()
            .map(|e| e["message"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

pub async fn id_of(response: reqwest::Response) -> i64 {
    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("id missing")
}

pub async fn error_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.expect("Failed to parse response");
    body["error"].as_str().unwrap_or_default().to_string()
}

//! Shared fixtures for the HTTP tests.

#![allow(dead_code)]

use admissions::{
    build_router, AdmissionsConfig, AdmissionsConfigManager, AdmissionsDb, AppState, AuthService,
    LogMailer,
};
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::json;
use std::sync::Arc;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-characters-long";
pub const PASSWORD: &str = "correct horse battery";

pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<AdmissionsDb>,
    pub mailer: Arc<LogMailer>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AdmissionsConfig::default()).await
    }

    pub async fn with_config(config: AdmissionsConfig) -> Self {
        let auth = AuthService::new(
            TEST_SECRET.to_string(),
            config.auth.access_token_expiry,
            config.auth.reset_token_expiry,
        );
        let db = Arc::new(AdmissionsDb::new_memory().await.expect("in-memory db"));
        let mailer = Arc::new(LogMailer::new());

        let state = AppState {
            config_manager: Arc::new(AdmissionsConfigManager::from_config(config)),
            db: db.clone(),
            auth_service: Arc::new(auth),
            mailer: mailer.clone(),
        };

        let server = TestServer::new(build_router(state)).expect("Failed to create test server");
        Self { server, db, mailer }
    }

    pub async fn register_response(&self, email: &str, role: &str) -> TestResponse {
        self.server
            .post("/api/register")
            .json(&json!({
                "name": "Asha Rao",
                "email": email,
                "contact": "9876543210",
                "campus": "Pilani",
                "password": PASSWORD,
                "confirmPassword": PASSWORD,
                "role": role
            }))
            .await
    }

    /// Registers an account and returns its session token.
    pub async fn register(&self, email: &str, role: &str) -> String {
        let response = self.register_response(email, role).await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["token"].as_str().expect("token in body").to_string()
    }

    pub async fn upload(&self, token: &str, table: &str, csv: &str) -> TestResponse {
        self.server
            .post(&format!("/update/{}", table))
            .add_header("Authorization", bearer(token))
            .multipart(csv_form(csv))
            .await
    }

    pub async fn get(&self, token: &str, path: &str) -> serde_json::Value {
        let response = self
            .server
            .get(path)
            .add_header("Authorization", bearer(token))
            .await;
        response.assert_status_ok();
        response.json()
    }
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn csv_form(csv: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(csv.as_bytes().to_vec())
            .file_name("upload.csv")
            .mime_type("text/csv"),
    )
}

pub const MASTER_CSV: &str = "app_no,name,gender,email,contact\n\
    A1,Asha,F,asha@example.com,111\n\
    A2,Ravi,M,ravi@example.com,222\n\
    A3,Meera,F,meera@example.com,333\n";

pub const ITERATION_1_CSV: &str = "app_no,itr_no,offer,scholarship,status\n\
    A1,1,CS,,accept\n\
    A2,1,WL,,\n\
    A3,1,EE,10%,\n";

pub const FEES_CSV: &str = "app_no,admission_fees_amount,admission_fees_status,admission_fees_paid_date,\
    tution_fees_amount,tution_fees_status,tution_fees_paid_date\n\
    A1,5000,1,2024-06-01,90000,1,2024-06-02\n\
    A2,5000,1,2024-06-01,90000,0,\n\
    A3,5000,0,,90000,0,\n";

pub const ITERATION_2_CSV: &str = "app_no,itr_no,offer,scholarship,status\n\
    A1,2,EE,,\n\
    A2,2,CS,,\n";

/// Status of `app_no` in an `/api/iterations` listing.
pub fn status_of(rows: &serde_json::Value, app_no: &str) -> Option<String> {
    rows.as_array()?
        .iter()
        .find(|row| row["app_no"] == app_no)
        .and_then(|row| row["status"].as_str())
        .map(str::to_string)
}

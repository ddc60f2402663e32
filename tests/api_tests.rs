mod common;

use admissions::AdmissionsConfig;
use axum::http::StatusCode;
use common::{
    bearer, csv_form, status_of, TestApp, FEES_CSV, ITERATION_1_CSV, ITERATION_2_CSV, MASTER_CSV,
    PASSWORD,
};
use serde_json::json;

// ============= Health & Docs =============

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new().await;
    let response = app.server.get("/health").await;

    response.assert_status_ok();
    response.assert_text("OK");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let app = TestApp::new().await;
    let response = app.server.get("/api-docs/openapi.json").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert!(body["paths"]["/update/{table}"].is_object());
    assert!(body["paths"]["/api/withdraw/student"].is_object());
}

// ============= Registration & Login =============

#[tokio::test]
async fn test_register_sets_session_cookie() {
    let app = TestApp::new().await;
    let response = app.register_response("asha@example.edu", "admin").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "User registered successfully.");
    assert!(!body["token"].as_str().unwrap().is_empty());

    let cookie = response.cookie("token");
    assert_eq!(cookie.value(), body["token"].as_str().unwrap());
    assert_eq!(cookie.http_only(), Some(true));
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new().await;

    let response = app
        .server
        .post("/api/register")
        .json(&json!({ "email": "a@example.edu", "password": "x" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "All fields are required.");

    let response = app
        .server
        .post("/api/register")
        .json(&json!({
            "name": "A", "email": "a@example.edu", "contact": "1", "campus": "Pilani",
            "password": "one", "confirmPassword": "two"
        }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Passwords do not match.");

    let response = app
        .server
        .post("/api/register")
        .json(&json!({
            "name": "A", "email": "a@example.edu", "contact": "1", "campus": "Mars",
            "password": "one", "confirmPassword": "one"
        }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Invalid campus selection.");

    let response = app.register_response("a@example.edu", "superuser").await;
    response.assert_status_bad_request();
    assert!(response.json::<serde_json::Value>()["detail"]
        .as_str()
        .unwrap()
        .starts_with("Invalid role."));
}

#[tokio::test]
async fn test_register_duplicate_user() {
    let app = TestApp::new().await;
    app.register("dup@example.edu", "view").await;

    let response = app.register_response("dup@example.edu", "view").await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "User already exists.");
}

#[tokio::test]
async fn test_login_and_current_user() {
    let app = TestApp::new().await;
    app.register("login@example.edu", "view_and_withdraw").await;

    let response = app
        .server
        .post("/api/login")
        .json(&json!({ "email": "login@example.edu", "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Login successful.");

    let cookie = response.cookie("token");
    let validate = app
        .server
        .get("/api/validate-token")
        .add_cookie(cookie.clone())
        .await;
    validate.assert_status_ok();
    validate.assert_json(&json!({ "valid": true }));

    let user = app.server.get("/api/user").add_cookie(cookie).await;
    user.assert_status_ok();
    user.assert_json(&json!({ "name": "Asha Rao", "role": "view_and_withdraw" }));
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new().await;
    app.register("wrong@example.edu", "view").await;

    let response = app
        .server
        .post("/api/login")
        .json(&json!({ "email": "wrong@example.edu", "password": "nope" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<serde_json::Value>()["detail"],
        "Invalid email or password."
    );

    let response = app
        .server
        .post("/api/login")
        .json(&json!({ "email": "wrong@example.edu" }))
        .await;
    response.assert_status_bad_request();
    assert_eq!(
        response.json::<serde_json::Value>()["detail"],
        "Email and password required."
    );
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = TestApp::new().await;

    for path in ["/api/validate-token", "/api/user", "/api/stats", "/data/MASTER_TABLE"] {
        let response = app.server.get(path).await;
        response.assert_status_unauthorized();
        assert_eq!(response.json::<serde_json::Value>()["detail"], "Unauthorized");
    }

    let response = app
        .server
        .get("/api/validate-token")
        .add_header("Authorization", bearer("not-a-jwt"))
        .await;
    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = TestApp::new().await;
    let response = app.server.post("/api/logout").await;

    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Logged out" }));
    assert_eq!(response.cookie("token").value(), "");
}

// ============= Password Reset =============

fn token_from_mail(html: &str) -> String {
    let start = html.find("token=").expect("reset link in mail") + "token=".len();
    html[start..]
        .chars()
        .take_while(|c| *c != '"')
        .collect()
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::new().await;
    app.register("reset@example.edu", "view").await;

    let response = app
        .server
        .post("/api/forgot-password")
        .json(&json!({ "email": "reset@example.edu" }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Password reset email sent successfully." }));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "reset@example.edu");
    let token = token_from_mail(&sent[0].html);

    let response = app
        .server
        .post("/api/reset-password")
        .form(&[("token", token.as_str()), ("new_password", "a brand new secret")])
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Password has been reset successfully." }));

    app.server
        .post("/api/login")
        .json(&json!({ "email": "reset@example.edu", "password": "a brand new secret" }))
        .await
        .assert_status_ok();

    // single use
    let reused = app
        .server
        .post("/api/reset-password")
        .form(&[("token", token.as_str()), ("new_password", "again")])
        .await;
    reused.assert_status_bad_request();
    assert_eq!(
        reused.json::<serde_json::Value>()["detail"],
        "Reset token has already been used."
    );
}

#[tokio::test]
async fn test_reset_rejects_wrong_tokens() {
    let app = TestApp::new().await;
    let access_token = app.register("kind@example.edu", "view").await;

    let response = app
        .server
        .post("/api/reset-password")
        .form(&[("token", access_token.as_str()), ("new_password", "x")])
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Invalid token type.");

    let response = app
        .server
        .post("/api/reset-password")
        .form(&[("token", "garbage"), ("new_password", "x")])
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Invalid reset token.");
}

#[tokio::test]
async fn test_forgot_password_unknown_user() {
    let app = TestApp::new().await;
    let response = app
        .server
        .post("/api/forgot-password")
        .json(&json!({ "email": "ghost@example.edu" }))
        .await;

    response.assert_status_not_found();
    assert!(app.mailer.sent().is_empty());
}

// ============= Uploads & Reconciliation =============

#[tokio::test]
async fn test_upload_requires_admin() {
    let app = TestApp::new().await;
    let token = app.register("viewer@example.edu", "view").await;

    let response = app.upload(&token, "MASTER_TABLE", MASTER_CSV).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<serde_json::Value>()["detail"],
        "Your role does not permit this action."
    );
}

#[tokio::test]
async fn test_upload_rejects_unknown_and_read_only_tables() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    let response = app.upload(&token, "users", "id\n1\n").await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Table users does not exist.");

    let response = app.upload(&token, "LOGS", "id\n1\n").await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn test_upload_rejects_missing_columns() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    let response = app.upload(&token, "MASTER_TABLE", "app_no,name\nA1,Asha\n").await;
    response.assert_status_bad_request();
    let detail = response.json::<serde_json::Value>()["detail"].to_string();
    assert!(detail.contains("CSV must contain columns"));
    assert!(detail.contains("gender"));

    let data = app.get(&token, "/data/MASTER_TABLE").await;
    assert_eq!(data["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_upload_is_case_insensitive_and_upserts() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    let response = app.upload(&token, "master_table", MASTER_CSV).await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Data updated successfully in MASTER_TABLE!");
    assert_eq!(body["rows"], 3);

    app.upload(
        &token,
        "MASTER_TABLE",
        "app_no,name,gender,email,contact\nA1,Asha R,F,asha@example.com,999\n",
    )
    .await
    .assert_status_ok();

    let data = app.get(&token, "/data/MASTER_TABLE").await;
    let rows = data["data"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["name"], "Asha R");
    assert_eq!(rows[0]["contact"], "999");
}

#[tokio::test]
async fn test_fee_upload_reconciles_latest_iteration() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    app.upload(&token, "MASTER_TABLE", MASTER_CSV).await.assert_status_ok();
    app.upload(&token, "ITERATION_OFFER", ITERATION_1_CSV)
        .await
        .assert_status_ok();

    let response = app.upload(&token, "FEES_PAID", FEES_CSV).await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["reconciled"], 3);

    let offers = app.get(&token, "/api/iterations?iteration=1").await;
    assert_eq!(status_of(&offers, "A1").as_deref(), Some("accept"));
    assert_eq!(status_of(&offers, "A2").as_deref(), Some("upgrade"));
    assert_eq!(status_of(&offers, "A3").as_deref(), Some("withdraw"));

    let fees = app.get(&token, "/api/fees?query=A1").await;
    let fees = fees.as_array().unwrap();
    assert_eq!(fees.len(), 1);
    assert_eq!(fees[0]["admission_fees_status"], true);
    assert_eq!(fees[0]["admission_fees_uploaded_by"], "Asha Rao admin");
    assert!(fees[0]["tution_fees_upload_date_time"].is_string());

    let stats = app.get(&token, "/api/stats").await;
    assert_eq!(stats["totalApplications"], 3);
    assert_eq!(stats["acceptedStudents"], 1);
    assert_eq!(stats["latestIterationNumber"], 1);
    assert_eq!(stats["genderStats"], json!({ "F": 2, "M": 1 }));
}

#[tokio::test]
async fn test_new_iteration_marks_paid_applicants_upgraded() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    app.upload(&token, "MASTER_TABLE", MASTER_CSV).await.assert_status_ok();
    app.upload(&token, "ITERATION_OFFER", ITERATION_1_CSV)
        .await
        .assert_status_ok();
    app.upload(&token, "FEES_PAID", FEES_CSV).await.assert_status_ok();

    let response = app.upload(&token, "ITERATION_OFFER", ITERATION_2_CSV).await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["reconciled"], 1);

    let offers = app.get(&token, "/api/iterations?iteration=2").await;
    assert_eq!(status_of(&offers, "A1").as_deref(), Some("accept & upgraded"));
    assert_eq!(status_of(&offers, "A2"), None);

    let count = app.get(&token, "/api/iteration-count").await;
    assert_eq!(count, json!({ "count": 2 }));

    let stats = app.get(&token, "/api/stats").await;
    assert_eq!(stats["latestIterationNumber"], 2);
    assert_eq!(stats["acceptedStudents"], 1);
}

#[tokio::test]
async fn test_students_search() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;
    app.upload(&token, "MASTER_TABLE", MASTER_CSV).await.assert_status_ok();
    app.upload(&token, "ITERATION_OFFER", ITERATION_1_CSV)
        .await
        .assert_status_ok();

    let found = app.get(&token, "/api/students?query=mee").await;
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["app_no"], "A3");
    assert_eq!(found[0]["offer"], "EE");

    let none = app.get(&token, "/api/students?query=zzz").await;
    assert_eq!(none, json!({ "message": "No students found." }));

    let none = app.get(&token, "/api/iterations?iteration=7").await;
    assert_eq!(none, json!({ "message": "No data found for iteration 7." }));
}

#[tokio::test]
async fn test_data_endpoint_hides_accounts() {
    let app = TestApp::new().await;
    let token = app.register("admin@example.edu", "admin").await;

    let response = app
        .server
        .get("/data/users")
        .add_header("Authorization", bearer(&token))
        .await;
    response.assert_status_bad_request();
    assert_eq!(response.json::<serde_json::Value>()["detail"], "Table users does not exist.");
}

// ============= Withdrawals =============

async fn seeded_app() -> (TestApp, String) {
    let app = TestApp::new().await;
    let admin = app.register("admin@example.edu", "admin").await;
    app.upload(&admin, "MASTER_TABLE", MASTER_CSV).await.assert_status_ok();
    app.upload(&admin, "ITERATION_OFFER", ITERATION_1_CSV)
        .await
        .assert_status_ok();
    app.upload(&admin, "ITERATION_OFFER", ITERATION_2_CSV)
        .await
        .assert_status_ok();
    (app, admin)
}

#[tokio::test]
async fn test_withdraw_student() {
    let (app, admin) = seeded_app().await;
    let token = app.register("desk@example.edu", "view_and_withdraw").await;

    let response = app
        .server
        .post("/api/withdraw/student")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "app_no": " A2 " }))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({ "message": "Student A2 withdrawn successfully." }));

    let offers = app.get(&admin, "/api/iterations?iteration=2").await;
    assert_eq!(status_of(&offers, "A2").as_deref(), Some("withdraw"));

    // A3 has no offer in iteration 2
    let response = app
        .server
        .post("/api/withdraw/student")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "app_no": "A3" }))
        .await;
    response.assert_status_not_found();
    assert_eq!(
        response.json::<serde_json::Value>()["detail"],
        "No offer found for A3 in the latest iteration."
    );
}

#[tokio::test]
async fn test_view_role_cannot_withdraw() {
    let (app, _) = seeded_app().await;
    let token = app.register("viewer@example.edu", "view").await;

    let response = app
        .server
        .post("/api/withdraw/student")
        .add_header("Authorization", bearer(&token))
        .json(&json!({ "app_no": "A1" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bulk_withdraw_and_logs() {
    let (app, admin) = seeded_app().await;

    let response = app
        .server
        .post("/api/withdraw/upload")
        .add_header("Authorization", bearer(&admin))
        .multipart(csv_form("app_no\nA1\nA9\nA1\n"))
        .await;
    response.assert_status_ok();
    response.assert_json(&json!({
        "message": "Withdrew 1 applicant(s).",
        "withdrawn": 1,
        "missing": ["A9"]
    }));

    let logs = app.get(&admin, "/api/logs").await;
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 4);
    assert_eq!(logs[0]["category"], "WITHDRAW");
    assert_eq!(logs[0]["remark"], "Bulk withdrawal");
    assert_eq!(logs[0]["file_name"], "upload.csv");
    assert_eq!(logs[3]["category"], "MASTER_TABLE");
    assert_eq!(logs[3]["uploaded_by"], "Asha Rao admin");
}

#[tokio::test]
async fn test_logs_require_admin() {
    let app = TestApp::new().await;
    let admin = app.register("admin@example.edu", "admin").await;
    let viewer = app.register("viewer@example.edu", "view").await;
    let withdrawer = app.register("desk@example.edu", "view_and_withdraw").await;
    app.upload(&admin, "MASTER_TABLE", MASTER_CSV)
        .await
        .assert_status_ok();

    for token in [&viewer, &withdrawer] {
        for path in ["/api/logs", "/data/LOGS", "/data/logs"] {
            let response = app
                .server
                .get(path)
                .add_header("Authorization", bearer(token))
                .await;
            response.assert_status(StatusCode::FORBIDDEN);
        }
    }

    // other tables stay readable
    let data = app.get(&viewer, "/data/MASTER_TABLE").await;
    assert_eq!(data["data"].as_array().unwrap().len(), 3);

    let data = app.get(&admin, "/data/LOGS").await;
    let rows = data["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["uploaded_by"], "Asha Rao admin");
}

#[tokio::test]
async fn test_forwarded_for_is_logged_only_when_trusted() {
    for trusted in [false, true] {
        let mut config = AdmissionsConfig::default();
        config.server.trust_forwarded_for = trusted;
        let app = TestApp::with_config(config).await;
        let token = app.register("admin@example.edu", "admin").await;

        app.server
            .post("/update/MASTER_TABLE")
            .add_header("Authorization", bearer(&token))
            .add_header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .multipart(csv_form(MASTER_CSV))
            .await
            .assert_status_ok();

        let logs = app.get(&token, "/api/logs").await;
        let logged = logs[0]["ip_address"].as_str();
        if trusted {
            assert_eq!(logged, Some("203.0.113.9"));
        } else {
            assert_ne!(logged, Some("203.0.113.9"));
        }
    }
}

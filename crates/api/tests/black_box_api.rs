use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

use keystone_api::app::{AppServices, build_app};
use keystone_auth::{JwtClaims, User, UserRole, hash_password};
use keystone_core::UserId;
use keystone_infra::{
    AppConfig, InMemorySessionStore, InMemoryUserStore, MemoryMailer, UserStore,
};

const JWT_SECRET: &str = "test-secret";
const ADMIN_EMAIL: &str = "admin@example.com";
const PASSWORD: &str = "Passw0rd!";

struct TestServer {
    base_url: String,
    users: Arc<InMemoryUserStore>,
    mailer: Arc<MemoryMailer>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Same router as prod over in-memory stores, seeded with one admin, bound
    /// to an ephemeral port.
    async fn spawn() -> Self {
        let config = AppConfig {
            jwt_secret: JWT_SECRET.to_string(),
            bcrypt_cost: 4,
            app_url: "http://app.test".to_string(),
            ..AppConfig::default()
        };

        let users = Arc::new(InMemoryUserStore::new());
        let admin = User::new(
            ADMIN_EMAIL,
            Some("Admin".to_string()),
            Some(hash_password(PASSWORD, 4).unwrap()),
            UserRole::Admin,
            None,
            Utc::now(),
        );
        users.insert(admin).await.unwrap();

        let mailer = Arc::new(MemoryMailer::new());
        let services = AppServices::new(
            config,
            users.clone(),
            Arc::new(InMemorySessionStore::new()),
            mailer.clone(),
        );
        let app = build_app(Arc::new(services));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            users,
            mailer,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: UserId, email: &str, role: UserRole, ttl: ChronoDuration) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        email: email.to_string(),
        role,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn register(client: &reqwest::Client, srv: &TestServer, email: &str) -> Value {
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

async fn login(client: &reqwest::Client, srv: &TestServer, email: &str, password: &str) -> String {
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

async fn request_reset_token(client: &reqwest::Client, srv: &TestServer, email: &str) -> String {
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": email }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let sent = srv.mailer.sent();
    let last = sent.last().expect("no reset mail sent");
    last.reset_url
        .strip_prefix("http://app.test/auth/reset-password?token=")
        .unwrap()
        .to_string()
}

async fn session_client(srv: &TestServer, email: &str) -> reqwest::Client {
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();
    let res = client
        .post(srv.url("/auth/session"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    client
}

async fn is_authenticated(client: &reqwest::Client, srv: &TestServer) -> bool {
    let res = client.get(srv.url("/auth/session")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    body["isAuthenticated"].as_bool().unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;

    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/users", "/users/me", "/auth/profile"] {
        let res = client.get(srv.url(path)).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{path}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["statusCode"], 401);
    }

    let res = client
        .get(srv.url("/users/me"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(
        UserId::new(),
        "x@example.com",
        UserRole::Admin,
        ChronoDuration::seconds(-120),
    );

    let res = reqwest::Client::new()
        .get(srv.url("/auth/profile"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_then_login_returns_signed_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let user = register(&client, &srv, "jane@example.com").await;
    assert_eq!(user["email"], "jane@example.com");
    assert_eq!(user["name"], "jane");
    assert_eq!(user["role"], "USER");
    assert!(user.get("password").is_none());
    assert!(user.get("resetToken").is_none());

    let token = login(&client, &srv, "jane@example.com", PASSWORD).await;
    let res = client
        .get(srv.url("/auth/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["userId"], user["id"]);
    assert_eq!(profile["role"], "USER");
}

#[tokio::test]
async fn register_validates_and_rejects_duplicates() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "bad", "password": "weak" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    let messages = body["message"].as_array().unwrap();
    assert!(messages.iter().any(|m| m == "Please provide a valid email address"));
    assert!(messages.len() > 1);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "a@example.com", "password": PASSWORD, "isAdmin": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    register(&client, &srv, "dup@example.com").await;
    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "dup@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User with this email already exists");
}

#[tokio::test]
async fn bad_credentials_are_unauthorized() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@example.com").await;

    for (email, password) in [("jane@example.com", "Wr0ng!pass"), ("nobody@example.com", PASSWORD)] {
        let res = client
            .post(srv.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["message"], "Invalid email or password");
    }
}

#[tokio::test]
async fn non_admin_cannot_list_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@example.com").await;
    let token = login(&client, &srv, "jane@example.com", PASSWORD).await;

    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        "User with role USER does not have access to this route. Required roles: ADMIN"
    );
}

#[tokio::test]
async fn admin_lists_users_with_pagination() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    for i in 0..4 {
        register(&client, &srv, &format!("user{i}@example.com")).await;
    }
    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;

    let res = client
        .get(srv.url("/users?page=2&limit=2"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
    assert_eq!(body["meta"], json!({ "total": 5, "page": 2, "pageSize": 2, "totalPages": 3 }));

    let res = client
        .get(srv.url("/users?page=0&limit=1000"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["meta"]["page"], 1);
    assert_eq!(body["meta"]["pageSize"], 100);
}

#[tokio::test]
async fn admin_creates_and_deletes_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "ops@example.com", "password": PASSWORD, "role": "ADMIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    assert_eq!(created["role"], "ADMIN");
    assert_eq!(created["name"], "ops");
    let id = created["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "ops@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], format!("User with ID {id} not found"));
}

#[tokio::test]
async fn users_only_see_themselves() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let jane = register(&client, &srv, "jane@example.com").await;
    let john = register(&client, &srv, "john@example.com").await;
    let token = login(&client, &srv, "jane@example.com", PASSWORD).await;

    let res = client
        .get(srv.url(&format!("/users/{}", jane["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/users/{}", john["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "You are not authorized to view this user");

    // Ownership is checked before the lookup; unknown ids look the same.
    let missing = UserId::new();
    let res = client
        .get(srv.url(&format!("/users/{missing}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;
    let res = client
        .get(srv.url(&format!("/users/{missing}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn me_rejects_tokens_of_deleted_users() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let token = mint_jwt(UserId::new(), "ghost@example.com", UserRole::User, ChronoDuration::minutes(10));
    let res = client
        .get(srv.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "User account not found");
}

#[tokio::test]
async fn profile_updates_follow_ownership_and_role_rules() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let jane = register(&client, &srv, "jane@example.com").await;
    let john = register(&client, &srv, "john@example.com").await;
    let jane_id = jane["id"].as_str().unwrap();
    let token = login(&client, &srv, "jane@example.com", PASSWORD).await;

    let res = client
        .patch(srv.url(&format!("/users/{}", john["id"].as_str().unwrap())))
        .bearer_auth(&token)
        .json(&json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "You can only update your own profile");

    let res = client
        .patch(srv.url(&format!("/users/{jane_id}")))
        .bearer_auth(&token)
        .json(&json!({ "role": "ADMIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Only administrators can update user roles");

    let res = client
        .patch(srv.url(&format!("/users/{jane_id}")))
        .bearer_auth(&token)
        .json(&json!({ "name": "Jane Doe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Jane Doe");

    let res = client
        .patch(srv.url(&format!("/users/{jane_id}")))
        .bearer_auth(&token)
        .json(&json!({ "email": "john@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;
    let res = client
        .patch(srv.url(&format!("/users/{jane_id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "ADMIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "ADMIN");
}

#[tokio::test]
async fn password_change_requires_current_password() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let jane = register(&client, &srv, "jane@example.com").await;
    let path = format!("/users/{}", jane["id"].as_str().unwrap());
    let token = login(&client, &srv, "jane@example.com", PASSWORD).await;
    let new_password = "N3w!Password";

    let res = client
        .patch(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "password": new_password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .patch(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "password": new_password, "currentPassword": "Wr0ng!pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Current password is incorrect");

    let res = client
        .patch(srv.url(&path))
        .bearer_auth(&token)
        .json(&json!({ "password": new_password, "currentPassword": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    login(&client, &srv, "jane@example.com", new_password).await;
}

#[tokio::test]
async fn password_reset_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@example.com").await;

    // Unknown addresses get the same answer and no mail.
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "nobody@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(srv.mailer.sent().is_empty());

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "jane@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body["message"],
        "If an account exists with this email, you will receive a password reset link"
    );

    let sent = srv.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@example.com");
    let token = sent[0]
        .reset_url
        .strip_prefix("http://app.test/auth/reset-password?token=")
        .unwrap()
        .to_string();

    let res = client
        .get(srv.url("/auth/validate-reset-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "valid": false, "error": "Token is required" }));

    let res = client
        .get(srv.url(&format!("/auth/validate-reset-token?token={token}")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], true);

    let new_password = "Res3t!Password";
    let res = client
        .post(srv.url("/auth/reset-password"))
        .json(&json!({ "token": token, "password": new_password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The token is single use.
    let res = client
        .post(srv.url("/auth/reset-password"))
        .json(&json!({ "token": token, "password": new_password }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    login(&client, &srv, "jane@example.com", new_password).await;
}

#[tokio::test]
async fn forgot_password_requires_email() {
    let srv = TestServer::spawn().await;

    let res = reqwest::Client::new()
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn session_cookie_flow() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .unwrap();
    register(&client, &srv, "jane@example.com").await;

    let res = client.get(srv.url("/auth/protected")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/session"))
        .json(&json!({ "email": "jane@example.com", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("keystone.session-token="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Max-Age=2592000"));
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "message": "Login successful" }));

    let res = client.get(srv.url("/auth/session")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["user"]["email"], "jane@example.com");

    let res = client.get(srv.url("/auth/protected")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "This is a protected route");

    let res = client.delete(srv.url("/auth/session")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client.get(srv.url("/auth/session")).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "isAuthenticated": false, "user": null }));
}

#[tokio::test]
async fn session_login_rejects_bad_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/session"))
        .json(&json!({ "email": ADMIN_EMAIL }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/session"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "Wr0ng!pass" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn self_registration_cannot_claim_admin() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "mallory@example.com", "password": PASSWORD, "role": "ADMIN" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["role"], "USER");

    let token = login(&client, &srv, "mallory@example.com", PASSWORD).await;
    let res = client
        .get(srv.url("/users"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_query_strings_use_the_json_error_shape() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/auth/validate-reset-token?token=a&token=b"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["error"], "Bad Request");
    assert!(body["message"].is_string());

    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;
    let res = client
        .get(srv.url("/users?page=1&page=2"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn unknown_or_expired_reset_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@example.com").await;

    let res = client
        .post(srv.url("/auth/reset-password"))
        .json(&json!({ "token": "deadbeef", "password": "Res3t!Password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired reset token");

    let token = request_reset_token(&client, &srv, "jane@example.com").await;
    let mut jane = srv.users.find_by_email("jane@example.com").await.unwrap().unwrap();
    jane.reset_token_expiry = Some(Utc::now() - ChronoDuration::minutes(1));
    srv.users.update(jane).await.unwrap();

    let res = client
        .get(srv.url(&format!("/auth/validate-reset-token?token={token}")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["valid"], false);

    let res = client
        .post(srv.url("/auth/reset-password"))
        .json(&json!({ "token": token, "password": "Res3t!Password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Invalid or expired reset token");

    login(&client, &srv, "jane@example.com", PASSWORD).await;
}

#[tokio::test]
async fn password_reset_signs_out_existing_sessions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@example.com").await;

    let browser = session_client(&srv, "jane@example.com").await;
    assert!(is_authenticated(&browser, &srv).await);

    let token = request_reset_token(&client, &srv, "jane@example.com").await;
    let res = client
        .post(srv.url("/auth/reset-password"))
        .json(&json!({ "token": token, "password": "Res3t!Password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    assert!(!is_authenticated(&browser, &srv).await);
    let res = browser.get(srv.url("/auth/protected")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deleting_a_user_ends_their_sessions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let jane = register(&client, &srv, "jane@example.com").await;
    let id = jane["id"].as_str().unwrap();

    let browser = session_client(&srv, "jane@example.com").await;
    assert!(is_authenticated(&browser, &srv).await);

    let admin = login(&client, &srv, ADMIN_EMAIL, PASSWORD).await;
    let res = client
        .delete(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    assert!(!is_authenticated(&browser, &srv).await);
}

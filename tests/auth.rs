use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{rt, test, web, App, HttpServer};
use dotenv::dotenv;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use tasknest::auth::{AuthMiddleware, Claims, TokenService};
use tasknest::routes::{self, health};

const TEST_SECRET: &str = "integration-test-secret";

// A pool that never connects: a bad bearer is rejected before any query
// runs, so rejection tests need no database.
fn lazy_pool() -> PgPool {
    PgPoolOptions::new()
        .connect_lazy("postgres://localhost/tasknest_unused")
        .expect("Failed to build lazy pool")
}

// Middleware rejections surface as service errors, which `test::call_service`
// cannot unwrap; run a real server and go through HTTP instead.
async fn spawn_app(pool: PgPool) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let server_pool = pool.clone();
    rt::spawn(async move {
        HttpServer::new(move || {
            App::new()
                .app_data(web::Data::new(server_pool.clone()))
                .app_data(web::Data::new(TokenService::new(TEST_SECRET)))
                .app_data(routes::json_config())
                .app_data(routes::path_config())
                .wrap(
                    Cors::default()
                        .allow_any_origin()
                        .allow_any_method()
                        .allow_any_header()
                        .max_age(3600),
                )
                .wrap(Logger::default())
                .service(health::health)
                .service(
                    web::scope("/api")
                        .wrap(AuthMiddleware)
                        .configure(routes::config),
                )
        })
        .bind(("127.0.0.1", port))
        .unwrap_or_else(|_| panic!("Failed to bind to port {}", port))
        .run()
        .await
    });

    // Give the server a moment to start
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;

    format!("http://127.0.0.1:{}", port)
}

#[actix_rt::test]
async fn test_auth_middleware_rejections() {
    let base_url = spawn_app(lazy_pool()).await;
    let client = reqwest::Client::new();

    // No Authorization header at all.
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Authorization token missing or malformed");

    // Wrong scheme.
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", "Token abc")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Authorization token missing or malformed");

    // Structurally invalid token.
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", "Bearer not-a-jwt")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");

    // Token two hours past expiry, signed with the right secret. (The
    // default validation allows 60 seconds of clock-skew leeway, so the
    // margin must be comfortably larger.)
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: 1,
        exp: (now - 2 * 60 * 60) as usize,
        iat: (now - 26 * 60 * 60) as usize,
    };
    let expired = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap();
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", format!("Bearer {}", expired))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Token expired");

    // Token signed with a different secret.
    let other = TokenService::new("a-completely-different-secret");
    let token = other.issue(1).unwrap();
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");

    // Health and logout stay reachable without a token.
    let resp = client
        .get(format!("{}/health", base_url))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let resp = client
        .post(format!("{}/api/auth/logout", base_url))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[actix_rt::test]
async fn test_invalid_registration_inputs() {
    // Validation runs before any query, so the lazy pool is never touched.
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(lazy_pool()))
            .app_data(web::Data::new(TokenService::new(TEST_SECRET)))
            .app_data(routes::json_config())
            .wrap(Logger::default())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let test_cases = vec![
        // Deserialization errors for missing fields
        (
            json!({ "email": "test@example.com", "password": "Password123!" }),
            "missing username",
        ),
        (
            json!({ "username": "testuser", "password": "Password123!" }),
            "missing email",
        ),
        (
            json!({ "username": "testuser", "email": "test@example.com" }),
            "missing password",
        ),
        // Validation errors for invalid formats/lengths
        (
            json!({ "username": "testuser", "email": "invalid-email", "password": "Password123!" }),
            "invalid email format",
        ),
        (
            json!({ "username": "u", "email": "test@example.com", "password": "Password123!" }),
            "username too short",
        ),
        (
            json!({ "username": "a".repeat(33), "email": "test@example.com", "password": "Password123!" }),
            "username too long",
        ),
        (
            json!({ "username": "user name!", "email": "test@example.com", "password": "Password123!" }),
            "username with invalid chars",
        ),
        (
            json!({ "username": "testuser", "email": "test@example.com", "password": "1234567" }),
            "password too short",
        ),
    ];

    for (payload, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body_bytes = test::read_body(resp).await;

        assert_eq!(
            status,
            actix_web::http::StatusCode::BAD_REQUEST,
            "Test case failed: {}. Got {}. Body: {:?}",
            description,
            status,
            String::from_utf8_lossy(&body_bytes)
        );
    }
}

#[actix_rt::test]
async fn test_invalid_login_inputs() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(lazy_pool()))
            .app_data(web::Data::new(TokenService::new(TEST_SECRET)))
            .app_data(routes::json_config())
            .wrap(Logger::default())
            .service(web::scope("/api").configure(routes::config)),
    )
    .await;

    let test_cases = vec![
        (json!({ "password": "Password123!" }), "missing username"),
        (json!({ "username": "testuser" }), "missing password"),
        (
            json!({ "username": "", "password": "Password123!" }),
            "empty username",
        ),
        (
            json!({ "username": "testuser", "password": "" }),
            "empty password",
        ),
    ];

    for (payload, description) in test_cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(&payload)
            .to_request();

        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body_bytes = test::read_body(resp).await;

        assert_eq!(
            status,
            actix_web::http::StatusCode::BAD_REQUEST,
            "Test case failed: {}. Got {}. Body: {:?}",
            description,
            status,
            String::from_utf8_lossy(&body_bytes)
        );
    }
}

// Needs a running Postgres with DATABASE_URL set.
#[ignore]
#[actix_rt::test]
async fn test_register_and_login_flow() {
    dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Clean up potential leftovers from earlier runs.
    let _ = sqlx::query("DELETE FROM users WHERE username IN ($1, $2)")
        .bind("integration_user")
        .bind("integration_user_2")
        .execute(&pool)
        .await;

    let base_url = spawn_app(pool.clone()).await;
    let client = reqwest::Client::new();

    // Register a new user.
    let register_payload = json!({
        "username": "integration_user",
        "email": "integration@example.com",
        "password": "Password123!"
    });
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&register_payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User registered successfully");

    // The same registration again must fail.
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&register_payload)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    // Same email under a different username must fail too.
    let resp = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "username": "integration_user_2",
            "email": "integration@example.com",
            "password": "Password123!"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());

    // Login with the registered user.
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({
            "username": "integration_user",
            "password": "Password123!"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let login_response: tasknest::auth::AuthResponse = resp.json().await.unwrap();
    assert!(!login_response.token.is_empty());
    assert_eq!(login_response.user.username, "integration_user");
    assert_eq!(login_response.user.email, "integration@example.com");

    // Wrong password and unknown user both come back as 401.
    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({
            "username": "integration_user",
            "password": "WrongPassword123!"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let resp = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({
            "username": "no_such_user",
            "password": "Password123!"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    // The issued token passes the auth middleware.
    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", format!("Bearer {}", login_response.token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // A still-valid token whose account is gone is rejected.
    let _ = sqlx::query("DELETE FROM users WHERE username = $1")
        .bind("integration_user")
        .execute(&pool)
        .await;

    let resp = client
        .get(format!("{}/api/tasks", base_url))
        .header("Authorization", format!("Bearer {}", login_response.token))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token (user not found)");
}

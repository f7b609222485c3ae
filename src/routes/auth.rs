use crate::{
    auth::{hash_password, verify_password, AuthResponse, LoginRequest, RegisterRequest, TokenService},
    error::AppError,
    models::User,
};
use actix_web::{post, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use validator::Validate;

/// The one query shape allowed to read the password hash; used only to
/// verify credentials at login.
#[derive(FromRow)]
struct CredentialRow {
    id: i32,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

/// Register a new user
///
/// Creates a new user account with a bcrypt-hashed password.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    // Advisory pre-check; the unique constraints on the users table are the
    // actual backstop against concurrent duplicate registrations.
    let existing_user =
        sqlx::query_as::<_, (i32,)>("SELECT id FROM users WHERE username = $1 OR email = $2")
            .bind(&register_data.username)
            .bind(&register_data.email)
            .fetch_optional(&**pool)
            .await?;

    if existing_user.is_some() {
        return Err(AppError::Duplicate(
            "Username or email is already registered".into(),
        ));
    }

    let password_hash = hash_password(&register_data.password)?;

    sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3)")
        .bind(&register_data.username)
        .bind(&register_data.email)
        .bind(&password_hash)
        .execute(&**pool)
        .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully"
    })))
}

/// Login user
///
/// Authenticates a user by username and password and returns a token
/// together with the public user record.
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    token_service: web::Data<TokenService>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, username, email, password_hash, created_at FROM users WHERE username = $1",
    )
    .bind(&login_data.username)
    .fetch_optional(&**pool)
    .await?;

    // Unknown user and wrong password produce the same response.
    let row = match row {
        Some(row) => row,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    if !verify_password(&login_data.password, &row.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = token_service.issue(row.id)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        token,
        user: User {
            id: row.id,
            username: row.username,
            email: row.email,
            created_at: row.created_at,
        },
    }))
}

/// Logout user
///
/// Tokens are stateless, so logout is advisory: the server keeps no
/// revocation list and the client must discard the token.
#[post("/logout")]
pub async fn logout() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Logged out (client should discard the token)"
    }))
}

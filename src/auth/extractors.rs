use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use sqlx::FromRow;
use std::future::{ready, Ready};

use crate::error::AppError;

/// The authenticated identity resolved by `AuthMiddleware`: the user's id
/// and username, never the password hash.
///
/// This extractor is intended for routes protected by `AuthMiddleware`,
/// which verifies the JWT, resolves the subject to a live user record, and
/// inserts this struct into request extensions.
///
/// If the identity is not found in the extensions (e.g., if `AuthMiddleware`
/// did not run), this extractor returns an `AppError::Unauthorized` error.
#[derive(Debug, Clone, FromRow)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
}

impl FromRequest for CurrentUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<CurrentUser>().cloned() {
            Some(user) => ready(Ok(user)),
            None => {
                // Reached only if the middleware is missing from the route's
                // scope; responding with Unauthorized is the safe default.
                let err = AppError::Unauthorized("Authentication required".to_string());
                ready(Err(err.into()))
            }
        }
    }
}

use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use sqlx::PgPool;

use crate::auth::extractors::CurrentUser;
use crate::auth::token::TokenService;
use crate::error::AppError;

/// Guards the `/api` scope: extracts the bearer token, verifies it, and
/// resolves the subject to a live user record before the request reaches a
/// handler. The resolved identity is attached to request extensions for the
/// `CurrentUser` extractor.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Registration, login and logout are reachable without a token.
        if req.path().starts_with("/api/auth/") {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        let service = Rc::clone(&self.service);

        Box::pin(async move {
            // The header must be exactly "Bearer <token>".
            let token = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_owned);

            let token = match token {
                Some(token) => token,
                None => {
                    return Err(AppError::Unauthorized(
                        "Authorization token missing or malformed".into(),
                    )
                    .into())
                }
            };

            let token_service = req
                .app_data::<web::Data<TokenService>>()
                .cloned()
                .ok_or_else(|| {
                    AppError::InternalServerError("Token service not configured".into())
                })?;
            let pool = req
                .app_data::<web::Data<PgPool>>()
                .cloned()
                .ok_or_else(|| {
                    AppError::InternalServerError("Database pool not configured".into())
                })?;

            let claims = token_service.verify(&token)?;

            // A token stays cryptographically valid until expiry even if the
            // account is gone; resolve the subject against the user store
            // before trusting it.
            let user =
                sqlx::query_as::<_, CurrentUser>("SELECT id, username FROM users WHERE id = $1")
                    .bind(claims.sub)
                    .fetch_optional(pool.get_ref())
                    .await
                    .map_err(AppError::from)?;

            let user = match user {
                Some(user) => user,
                None => {
                    return Err(
                        AppError::Unauthorized("Invalid token (user not found)".into()).into(),
                    )
                }
            };

            req.extensions_mut().insert(user);
            service.call(req).await
        })
    }
}

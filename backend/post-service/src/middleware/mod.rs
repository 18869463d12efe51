/// HTTP middleware for post-service
///
/// Token verification happens upstream at the gateway, which forwards the
/// verified caller as `x-user-id`. `GatewayAuth` turns that header into a
/// `UserId` in request extensions and rejects requests without one.
use crate::error::AppError;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, stored in request extensions
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

pub struct GatewayAuth;

impl<S, B> Transform<S, ServiceRequest> for GatewayAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = GatewayAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(GatewayAuthService {
            service: Rc::new(service),
        }))
    }
}

pub struct GatewayAuthService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for GatewayAuthService<S>
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
        let service = self.service.clone();

        Box::pin(async move {
            let user_id = req
                .headers()
                .get(USER_ID_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| AppError::Unauthorized("missing authenticated user".to_string()))
                .and_then(|raw| {
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| AppError::Unauthorized("invalid user id".to_string()))
                })?;

            req.extensions_mut().insert(UserId(user_id));

            service.call(req).await
        })
    }
}

impl FromRequest for UserId {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .copied()
                .ok_or_else(|| AppError::Unauthorized("user id missing".to_string()).into()),
        )
    }
}

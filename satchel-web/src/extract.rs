//! Handler access to the request's session

use crate::WebError;
use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::request::Parts,
};
use satchel_core::Session;
use std::convert::Infallible;
use std::ops::Deref;

/// The session attached by [`session_middleware`](crate::middleware::session_middleware)
///
/// Extracting it on a route without the middleware, or on a skipped route, is
/// a server misconfiguration and rejects with 500. Use `Option<ActiveSession>`
/// on routes that may run without a session.
#[derive(Debug, Clone)]
pub struct ActiveSession(pub Session);

impl Deref for ActiveSession {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .map(ActiveSession)
            .ok_or(WebError::SessionMissing)
    }
}

impl<S> OptionalFromRequestParts<S> for ActiveSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<Session>().cloned().map(ActiveSession))
    }
}

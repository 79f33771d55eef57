//! Session middleware
//!
//! Loads the session before the handler runs and commits it once the response
//! exists. Handlers reach the session through the [`ActiveSession`] extractor.
//!
//! [`ActiveSession`]: crate::extract::ActiveSession

use crate::cookie::{apply_directive, read_session_cookie};
use crate::{WebError, WebResult};
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use satchel_core::{RequestContext, Session, SessionManager};
use std::sync::Arc;
use tracing::debug;

/// Request extension that opts a single request out of sessions
///
/// Insert it from an outer layer; the middleware then attaches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipSession;

/// Describe a request for id generators and route matching
pub fn request_context(request: &Request) -> RequestContext {
    let mut context = RequestContext::new(request.method().as_str(), request.uri().path());

    if let Some(matched) = request.extensions().get::<MatchedPath>() {
        context = context.with_matched_route(matched.as_str());
    }

    for (name, value) in request.headers() {
        if let Ok(value) = value.to_str() {
            context = context.with_header(name.as_str(), value);
        }
    }

    context
}

/// Attach a session to every request that does not opt out
pub async fn session_middleware(
    State(sessions): State<Arc<SessionManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    let skip = request.extensions().get::<SkipSession>().is_some();
    let raw_cookie = read_session_cookie(sessions.settings(), request.headers());
    let context = request_context(&request);

    let session = match sessions.load(context, raw_cookie.as_deref(), skip).await {
        Ok(Some(session)) => session,
        Ok(None) => return next.run(request).await,
        Err(e) => {
            e.log();
            return WebError::from(e).into_response();
        }
    };

    request.extensions_mut().insert(session.clone());
    let mut response = next.run(request).await;

    if let Err(e) = commit(&session, &mut response).await {
        debug!(session_id = %session.id(), "Session commit failed");
        return e.into_response();
    }

    response
}

/// Commit a session now and write its cookie to `response`
///
/// Handlers may call this ahead of the middleware; each request commits once.
pub async fn commit(session: &Session, response: &mut Response) -> WebResult<()> {
    let directive = session.commit().await.map_err(|e| {
        e.log();
        WebError::from(e)
    })?;

    apply_directive(
        session.manager().settings(),
        &directive,
        response.headers_mut(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;

    #[test]
    fn test_request_context_collects_headers() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/things?x=1")
            .header("X-Tenant", "acme")
            .body(Body::empty())
            .unwrap();

        let context = request_context(&request);
        assert_eq!(context.method, "POST");
        assert_eq!(context.path, "/api/things");
        assert_eq!(context.header("x-tenant"), Some("acme"));
        assert_eq!(context.matched_route, None);
    }
}

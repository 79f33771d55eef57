//! Session id generation

use crate::error::{ErrorContext, SatchelError, SatchelResult};
use crate::types::RequestContext;
use std::sync::Arc;

/// Produces identifiers for new sessions
pub trait SessionIdGenerator: Send + Sync {
    fn generate(&self, request: &RequestContext) -> String;
}

/// Random UUID v4 identifiers
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl SessionIdGenerator for UuidGenerator {
    fn generate(&self, _request: &RequestContext) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

impl<F> SessionIdGenerator for F
where
    F: Fn(&RequestContext) -> String + Send + Sync,
{
    fn generate(&self, request: &RequestContext) -> String {
        self(request)
    }
}

pub type SharedIdGenerator = Arc<dyn SessionIdGenerator>;

/// Generate an id and check the generator produced one
///
/// Any non-empty string is accepted; the id only ever travels inside the sealed cookie.
pub fn generate_checked(
    generator: &dyn SessionIdGenerator,
    request: &RequestContext,
) -> SatchelResult<String> {
    let id = generator.generate(request);

    if id.is_empty() {
        return Err(SatchelError::Usage {
            message: "Session ID generator returned an empty string".to_string(),
            context: ErrorContext::new("id_generator")
                .with_operation("generate")
                .with_metadata("path", &request.path),
        });
    }

    Ok(id)
}

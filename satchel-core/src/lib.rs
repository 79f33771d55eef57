//! Satchel Core - per-request session engine
//!
//! Attaches a mutable key/value session to each request, keeps it in a sealed
//! cookie or a server-side cache depending on its size, and commits changes when
//! the response is produced.

pub mod cache;
pub mod config;
pub mod error;
pub mod flash;
pub mod id;
pub mod lifecycle;
pub mod logging;
pub mod record;
pub mod session;
pub mod traits;
pub mod types;

pub use cache::{CacheStats, MemoryCache};
pub use config::{CacheSettings, CookieOptions, SameSitePolicy, SessionSettings};
pub use error::*;
pub use id::{SessionIdGenerator, UuidGenerator};
pub use lifecycle::{SessionManager, SessionManagerBuilder};
pub use logging::*;
pub use record::SessionRecord;
pub use session::Session;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;

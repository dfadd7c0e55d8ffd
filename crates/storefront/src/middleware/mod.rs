//! Request middleware: session management and caller identity.

pub mod identity;
pub mod session;

pub use identity::{Identity, RequireIdentity};
pub use session::create_session_layer;

//! Authentication subsystem.
//!
//! # Data Flow
//! ```text
//! Request build:
//!     token.rs (resolve provider → bearer token, validate JWT shape)
//!
//! HTTP 401 on a business request:
//!     refresh.rs (single-flight refresh via the identity collaborator)
//!     → session.rs (soft-expiry flag persisted + broadcast on failure)
//! ```
//!
//! # Design Decisions
//! - One normalization function resolves every provider variant before any
//!   other component touches the token
//! - At most one refresh is in flight process-wide; concurrent 401 handlers
//!   share its result
//! - Session mutations are broadcast in-process; cross-process sharing is a
//!   documented extension, not an assumption

pub mod refresh;
pub mod session;
pub mod token;

pub use refresh::{RefreshCoordinator, SessionRefresher};
pub use session::{MemoryStorage, SessionEvent, SessionStorage, SessionStore};
pub use token::{is_jwt_shaped, TokenProvider};

//! Single-flight session refresh.
//!
//! # Responsibilities
//! - Drive the identity collaborator's refresh call
//! - Guarantee at most one refresh in flight process-wide
//! - Share the pending result with every concurrent 401 handler
//!
//! # Design Decisions
//! - The in-flight slot holds a `Shared` future behind a mutex; the future's
//!   own body clears the slot right before it settles, so the slot never
//!   outlives a settled refresh
//! - Refresh failures are swallowed and reported as "no token"; the caller
//!   decides whether that means soft expiry

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::{BoxFuture, Shared};
use futures_util::FutureExt;

use crate::error::ApiError;

/// Identity collaborator performing the actual session refresh.
pub trait SessionRefresher: Send + Sync + 'static {
    /// Fetch the current session, returning a fresh access token if one
    /// could be obtained.
    fn current_session(&self) -> BoxFuture<'static, Result<Option<String>, ApiError>>;
}

type RefreshFuture = Shared<BoxFuture<'static, Option<String>>>;

/// Single-flight coordinator over the refresher.
pub struct RefreshCoordinator {
    refresher: Arc<dyn SessionRefresher>,
    in_flight: Arc<Mutex<Option<RefreshFuture>>>,
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn SessionRefresher>) -> Self {
        Self {
            refresher,
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Await a refreshed token, starting a refresh only if none is pending.
    ///
    /// Every concurrent caller receives the same result. A refresher error
    /// is logged and collapsed into `None`.
    pub async fn refreshed_token(&self) -> Option<String> {
        let shared = {
            let mut slot = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(pending) => pending.clone(),
                None => {
                    let refresher = Arc::clone(&self.refresher);
                    let in_flight = Arc::clone(&self.in_flight);
                    let fut = async move {
                        let result = match refresher.current_session().await {
                            Ok(token) => token,
                            Err(err) => {
                                tracing::warn!(error = %err, "session refresh failed");
                                None
                            }
                        };
                        // Settles immediately after this; the slot must not
                        // hold a completed refresh.
                        in_flight
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        shared.await
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("RefreshCoordinator")
            .field("in_flight", &pending)
            .finish()
    }
}

//! Application state shared across handlers.

use std::sync::Arc;

use crate::services::RequestActions;
use crate::slack::SlackClient;
use crate::store::RequestStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Handlers verify requests with
/// the Slack client and hand the parsed payload to the request actions on a
/// spawned task.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    slack: SlackClient,
    store: Arc<RequestStore>,
    actions: Arc<RequestActions>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `slack` - Client holding the signing secret for webhook verification
    /// * `store` - The request store, for readiness checks
    /// * `actions` - The workflow every verified payload is routed to
    #[must_use]
    pub fn new(slack: SlackClient, store: Arc<RequestStore>, actions: Arc<RequestActions>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                slack,
                store,
                actions,
            }),
        }
    }

    /// Get a reference to the Slack client.
    #[must_use]
    pub fn slack(&self) -> &SlackClient {
        &self.inner.slack
    }

    /// Get a reference to the request store.
    #[must_use]
    pub fn store(&self) -> &RequestStore {
        &self.inner.store
    }

    /// Get a shared handle to the request actions.
    #[must_use]
    pub fn actions(&self) -> Arc<RequestActions> {
        Arc::clone(&self.inner.actions)
    }
}

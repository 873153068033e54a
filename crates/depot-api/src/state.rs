//! Application state shared by all handlers.

use depot_core::Config;
use depot_storage::LocalStore;
use std::sync::Arc;

use crate::services::upload::UploadService;

/// Main application state, built once in `setup::initialize_app`.
pub struct AppState {
    pub config: Config,
    pub upload_service: Arc<UploadService>,
    /// Present when the local storage backend is active; backs the
    /// `/objects` serving routes and their signature verification.
    pub local: Option<Arc<LocalStore>>,
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}

use std::sync::Arc;

use crate::services::{CatalogService, CatalogSynchronizer, UserService};

/// Shared application state
pub struct AppState {
    pub synchronizer: Arc<CatalogSynchronizer>,
    pub catalog: Arc<CatalogService>,
    pub users: Arc<UserService>,
}

impl AppState {
    pub fn new(
        synchronizer: Arc<CatalogSynchronizer>,
        catalog: Arc<CatalogService>,
        users: Arc<UserService>,
    ) -> Arc<Self> {
        Arc::new(Self {
            synchronizer,
            catalog,
            users,
        })
    }
}

pub mod advisor;
pub mod api;
pub mod config;
pub mod store;

use std::sync::Arc;

use advisor::AdvisoryService;
use config::Config;
use store::Store;

pub struct AppState {
    pub config: Config,
    pub store: Store,
    pub advisor: Arc<dyn AdvisoryService>,
}

impl AppState {
    pub fn new(config: Config, store: Store, advisor: Arc<dyn AdvisoryService>) -> Self {
        Self {
            config,
            store,
            advisor,
        }
    }
}

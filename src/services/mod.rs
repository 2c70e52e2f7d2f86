//! Business logic services

pub mod inventory;
pub mod sweeper;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for the core services
#[derive(Clone)]
pub struct Services {
    pub inventory: inventory::InventoryEngine<Repository>,
    pub sweeper: sweeper::ExpirySweeper<Repository>,
}

impl Services {
    /// Create all services with the given store
    pub fn new(store: Arc<Repository>, config: &AppConfig) -> Self {
        let inventory =
            inventory::InventoryEngine::new(store.clone(), config.policy.clone());
        let sweeper =
            sweeper::ExpirySweeper::new(store, inventory.clone(), config.sweeper.clone());
        Self { inventory, sweeper }
    }
}

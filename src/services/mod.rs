//! Business logic services

pub mod lending;

use std::sync::Arc;

use crate::repository::LibraryStore;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub lending: lending::LendingService,
}

impl Services {
    /// Create all services on top of the given store
    pub fn new(store: Arc<dyn LibraryStore>) -> Self {
        Self {
            lending: lending::LendingService::new(store),
        }
    }
}

//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the read-only
//! catalog and the service clients created once at startup.

use crate::config::Config;
use logickids_core::{aggregator::ExerciseGenerator, catalog::Catalog};
use std::{sync::Arc, time::Instant};

/// The shared application state, created once at startup and passed to all handlers.
/// All fields are public to be accessible from other modules.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    /// `None` when no generation credential is configured.
    pub generator: Option<Arc<ExerciseGenerator>>,
    pub config: Arc<Config>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        generator: Option<Arc<ExerciseGenerator>>,
        config: Config,
    ) -> Self {
        Self {
            catalog,
            generator,
            config: Arc::new(config),
            started_at: Instant::now(),
        }
    }
}

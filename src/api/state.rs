//! Application state for the API server

use crate::{Config, LogImporter};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// This struct is cloned for each request (cheap Arc clone) and provides
/// access to the importer instance and configuration.
#[derive(Clone)]
pub struct AppState {
    /// The importer handling triggers and owning the database
    pub importer: Arc<LogImporter>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(importer: Arc<LogImporter>, config: Arc<Config>) -> Self {
        Self { importer, config }
    }
}

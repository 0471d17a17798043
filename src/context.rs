use tracing::debug;

use crate::error::Result;
use crate::loader::DatasetCache;
use crate::models::Dataset;
use crate::survival::SurvivalEstimator;

/// Built once at startup and lent to every page.
pub struct AppContext {
    cache: DatasetCache,
    estimator: Box<dyn SurvivalEstimator>,
}

impl AppContext {
    pub fn new(cache: DatasetCache, estimator: Box<dyn SurvivalEstimator>) -> Self {
        Self { cache, estimator }
    }

    pub fn dataset(&self) -> Result<&Dataset> {
        if !self.cache.is_loaded() {
            debug!(path = %self.cache.path().display(), "dataset not cached yet, loading");
        }
        self.cache.get()
    }

    pub fn estimator(&self) -> &dyn SurvivalEstimator {
        self.estimator.as_ref()
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }
}

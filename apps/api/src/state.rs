use std::sync::Arc;

use crate::captions::inflight::InFlightBatches;
use crate::captions::orchestrator::VariantOrchestrator;
use crate::captions::scoring::{CaptionScorer, HeuristicScorer};
use crate::config::Config;
use crate::llm_client::TextGenerator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VariantOrchestrator>,
    /// Pluggable caption scorer. Default: HeuristicScorer. Shared with the orchestrator.
    pub scorer: Arc<dyn CaptionScorer>,
    /// Batches still running, keyed by workbench session.
    pub inflight: Arc<InFlightBatches>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, generator: Arc<dyn TextGenerator>) -> Self {
        let scorer: Arc<dyn CaptionScorer> = Arc::new(HeuristicScorer);
        let orchestrator = Arc::new(VariantOrchestrator::new(
            generator,
            Arc::clone(&scorer),
            config.variant_concurrency,
        ));

        Self {
            orchestrator,
            scorer,
            inflight: Arc::new(InFlightBatches::new()),
            config,
        }
    }
}

pub mod meta_orchestrator;
pub mod weights;

pub use meta_orchestrator::{
    aggregate_markets, best_market, risk_band, MetaOrchestrator, MetaPrediction,
    OrchestratorConfig, CONFIDENCE_CAP,
};
pub use weights::{AgentWeights, MAX_WEIGHT, MIN_WEIGHT};

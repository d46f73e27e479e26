pub mod fixture;
pub mod performance;
pub mod prediction;

pub use fixture::{Fixture, MatchInput, MatchStatus};
pub use performance::{
    AccuracyStats, LogStatus, MatchResult, PredictionLog, TrainingSummary, WeightChange,
};
pub use prediction::{
    markets, AgentResult, AggregatedMarket, MarketPrediction, Outcome, PredictionSummary,
    RiskLevel, ERROR_LABEL,
};

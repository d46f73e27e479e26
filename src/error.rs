use thiserror::Error;

/// Failures raised inside an agent's scoring path.
///
/// These never leave `PredictionAgent::predict`; they are folded into the
/// ERROR sentinel result there.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AgentError {
    #[error("invalid match data: {0}")]
    InvalidInput(String),

    #[error("invalid prediction result: {0}")]
    Computation(String),
}

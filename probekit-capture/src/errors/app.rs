use super::{ProbeError, SinkError, SubscribeError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Subscriber error: {0}")]
    Subscribe(#[from] SubscribeError),
}

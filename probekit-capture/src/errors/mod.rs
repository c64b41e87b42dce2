pub mod app;
pub mod probe;
pub mod sink;
pub mod subscribe;

pub use app::AppError;
pub use probe::{ProbeError, TransportError};
pub use sink::SinkError;
pub use subscribe::SubscribeError;

mod settings;
mod storage;

pub use settings::{Analyser, Coap, Logger, Mqtt, Settings, Sink};
pub use storage::RecordSink;

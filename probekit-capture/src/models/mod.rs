pub mod record;
pub mod resource;

pub use record::{CoapRecord, LogDocument, MqttRecord, Payload, Record};
pub use resource::{Method, ResourceDescriptor};

pub mod analyse_service;
pub mod coap_service;
pub mod mqtt_service;

pub use analyse_service::{topic_groups, ConflictReport, CoordinateLog, GridReport, LogFormat, SourcePositions};
pub use coap_service::{CoapProber, CoapResponse, CoapTransport, UdpTransport};
pub use mqtt_service::{ConnectionState, EventSource, MqttSubscriber, StopReason, SubscribeSummary};

use rumqttc::{ClientError, ConnectReturnCode, ConnectionError};

use super::SinkError;

#[derive(Debug, thiserror::Error)]
pub enum SubscribeError {
    #[error("Broker rejected the connection: {0:?}")]
    ConnectRejected(ConnectReturnCode),

    #[error("Failed to connect to broker: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Failed to queue MQTT request: {0}")]
    Client(#[from] ClientError),

    #[error(transparent)]
    Sink(#[from] SinkError),
}

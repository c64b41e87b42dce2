use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Packet, Publish, QoS};
use time::OffsetDateTime;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::configs::{Mqtt, RecordSink};
use crate::errors::SubscribeError;
use crate::models::{MqttRecord, Payload, Record};

const REQUEST_CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    BudgetElapsed,
    ConnectionLost,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeSummary {
    pub records: usize,
    pub reason: StopReason,
}

/// Where broker notifications come from; the rumqttc event loop in production.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Result<Event, ConnectionError>;
}

#[async_trait]
impl EventSource for EventLoop {
    async fn next_event(&mut self) -> Result<Event, ConnectionError> {
        self.poll().await
    }
}

/// Owns the source across the await so the pending poll can outlive a cycle.
async fn next_event<S: EventSource>(mut source: S) -> (S, Result<Event, ConnectionError>) {
    let polled = source.next_event().await;
    (source, polled)
}

/// Persists every message published on the subscribed filter.
pub struct MqttSubscriber {
    state: ConnectionState,
    sink: RecordSink,
    records: usize,
}

impl MqttSubscriber {
    pub fn new(sink: RecordSink) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            sink,
            records: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn records(&self) -> usize {
        self.records
    }

    /// Connects with a fresh session and listens until the budget elapses,
    /// the connection drops, or `shutdown` resolves.
    pub async fn run<F>(self, settings: &Mqtt, shutdown: F) -> Result<SubscribeSummary, SubscribeError>
        where
            F: Future<Output = ()>,
    {
        let client_id = settings
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        tracing::info!("client id {}", client_id);
        tracing::info!("connecting to {}:{}", settings.host, settings.port);

        let mut options = MqttOptions::new(client_id, &settings.host, settings.port);
        options.set_keep_alive(settings.keep_alive());

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CHANNEL_CAPACITY);
        client.subscribe(&settings.topic, QoS::AtMostOnce).await?;

        self.listen(event_loop, settings.listen_budget(), settings.poll_interval(), shutdown).await
    }

    /// Drives `source` in processing cycles of `poll_interval`. The budget is
    /// checked between cycles, so the run may overshoot it by one cycle.
    ///
    /// A poll still pending at a cycle boundary carries over into the next
    /// cycle, so a slow connect handshake is never restarted.
    pub async fn listen<S, F>(
        mut self,
        source: S,
        budget: Duration,
        poll_interval: Duration,
        shutdown: F,
    ) -> Result<SubscribeSummary, SubscribeError>
        where
            S: EventSource,
            F: Future<Output = ()>,
    {
        let started = Instant::now();
        tokio::pin!(shutdown);

        let polling = next_event(source);
        tokio::pin!(polling);

        loop {
            if started.elapsed() >= budget {
                tracing::info!("time limit reached, exiting");
                return Ok(self.summary(StopReason::BudgetElapsed));
            }
            tracing::debug!("still running, {} records so far", self.records);

            let cycle_end = Instant::now() + poll_interval;
            loop {
                tokio::select! {
                    _ = &mut shutdown => {
                        tracing::info!("interrupted, exiting");
                        return Ok(self.summary(StopReason::Interrupted));
                    }
                    _ = sleep_until(cycle_end) => break,
                    (source, polled) = &mut polling => {
                        match polled {
                            Ok(event) => self.handle_event(&event)?,
                            Err(e) => {
                                let reason = self.handle_error(e)?;
                                return Ok(self.summary(reason));
                            }
                        }
                        polling.set(next_event(source));
                    }
                }
            }
        }
    }

    /// Feeds one notification through the connection state machine.
    pub fn handle_event(&mut self, event: &Event) -> Result<(), SubscribeError> {
        match event {
            Event::Incoming(Packet::ConnAck(ack)) => {
                if ack.code != ConnectReturnCode::Success {
                    return Err(SubscribeError::ConnectRejected(ack.code));
                }
                self.state = ConnectionState::Connected;
                tracing::info!("connected to broker");
            }
            Event::Incoming(Packet::Publish(publish)) => match self.state {
                ConnectionState::Connected => self.persist(publish)?,
                ConnectionState::Disconnected => {
                    tracing::warn!("dropping message on {} received before connection acknowledgment", publish.topic);
                }
            },
            Event::Incoming(Packet::SubAck(ack)) => {
                tracing::debug!("subscription acknowledged: {:?}", ack.return_codes);
            }
            _ => {}
        }

        Ok(())
    }

    /// Classifies an event-loop failure: fatal before the session is up, a
    /// graceful stop once it was.
    pub fn handle_error(&mut self, error: ConnectionError) -> Result<StopReason, SubscribeError> {
        match (self.state, error) {
            (_, ConnectionError::ConnectionRefused(code)) => Err(SubscribeError::ConnectRejected(code)),
            (ConnectionState::Disconnected, e) => Err(SubscribeError::Connection(e)),
            (ConnectionState::Connected, e) => {
                self.state = ConnectionState::Disconnected;
                tracing::warn!("connection lost: {}", e);
                Ok(StopReason::ConnectionLost)
            }
        }
    }

    fn persist(&mut self, publish: &Publish) -> Result<(), SubscribeError> {
        let record = MqttRecord {
            observed_at: OffsetDateTime::now_utc(),
            topic: publish.topic.clone(),
            payload: Payload::from(&publish.payload[..]),
            qos: publish.qos as u8,
            retain: publish.retain,
        };
        tracing::info!(
            topic = %record.topic,
            qos = record.qos,
            retain = record.retain,
            "new message: {:?}",
            record.payload
        );

        self.sink.append(Record::MqttMessage(record))?;
        self.records += 1;

        Ok(())
    }

    fn summary(&self, reason: StopReason) -> SubscribeSummary {
        SubscribeSummary { records: self.records, reason }
    }
}

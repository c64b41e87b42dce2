use std::future::Future;

use crate::configs::{RecordSink, Settings};
use crate::errors::{AppError, ProbeError};
use crate::models::ResourceDescriptor;
use crate::services::{CoapProber, MqttSubscriber, SubscribeSummary, UdpTransport};

pub mod configs;
pub mod errors;
pub mod models;
pub mod services;

/// Probes every listed resource with every configured method and records the
/// successful responses. Returns the number of records written.
pub async fn run_probe(settings: &Settings) -> Result<usize, AppError> {
    let resources = ResourceDescriptor::load_list(&settings.coap.resources)?;
    let methods = settings.coap.methods()?;

    let sink = RecordSink::new(&settings.sink.path);
    sink.reset()?;

    if resources.is_empty() {
        tracing::warn!("resource list {} is empty, nothing to probe", settings.coap.resources);
        return Ok(0);
    }

    tracing::info!(
        "probing {} resources x {} methods on {}:{}",
        resources.len(),
        methods.len(),
        settings.coap.host,
        settings.coap.port
    );

    let transport = UdpTransport::connect(&settings.coap.host, settings.coap.port, settings.coap.timeout())
        .await
        .map_err(ProbeError::from)?;
    let mut prober = CoapProber::new(transport, sink, settings.coap.payload.as_bytes().to_vec());

    Ok(prober.probe(&resources, &methods).await?)
}

/// Records every message on the configured topic filter until the time budget
/// elapses, the connection is lost, or `shutdown` resolves.
pub async fn run_subscriber<F>(settings: &Settings, shutdown: F) -> Result<SubscribeSummary, AppError>
    where
        F: Future<Output = ()>,
{
    let sink = RecordSink::new(&settings.sink.path);
    sink.reset()?;

    Ok(MqttSubscriber::new(sink).run(&settings.mqtt, shutdown).await?)
}

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use coap_lite::{CoapOption, MessageClass, MessageType, Packet, RequestType};
use time::OffsetDateTime;
use tokio::net::{lookup_host, UdpSocket};

use crate::configs::RecordSink;
use crate::errors::{ProbeError, TransportError};
use crate::models::{CoapRecord, Method, Payload, Record, ResourceDescriptor};

// Large enough for any datagram the device sends over plain Ethernet.
const RECV_BUFFER_SIZE: usize = 1500;

/// A response as seen by the prober, independent of the wire codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapResponse {
    /// Raw code byte: class in the top three bits, detail in the rest.
    pub code: u8,
    pub message_id: u16,
    pub token: Vec<u8>,
    pub payload: Vec<u8>,
}

impl CoapResponse {
    pub fn class(&self) -> u8 {
        self.code >> 5
    }

    pub fn detail(&self) -> u8 {
        self.code & 0x1f
    }

    /// Dotted form, e.g. `2.05` or `4.04`.
    pub fn code_string(&self) -> String {
        format!("{}.{:02}", self.class(), self.detail())
    }

    pub fn is_success(&self) -> bool {
        self.class() == 2
    }

    pub fn token_hex(&self) -> String {
        self.token.iter().map(|b| format!("{b:02x}")).collect()
    }

    fn from_packet(packet: &Packet) -> Self {
        Self {
            code: u8::from(packet.header.code),
            message_id: packet.header.message_id,
            token: packet.get_token().to_vec(),
            payload: packet.payload.clone(),
        }
    }
}

#[async_trait]
pub trait CoapTransport: Send {
    async fn request(
        &mut self,
        method: Method,
        resource: &ResourceDescriptor,
        payload: &[u8],
    ) -> Result<CoapResponse, TransportError>;
}

/// Confirmable request/response exchanges over a connected UDP socket.
pub struct UdpTransport {
    socket: UdpSocket,
    next_message_id: u16,
    timeout: Option<Duration>,
}

impl UdpTransport {
    pub async fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let peer = lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| TransportError::Malformed(format!("{host} did not resolve to an address")))?;

        let local: SocketAddr = if peer.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;

        tracing::debug!("coap transport {} -> {}", socket.local_addr()?, peer);

        Ok(Self {
            socket,
            next_message_id: rand::random(),
            timeout,
        })
    }

    fn build_request(&mut self, method: Method, resource: &ResourceDescriptor, payload: &[u8]) -> Packet {
        let mut packet = Packet::new();
        packet.header.set_type(MessageType::Confirmable);
        packet.header.code = MessageClass::Request(match method {
            Method::Get => RequestType::Get,
            Method::Post => RequestType::Post,
            Method::Put => RequestType::Put,
            Method::Delete => RequestType::Delete,
        });
        packet.header.message_id = self.next_message_id;
        self.next_message_id = self.next_message_id.wrapping_add(1);
        packet.set_token(rand::random::<[u8; 4]>().to_vec());

        for segment in resource.segments() {
            packet.add_option(CoapOption::UriPath, segment.as_bytes().to_vec());
        }
        packet.payload = payload.to_vec();

        packet
    }

    async fn exchange(&self, request: &Packet) -> Result<CoapResponse, TransportError> {
        let bytes = request
            .to_bytes()
            .map_err(|e| TransportError::Malformed(format!("{e:?}")))?;
        self.socket.send(&bytes).await?;

        let message_id = request.header.message_id;
        let token = request.get_token();
        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        loop {
            let size = self.socket.recv(&mut buffer).await?;
            let reply = Packet::from_bytes(&buffer[..size])
                .map_err(|e| TransportError::Malformed(format!("{e:?}")))?;

            let same_exchange = reply.header.message_id == message_id;
            match reply.header.get_type() {
                MessageType::Reset if same_exchange => return Err(TransportError::Reset),
                MessageType::Acknowledgement if same_exchange => {
                    if reply.header.code == MessageClass::Empty {
                        tracing::debug!("empty ack for {}, awaiting separate response", message_id);
                        continue;
                    }
                    if reply.get_token() == token {
                        return Ok(CoapResponse::from_packet(&reply));
                    }
                }
                MessageType::Confirmable | MessageType::NonConfirmable if reply.get_token() == token => {
                    if reply.header.get_type() == MessageType::Confirmable {
                        self.acknowledge(reply.header.message_id).await?;
                    }
                    return Ok(CoapResponse::from_packet(&reply));
                }
                _ => {}
            }

            tracing::debug!("ignoring unrelated datagram with message id {}", reply.header.message_id);
        }
    }

    async fn acknowledge(&self, message_id: u16) -> Result<(), TransportError> {
        let mut ack = Packet::new();
        ack.header.set_type(MessageType::Acknowledgement);
        ack.header.code = MessageClass::Empty;
        ack.header.message_id = message_id;

        let bytes = ack
            .to_bytes()
            .map_err(|e| TransportError::Malformed(format!("{e:?}")))?;
        self.socket.send(&bytes).await?;

        Ok(())
    }
}

#[async_trait]
impl CoapTransport for UdpTransport {
    async fn request(
        &mut self,
        method: Method,
        resource: &ResourceDescriptor,
        payload: &[u8],
    ) -> Result<CoapResponse, TransportError> {
        let request = self.build_request(method, resource, payload);

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(&request))
                .await
                .map_err(|_| TransportError::Timeout(limit))?,
            None => self.exchange(&request).await,
        }
    }
}

/// Walks every (resource, method) pair in order and keeps the 2.xx responses.
pub struct CoapProber<T> {
    transport: T,
    sink: RecordSink,
    payload: Vec<u8>,
}

impl<T: CoapTransport> CoapProber<T> {
    pub fn new(transport: T, sink: RecordSink, payload: Vec<u8>) -> Self {
        Self { transport, sink, payload }
    }

    /// Returns the number of records written. Transport failures are logged
    /// and skipped; sink failures abort the run.
    pub async fn probe(&mut self, resources: &[ResourceDescriptor], methods: &[Method]) -> Result<usize, ProbeError> {
        let mut written = 0;

        for resource in resources {
            for &method in methods {
                let response = match self.transport.request(method, resource, &self.payload).await {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!("{} {} failed: {}", method, resource.path, e);
                        continue;
                    }
                };

                let payload = Payload::from(response.payload.as_slice());
                tracing::info!("{} {} -> {} {:?}", method, resource.path, response.code_string(), payload);

                if !response.is_success() {
                    continue;
                }

                self.sink.append(Record::CoapResponse(CoapRecord {
                    observed_at: OffsetDateTime::now_utc(),
                    method,
                    path: resource.path.clone(),
                    code: response.code_string(),
                    message_id: response.message_id,
                    token: response.token_hex(),
                    payload,
                }))?;
                written += 1;
            }
        }

        Ok(written)
    }

    pub fn into_transport(self) -> T {
        self.transport
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    struct ScriptedTransport {
        calls: Vec<(Method, String)>,
        replies: VecDeque<Result<CoapResponse, TransportError>>,
    }

    #[async_trait]
    impl CoapTransport for ScriptedTransport {
        async fn request(
            &mut self,
            method: Method,
            resource: &ResourceDescriptor,
            _payload: &[u8],
        ) -> Result<CoapResponse, TransportError> {
            self.calls.push((method, resource.path.clone()));
            self.replies.pop_front().unwrap_or(Err(TransportError::Reset))
        }
    }

    fn response(code: u8) -> Result<CoapResponse, TransportError> {
        Ok(CoapResponse { code, message_id: 1, token: vec![0xab, 0x01], payload: b"on".to_vec() })
    }

    #[test]
    fn test_code_classification() {
        let content = CoapResponse { code: 0x45, message_id: 0, token: vec![], payload: vec![] };
        assert_eq!(content.code_string(), "2.05");
        assert!(content.is_success());

        let not_found = CoapResponse { code: 0x84, ..content.clone() };
        assert_eq!(not_found.code_string(), "4.04");
        assert!(!not_found.is_success());

        let server_error = CoapResponse { code: 0xa0, ..content };
        assert_eq!(server_error.code_string(), "5.00");
        assert!(!server_error.is_success());
    }

    #[tokio::test]
    async fn test_probe_order_and_filtering() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("data.json"));
        sink.reset().unwrap();

        let transport = ScriptedTransport {
            calls: Vec::new(),
            replies: VecDeque::from(vec![
                response(0x45),
                response(0x85),
                Err(TransportError::Timeout(Duration::from_secs(1))),
                response(0x42),
                response(0x84),
                response(0x44),
                response(0xa0),
                Err(TransportError::Malformed("truncated".into())),
            ]),
        };

        let resources = ResourceDescriptor::parse_list("/a\n/b\n");
        let mut prober = CoapProber::new(transport, sink.clone(), Vec::new());
        let written = prober.probe(&resources, &Method::ALL).await.unwrap();

        assert_eq!(written, 3);

        let calls = prober.into_transport().calls;
        let expected = ["/a", "/b"]
            .iter()
            .flat_map(|p| Method::ALL.iter().map(move |m| (*m, p.to_string())))
            .collect::<Vec<_>>();
        assert_eq!(calls, expected);

        let records = sink.load().unwrap().messages;
        let seen = records.iter().map(|r| match r {
            Record::CoapResponse(c) => (c.method, c.path.as_str(), c.code.as_str()),
            Record::MqttMessage(_) => panic!("unexpected mqtt record"),
        }).collect::<Vec<_>>();
        assert_eq!(seen, vec![
            (Method::Get, "/a", "2.05"),
            (Method::Delete, "/a", "2.02"),
            (Method::Post, "/b", "2.04"),
        ]);
    }

    #[tokio::test]
    async fn test_empty_resource_list() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("data.json"));
        sink.reset().unwrap();

        let transport = ScriptedTransport { calls: Vec::new(), replies: VecDeque::new() };
        let mut prober = CoapProber::new(transport, sink.clone(), Vec::new());

        assert_eq!(prober.probe(&[], &Method::ALL).await.unwrap(), 0);
        assert!(prober.into_transport().calls.is_empty());
        assert!(sink.load().unwrap().messages.is_empty());
    }

    #[tokio::test]
    async fn test_missing_sink_aborts_probe() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("never-reset.json"));

        let transport = ScriptedTransport { calls: Vec::new(), replies: VecDeque::from(vec![response(0x45)]) };
        let mut prober = CoapProber::new(transport, sink, Vec::new());
        let err = prober.probe(&ResourceDescriptor::parse_list("/a"), &[Method::Get]).await.unwrap_err();

        assert!(matches!(err, ProbeError::Sink(_)));
    }
}

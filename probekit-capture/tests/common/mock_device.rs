use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use coap_lite::{CoapOption, MessageClass, MessageType, Packet, RequestType, ResponseType};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Answers inside the ACK: 2.05 for GET, 4.05 for anything else.
    Piggybacked,
    /// Empty ACK first, then a confirmable 2.05 carrying the token.
    Separate,
    /// Never answers.
    Silent,
}

/// A CoAP device on a loopback port that logs every request it sees.
pub struct MockDevice {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
    acks: Arc<Mutex<Vec<u16>>>,
    handle: JoinHandle<()>,
}

impl MockDevice {
    pub async fn start(behaviour: Behaviour) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let acks = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let requests = Arc::clone(&requests);
            let acks = Arc::clone(&acks);
            async move {
                let mut buffer = [0u8; 1500];
                let mut next_message_id = 0x4000u16;
                loop {
                    let (size, peer) = socket.recv_from(&mut buffer).await.unwrap();
                    let packet = Packet::from_bytes(&buffer[..size]).unwrap();

                    let method = match packet.header.code {
                        MessageClass::Request(RequestType::Get) => "GET",
                        MessageClass::Request(RequestType::Post) => "POST",
                        MessageClass::Request(RequestType::Put) => "PUT",
                        MessageClass::Request(RequestType::Delete) => "DELETE",
                        MessageClass::Empty => {
                            acks.lock().unwrap().push(packet.header.message_id);
                            continue;
                        }
                        _ => continue,
                    };
                    requests.lock().unwrap().push(format!("{} {}", method, path_of(&packet)));

                    match behaviour {
                        Behaviour::Silent => {}
                        Behaviour::Piggybacked => {
                            let code = if method == "GET" { ResponseType::Content } else { ResponseType::MethodNotAllowed };
                            let reply = response(&packet, MessageType::Acknowledgement, packet.header.message_id, code);
                            socket.send_to(&reply.to_bytes().unwrap(), peer).await.unwrap();
                        }
                        Behaviour::Separate => {
                            let mut ack = Packet::new();
                            ack.header.set_type(MessageType::Acknowledgement);
                            ack.header.message_id = packet.header.message_id;
                            socket.send_to(&ack.to_bytes().unwrap(), peer).await.unwrap();

                            let reply = response(&packet, MessageType::Confirmable, next_message_id, ResponseType::Content);
                            next_message_id += 1;
                            socket.send_to(&reply.to_bytes().unwrap(), peer).await.unwrap();
                        }
                    }
                }
            }
        });

        Self { addr, requests, acks, handle }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<u16> {
        self.acks.lock().unwrap().clone()
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn path_of(packet: &Packet) -> String {
    let segments = packet
        .get_option(CoapOption::UriPath)
        .map(|list| {
            list.iter()
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    format!("/{}", segments.join("/"))
}

fn response(request: &Packet, kind: MessageType, message_id: u16, code: ResponseType) -> Packet {
    let mut reply = Packet::new();
    reply.header.set_type(kind);
    reply.header.message_id = message_id;
    reply.header.code = MessageClass::Response(code);
    reply.set_token(request.get_token().to_vec());
    reply.payload = b"on".to_vec();
    reply
}

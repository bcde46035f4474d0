use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use log::debug;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;

use crate::error::QueryError;
use crate::packet::{RequestPacket, MAX_PACKET_SIZE};
use crate::query::Endpoint;

/// What an [Exchange] wants to happen after a reply.
#[derive(Debug, PartialEq)]
pub enum Step<T> {
    /// Send another request and wait for its reply.
    Send(RequestPacket),
    /// The exchange is complete.
    Done(T),
}

/// A request/reply conversation with one server, free of any I/O.
///
/// [run] drives an exchange over a socket; tests can drive it by hand.
pub trait Exchange {
    type Output;

    /// The first request to send.
    fn initial_request(&mut self) -> RequestPacket;

    /// Feed one reply datagram and learn what to do next.
    fn on_reply(&mut self, reply: &[u8]) -> Result<Step<Self::Output>, QueryError>;
}

/// Run `exchange` against `endpoint` on a fresh socket.
///
/// A single deadline of `timeout_dur` covers resolving the host and every
/// round trip. The socket is dropped on every return path, including
/// when the deadline fires.
pub async fn run<E: Exchange>(
    endpoint: &Endpoint,
    exchange: E,
    timeout_dur: Duration,
) -> Result<E::Output, QueryError> {
    timeout(timeout_dur, converse(endpoint, exchange)).await?
}

async fn converse<E: Exchange>(endpoint: &Endpoint, mut exchange: E) -> Result<E::Output, QueryError> {
    let addr: SocketAddr = resolve(endpoint).await?;

    // any local port will do, as long as the family matches the peer
    let local: SocketAddr = match addr {
        SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
        SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
    };
    let sock: UdpSocket = UdpSocket::bind(local)
        .await
        .map_err(QueryError::FailedPortBind)?;

    // a connected socket only delivers datagrams from `addr`
    sock.connect(addr)
        .await
        .map_err(QueryError::UnreachableHost)?;

    let mut request: RequestPacket = exchange.initial_request();
    let mut resp_buf: [u8; MAX_PACKET_SIZE] = [0u8; MAX_PACKET_SIZE];
    loop {
        debug!("{} <- {:?}", endpoint, request.packet_type());
        sock.send(&request.pack())
            .await
            .map_err(QueryError::SendError)?;

        let len: usize = sock
            .recv(&mut resp_buf)
            .await
            .map_err(QueryError::ReceiveError)?;
        debug!("{} -> {} bytes", endpoint, len);

        match exchange.on_reply(&resp_buf[..len])? {
            Step::Send(next) => request = next,
            Step::Done(output) => return Ok(output),
        }
    }
}

async fn resolve(endpoint: &Endpoint) -> Result<SocketAddr, QueryError> {
    lookup_host((endpoint.host(), endpoint.port()))
        .await
        .map_err(QueryError::UnresolvableHost)?
        .next()
        .ok_or_else(|| {
            QueryError::UnresolvableHost(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses found for {}", endpoint.host()),
            ))
        })
}

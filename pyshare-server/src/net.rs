//! Local network identity

use std::convert::Infallible;
use std::fmt;
use std::net::{IpAddr, SocketAddr, UdpSocket};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

/// Outbound LAN address of this machine
///
/// Connecting a UDP socket sends nothing; it only asks the OS which
/// interface would route to the target.
pub fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let ip = socket.local_addr().ok()?.ip();
    (!ip.is_unspecified()).then_some(ip)
}

pub fn local_ip_string() -> String {
    local_ip()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|| "localhost".to_string())
}

pub fn hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// `a.b.c` prefix of an IPv4 address, used by the scan stub
pub fn subnet_prefix(ip: &str) -> &str {
    ip.rsplit_once('.').map(|(prefix, _)| prefix).unwrap_or(ip)
}

/// Socket address of the caller, when the server was started with connect info
#[derive(Debug, Clone, Copy)]
pub struct PeerAddr(pub Option<SocketAddr>);

impl PeerAddr {
    pub fn ip(&self) -> Option<IpAddr> {
        self.0.map(|addr| addr.ip())
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip() {
            Some(ip) => write!(f, "{}", ip),
            None => f.write_str("unknown"),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for PeerAddr {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(PeerAddr(
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
        ))
    }
}

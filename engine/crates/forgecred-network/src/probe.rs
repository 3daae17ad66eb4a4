//! TCP/TLS reachability probing
//!
//! A probe opens one connection, optionally completes a TLS handshake, and closes
//! it again. Network conditions are never errors here: every way a probe can go
//! wrong is reported as a classified `ProbeReport`.

use crate::tls::TlsContext;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

/// How a probe ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// Connection (and handshake, if requested) completed
    Connected,
    /// No answer within the timeout
    TimedOut,
    /// Target actively refused the connection (RST)
    Refused,
    /// TCP connected but the TLS handshake failed
    TlsHandshake,
    /// Anything else: DNS failure, unreachable network, ...
    Failed,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Connected => "connected",
            ProbeKind::TimedOut => "timed out",
            ProbeKind::Refused => "refused",
            ProbeKind::TlsHandshake => "tls handshake failed",
            ProbeKind::Failed => "failed",
        }
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub kind: ProbeKind,
    pub message: String,
    pub rtt: Option<Duration>,
}

impl ProbeReport {
    fn new(kind: ProbeKind, message: String) -> Self {
        Self {
            kind,
            message,
            rtt: None,
        }
    }

    fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = Some(rtt);
        self
    }

    /// True only when the connection was established
    pub fn is_open(&self) -> bool {
        self.kind == ProbeKind::Connected
    }

    /// Collapse into the `(success, message)` pair checks report
    pub fn into_parts(self) -> (bool, String) {
        (self.is_open(), self.message)
    }
}

/// Probe `host:port`, optionally wrapping the connection in TLS.
///
/// `connect_timeout` bounds the whole probe; the TLS handshake gets whatever
/// is left after the TCP connect.
pub async fn probe_tcp(
    host: &str,
    port: u16,
    connect_timeout: Duration,
    tls: Option<&TlsContext>,
) -> ProbeReport {
    let start = Instant::now();
    trace!("Probing {}:{} (tls: {})", host, port, tls.is_some());

    let stream = match timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return classify_connect_error(host, port, &e),
        Err(_) => {
            debug!("Connection to {}:{} timed out", host, port);
            return ProbeReport::new(
                ProbeKind::TimedOut,
                format!(
                    "Connection to {}:{} timed out after {}",
                    host,
                    port,
                    human_duration(connect_timeout)
                ),
            );
        }
    };

    let Some(ctx) = tls else {
        let rtt = start.elapsed();
        drop(stream);
        debug!("Connected to {}:{}", host, port);
        return ProbeReport::new(
            ProbeKind::Connected,
            format!("Connected to {}:{}", host, port),
        )
        .with_rtt(rtt);
    };

    let remaining = connect_timeout.saturating_sub(start.elapsed());
    let connector = tokio_native_tls::TlsConnector::from(ctx.connector().clone());

    match timeout(remaining, connector.connect(host, stream)).await {
        Ok(Ok(tls_stream)) => {
            let rtt = start.elapsed();
            drop(tls_stream);
            debug!("TLS connection established to {}:{}", host, port);
            ProbeReport::new(
                ProbeKind::Connected,
                format!("TLS connection established to {}:{}", host, port),
            )
            .with_rtt(rtt)
        }
        Ok(Err(e)) => {
            debug!("TLS handshake with {}:{} failed: {}", host, port, e);
            ProbeReport::new(
                ProbeKind::TlsHandshake,
                format!("TLS handshake with {}:{} failed: {}", host, port, e),
            )
        }
        Err(_) => {
            debug!("TLS handshake with {}:{} timed out", host, port);
            ProbeReport::new(
                ProbeKind::TimedOut,
                format!(
                    "TLS handshake with {}:{} timed out after {}",
                    host,
                    port,
                    human_duration(connect_timeout)
                ),
            )
        }
    }
}

fn classify_connect_error(host: &str, port: u16, e: &std::io::Error) -> ProbeReport {
    trace!("Connect to {}:{} error: {}", host, port, e);
    match e.kind() {
        ErrorKind::ConnectionRefused => ProbeReport::new(
            ProbeKind::Refused,
            format!("Connection refused by {}:{}", host, port),
        ),
        ErrorKind::TimedOut => ProbeReport::new(
            ProbeKind::TimedOut,
            format!("Connection to {}:{} timed out", host, port),
        ),
        _ => ProbeReport::new(
            ProbeKind::Failed,
            format!("Connection to {}:{} failed: {}", host, port, e),
        ),
    }
}

fn human_duration(d: Duration) -> String {
    if d.subsec_millis() == 0 {
        format!("{}s", d.as_secs())
    } else {
        format!("{}ms", d.as_millis())
    }
}

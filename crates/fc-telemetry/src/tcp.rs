//! Line-delimited JSON telemetry transport over TCP.
//!
//! Wire format: after connecting, the client sends one line
//! `{"subscribe":"<namespace>"}`. The server then streams one JSON array
//! per line, each element `{"name":..,"value":..,"timestamp":..}`.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::bus::{Subscription, TelemetryBus};
use crate::error::{BusError, BusResult};
use crate::reading::SensorReading;

#[derive(Serialize)]
struct SubscribeRequest<'a> {
    subscribe: &'a str,
}

/// TCP client side of the telemetry bus.
#[derive(Debug, Clone)]
pub struct TcpBus {
    address: String,
    connect_timeout: Duration,
}

impl TcpBus {
    pub fn new(address: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            address: address.into(),
            connect_timeout,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn resolve(&self) -> BusResult<SocketAddr> {
        self.address
            .to_socket_addrs()
            .map_err(|e| BusError::Unavailable {
                what: format!("cannot resolve {}: {e}", self.address),
            })?
            .next()
            .ok_or_else(|| BusError::Unavailable {
                what: format!("no address for {}", self.address),
            })
    }
}

impl TelemetryBus for TcpBus {
    fn name(&self) -> &str {
        "tcp"
    }

    fn subscribe(&self, namespace: &str) -> BusResult<Box<dyn Subscription>> {
        let addr = self.resolve()?;
        let mut stream =
            TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|e| {
                BusError::Unavailable {
                    what: format!("connect to {addr} failed: {e}"),
                }
            })?;
        stream.set_nodelay(true)?;
        stream.set_write_timeout(Some(self.connect_timeout))?;

        let mut request = serde_json::to_vec(&SubscribeRequest {
            subscribe: namespace,
        })
        .map_err(|e| BusError::Decode {
            what: e.to_string(),
        })?;
        request.push(b'\n');
        stream.write_all(&request)?;
        debug!(%addr, namespace, "sent telemetry subscribe request");

        Ok(Box::new(TcpSubscription {
            reader: BufReader::new(stream),
            line: Vec::new(),
        }))
    }
}

struct TcpSubscription {
    reader: BufReader<TcpStream>,
    /// Partial line carried across read timeouts. Raw bytes, so a line
    /// that is not UTF-8 is a decode error rather than a broken stream.
    line: Vec<u8>,
}

impl TcpSubscription {
    fn decode(line: &[u8]) -> BusResult<Vec<SensorReading>> {
        serde_json::from_slice(line).map_err(|e| BusError::Decode {
            what: format!(
                "{e}: {}",
                String::from_utf8_lossy(&line[..line.len().min(80)])
            ),
        })
    }
}

impl Subscription for TcpSubscription {
    fn next_batch(&mut self, timeout: Duration) -> BusResult<Option<Vec<SensorReading>>> {
        // A zero read timeout means "block forever" for sockets.
        let timeout = timeout.max(Duration::from_millis(1));
        self.reader.get_ref().set_read_timeout(Some(timeout))?;

        match self.reader.read_until(b'\n', &mut self.line) {
            Ok(0) => Err(BusError::Disconnected {
                what: "telemetry server closed the stream".to_string(),
            }),
            Ok(_) if self.line.last() != Some(&b'\n') => Ok(None),
            Ok(_) => {
                let line = std::mem::take(&mut self.line);
                let trimmed = line.trim_ascii();
                if trimmed.is_empty() {
                    return Ok(None);
                }
                Self::decode(trimmed).map(Some)
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(BusError::Disconnected {
                what: e.to_string(),
            }),
        }
    }
}

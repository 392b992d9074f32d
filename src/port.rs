//! Pre-flight check that the configured port is free.

use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, TcpListener, ToSocketAddrs};

use tracing::debug;

use crate::error::{StartError, StartResult};
use crate::observability::LOG_TARGET;

/// Fails with [`StartError::PortInUse`] when any local `localhost` address
/// on `port` is already bound.
///
/// The check is advisory: another process can still claim the port before
/// the server binds it.
pub(crate) fn ensure_port_available(port: u16) -> StartResult<()> {
    for addr in localhost_addrs(port) {
        match TcpListener::bind(addr) {
            Ok(listener) => drop(listener),
            Err(source) if source.kind() == ErrorKind::AddrInUse => {
                return Err(StartError::PortInUse { port, source });
            }
            Err(err) => {
                debug!(target: LOG_TARGET, %addr, error = %err, "skipping unbindable address");
            }
        }
    }
    Ok(())
}

fn localhost_addrs(port: u16) -> Vec<SocketAddr> {
    match ("localhost", port).to_socket_addrs() {
        Ok(addrs) => {
            let resolved: Vec<_> = addrs.collect();
            if resolved.is_empty() {
                vec![loopback(port)]
            } else {
                resolved
            }
        }
        Err(err) => {
            log_resolution_failure(&err);
            vec![loopback(port)]
        }
    }
}

fn loopback(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port))
}

fn log_resolution_failure(err: &io::Error) {
    debug!(target: LOG_TARGET, error = %err, "localhost did not resolve; using 127.0.0.1");
}

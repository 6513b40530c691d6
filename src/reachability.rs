//! Network reachability diagnostic, run when a host cannot be resolved.

use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// Something that can tell whether the network is usable at all.
pub trait Reachability {
    /// A human readable status message.
    fn diagnose(&self) -> String;
}

impl<F> Reachability for F
where
    F: Fn() -> String,
{
    fn diagnose(&self) -> String {
        self()
    }
}

/// Probes reachability by opening TCP connections to well known public
/// addresses. Resolving names is avoided since that is what already failed.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    targets: Vec<SocketAddr>,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(targets: Vec<SocketAddr>, timeout: Duration) -> Self {
        TcpProbe { targets, timeout }
    }
}

impl Default for TcpProbe {
    fn default() -> Self {
        const WELL_KNOWN: [([u8; 4], u16); 3] =
            [([1, 1, 1, 1], 443), ([8, 8, 8, 8], 53), ([9, 9, 9, 9], 443)];

        let targets = WELL_KNOWN.into_iter().map(SocketAddr::from).collect();

        TcpProbe::new(targets, Duration::from_secs(2))
    }
}

impl Reachability for TcpProbe {
    fn diagnose(&self) -> String {
        for target in &self.targets {
            match TcpStream::connect_timeout(target, self.timeout) {
                Ok(_) => {
                    debug!("Reachability probe to {} succeeded", target);
                    return format!(
                        "network is reachable ({} answered), the host name could not be resolved",
                        target
                    );
                }
                Err(e) => debug!("Reachability probe to {} failed: {}", target, e),
            }
        }

        if self.targets.is_empty() {
            return "network reachability unknown, nothing to probe".to_string();
        }

        "network is unreachable, check the connection".to_string()
    }
}

/*
* Copyright 2019 Comcast Cable Communications Management, LLC
*
* Licensed under the Apache License, Version 2.0 (the "License");
* you may not use this file except in compliance with the License.
* You may obtain a copy of the License at
*
* http://www.apache.org/licenses/LICENSE-2.0
*
* Unless required by applicable law or agreed to in writing, software
* distributed under the License is distributed on an "AS IS" BASIS,
* WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
* See the License for the specific language governing permissions and
* limitations under the License.
*
* SPDX-License-Identifier: Apache-2.0
*/

//! Best-effort liveness check of a host address.
//!
//! The answer is advisory only. Allocation never consults it.

use crate::config::ProbeConfig;
use crate::net::Address;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, trace};

/// TCP connect probe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Probe {
    ports: Vec<u16>,
    timeout: Duration,
}

impl Probe {
    /// Creates a probe trying `ports` in order, each bounded by `timeout`.
    /// A zero `timeout` leaves the connect unbounded.
    pub fn new(ports: Vec<u16>, timeout: Duration) -> Self {
        Probe { ports, timeout }
    }

    /// The ports tried, in order.
    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Whether something at `address` answers on any port.
    ///
    /// An accepted connection and a refused one both count: a reset can
    /// only come from a live stack. Timeouts and unreachable routes do
    /// not.
    pub fn responds(&self, address: Address) -> bool {
        let ip = IpAddr::from(address);
        for &port in self.ports.iter() {
            let target = SocketAddr::new(ip, port);
            match self.connect(&target) {
                Ok(_) => {
                    debug!(%target, "probe connected.");
                    return true;
                }
                Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                    debug!(%target, "probe refused.");
                    return true;
                }
                Err(e) => trace!(%target, error = %e, "no answer."),
            }
        }

        false
    }

    fn connect(&self, target: &SocketAddr) -> io::Result<TcpStream> {
        if self.timeout == Duration::ZERO {
            TcpStream::connect(target)
        } else {
            TcpStream::connect_timeout(target, self.timeout)
        }
    }
}

impl From<&ProbeConfig> for Probe {
    fn from(config: &ProbeConfig) -> Self {
        Probe::new(config.ports.clone(), config.timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IpamConfig;
    use std::net::{Ipv4Addr, TcpListener};

    fn localhost() -> Address {
        Address::from(Ipv4Addr::LOCALHOST)
    }

    #[test]
    fn listening_port_responds() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let probe = Probe::new(vec![port], Duration::from_secs(1));
        assert!(probe.responds(localhost()));
    }

    #[test]
    fn zero_timeout_is_unbounded() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let config: IpamConfig =
            toml::from_str(&format!("[probe]\nports = [{}]\ntimeout = 0", port)).unwrap();
        assert_eq!(Duration::ZERO, config.probe.timeout);

        let probe = Probe::from(&config.probe);
        assert!(probe.responds(localhost()));
    }

    #[test]
    fn refused_port_responds() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let probe = Probe::new(vec![port], Duration::from_secs(1));
        assert!(probe.responds(localhost()));
    }

    #[test]
    fn no_ports_never_responds() {
        let probe = Probe::new(vec![], Duration::from_secs(1));
        assert!(!probe.responds(localhost()));
    }

    #[test]
    fn built_from_config() {
        let probe = Probe::from(&ProbeConfig::default());
        assert_eq!(&[22, 80, 443, 23], probe.ports());
    }
}

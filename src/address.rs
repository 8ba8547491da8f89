// Copyright 2024-2026, NVIDIA CORPORATION & AFFILIATES. All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions
// are met:
//  * Redistributions of source code must retain the above copyright
//    notice, this list of conditions and the following disclaimer.
//  * Redistributions in binary form must reproduce the above copyright
//    notice, this list of conditions and the following disclaimer in the
//    documentation and/or other materials provided with the distribution.
//  * Neither the name of NVIDIA CORPORATION nor the names of its
//    contributors may be used to endorse or promote products derived
//    from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS ``AS IS'' AND ANY
// EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT LIMITED TO, THE
// IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR
// PURPOSE ARE DISCLAIMED.  IN NO EVENT SHALL THE COPYRIGHT OWNER OR
// CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL, SPECIAL,
// EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO,
// PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE, DATA, OR
// PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY
// OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! Server address parsing and transport selection.
//!
//! A server URL has the form `[scheme://]host[:port]`. The scheme picks the
//! transport: `http://` selects the HTTP/WebSocket protocol, while `asio://`
//! or no scheme at all selects the proprietary TCP protocol. When the port is
//! omitted, [`DEFAULT_PORT`] is assumed.
//!
//! # Example
//!
//! ```rust
//! use aiserver_client::address::{ServerAddress, Transport};
//!
//! let addr = ServerAddress::parse("http://ai-host").unwrap();
//! assert_eq!(addr.host, "ai-host");
//! assert_eq!(addr.port, 8778);
//! assert_eq!(addr.transport, Transport::Http);
//!
//! let addr = ServerAddress::parse("10.0.0.5:9000").unwrap();
//! assert_eq!(addr.transport, Transport::Tcp);
//! ```

use crate::error::{Error, Result};

/// Default TCP port of the AI server.
pub const DEFAULT_PORT: u16 = 8778;

/// URL scheme selecting the HTTP/WebSocket transport.
const HTTP_PREFIX: &str = "http://";

/// URL scheme selecting the proprietary TCP transport explicitly.
const TCP_PREFIX: &str = "asio://";

/// Wire protocol spoken with the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Proprietary length-prefixed TCP protocol.
    Tcp,
    /// HTTP control surface plus a WebSocket data channel.
    Http,
}

/// Parsed server address: host, port, and the transport selected by the URL
/// scheme. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    /// Server domain name or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Wire protocol selected by the URL scheme.
    pub transport: Transport,
}

impl ServerAddress {
    /// Parses a server URL of the form `[scheme://]host[:port]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadParameter`] when the string is empty, contains
    /// only a scheme, or carries a port outside `1..=65535`.
    pub fn parse(server_url: &str) -> Result<Self> {
        let (transport, rest) = if let Some(rest) = server_url.strip_prefix(HTTP_PREFIX) {
            (Transport::Http, rest)
        } else if let Some(rest) = server_url.strip_prefix(TCP_PREFIX) {
            (Transport::Tcp, rest)
        } else {
            (Transport::Tcp, server_url)
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port_str)) => {
                let port = port_str.parse::<u16>().ok().filter(|&p| p > 0).ok_or_else(|| {
                    Error::BadParameter(format!(
                        "invalid port '{port_str}' in server address '{server_url}'"
                    ))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(Error::BadParameter(format!(
                "no host in server address '{server_url}'"
            )));
        }

        Ok(Self {
            host: host.to_owned(),
            port,
            transport,
        })
    }
}

impl std::fmt::Display for ServerAddress {
    /// Normalized form: the port is always explicit; the `http://` prefix is
    /// kept for the HTTP transport and elided for TCP.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.transport {
            Transport::Http => HTTP_PREFIX,
            Transport::Tcp => "",
        };
        write!(f, "{prefix}{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for ServerAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_scheme_selects_http_transport() {
        let addr = ServerAddress::parse("http://h").unwrap();
        assert_eq!(addr.host, "h");
        assert_eq!(addr.port, DEFAULT_PORT);
        assert_eq!(addr.transport, Transport::Http);
    }

    #[test]
    fn bare_host_selects_tcp_transport() {
        let addr = ServerAddress::parse("h:9000").unwrap();
        assert_eq!(addr.host, "h");
        assert_eq!(addr.port, 9000);
        assert_eq!(addr.transport, Transport::Tcp);
    }

    #[test]
    fn asio_scheme_selects_tcp_transport() {
        let addr = ServerAddress::parse("asio://h:1").unwrap();
        assert_eq!(addr.host, "h");
        assert_eq!(addr.port, 1);
        assert_eq!(addr.transport, Transport::Tcp);
    }

    #[test]
    fn default_port_applied_when_omitted() {
        let addr = ServerAddress::parse("localhost").unwrap();
        assert_eq!(addr.port, DEFAULT_PORT);
    }

    #[test]
    fn empty_and_scheme_only_are_rejected() {
        assert!(matches!(
            ServerAddress::parse(""),
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(
            ServerAddress::parse("http://"),
            Err(Error::BadParameter(_))
        ));
        assert!(matches!(
            ServerAddress::parse("asio://"),
            Err(Error::BadParameter(_))
        ));
    }

    #[test]
    fn invalid_ports_are_rejected() {
        assert!(ServerAddress::parse("h:0").is_err());
        assert!(ServerAddress::parse("h:notaport").is_err());
        assert!(ServerAddress::parse("h:70000").is_err());
    }

    #[test]
    fn display_round_trip_is_normalized() {
        // Default port made explicit, scheme preserved for HTTP.
        let addr = ServerAddress::parse("http://h").unwrap();
        assert_eq!(addr.to_string(), "http://h:8778");
        assert_eq!(ServerAddress::parse(&addr.to_string()).unwrap(), addr);

        // Scheme elided for TCP.
        let addr = ServerAddress::parse("asio://h:1").unwrap();
        assert_eq!(addr.to_string(), "h:1");
        assert_eq!(
            ServerAddress::parse(&addr.to_string()).unwrap().transport,
            Transport::Tcp
        );
    }

    #[test]
    fn from_str_matches_parse() {
        let addr: ServerAddress = "h:1234".parse().unwrap();
        assert_eq!(addr, ServerAddress::parse("h:1234").unwrap());
    }
}

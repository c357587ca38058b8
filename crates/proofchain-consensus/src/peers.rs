//! Known peer addresses.

use crate::error::{ConsensusError, Result};
use parking_lot::RwLock;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv6Addr;
use std::str::FromStr;

/// A normalized peer network location.
///
/// Accepts `host:port`, `[v6]:port` and `http(s)://host:port[/path]`. The
/// scheme and path are discarded; only the network location is kept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress {
    host: String,
    port: u16,
}

impl PeerAddress {
    /// Returns the lower-cased host. IPv6 hosts are returned without brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Returns the port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Parses and normalizes an address.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || ConsensusError::InvalidAddress(input.to_string());
        let trimmed = input.trim();

        let netloc = match trimmed.split_once("://") {
            Some((scheme, rest)) => {
                if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
                    return Err(invalid());
                }
                let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
                &rest[..end]
            }
            None => trimmed,
        };
        if netloc.contains(['/', '?', '#', '@']) {
            return Err(invalid());
        }

        let (host, port) = if let Some(bracketed) = netloc.strip_prefix('[') {
            let (host, rest) = bracketed.split_once(']').ok_or_else(invalid)?;
            let port = rest.strip_prefix(':').ok_or_else(invalid)?;
            let host = host.parse::<Ipv6Addr>().map_err(|_| invalid())?;
            (host.to_string(), port)
        } else {
            let (host, port) = netloc.rsplit_once(':').ok_or_else(invalid)?;
            let well_formed = !host.is_empty()
                && host
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
            if !well_formed {
                return Err(invalid());
            }
            (host.to_ascii_lowercase(), port)
        };

        let port = match port.parse::<u16>() {
            Ok(port) if port != 0 => port,
            _ => return Err(invalid()),
        };

        Ok(Self { host, port })
    }
}

impl FromStr for PeerAddress {
    type Err = ConsensusError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Serialize for PeerAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PeerAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(de::Error::custom)
    }
}

/// The set of peers a node reconciles with.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: RwLock<BTreeSet<PeerAddress>>,
}

impl PeerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an address. Registering a known peer is a no-op.
    pub fn register(&self, address: &str) -> Result<PeerAddress> {
        let peer = PeerAddress::parse(address)?;
        if self.peers.write().insert(peer.clone()) {
            tracing::info!(peer = %peer, "registered peer");
        }
        Ok(peer)
    }

    /// Registers every address, or none of them if any fails to parse.
    pub fn register_all<I, S>(&self, addresses: I) -> Result<Vec<PeerAddress>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = addresses
            .into_iter()
            .map(|address| PeerAddress::parse(address.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let mut peers = self.peers.write();
        for peer in &parsed {
            if peers.insert(peer.clone()) {
                tracing::info!(peer = %peer, "registered peer");
            }
        }

        Ok(parsed)
    }

    /// Returns a snapshot of the known peers in address order.
    pub fn members(&self) -> BTreeSet<PeerAddress> {
        self.peers.read().clone()
    }

    /// Returns true if the peer is known.
    pub fn contains(&self, peer: &PeerAddress) -> bool {
        self.peers.read().contains(peer)
    }

    /// Returns the number of known peers.
    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    /// Returns true if no peer is known.
    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> String {
        PeerAddress::parse(s).unwrap().to_string()
    }

    #[test]
    fn test_parse_forms() {
        assert_eq!(addr("10.0.0.5:5000"), "10.0.0.5:5000");
        assert_eq!(addr("  Node-A.Local:80 "), "node-a.local:80");
        assert_eq!(addr("http://192.168.0.5:5000"), "192.168.0.5:5000");
        assert_eq!(addr("HTTPS://example.com:8443/chain?x=1"), "example.com:8443");
        assert_eq!(addr("[::1]:5000"), "[::1]:5000");
        assert_eq!(addr("http://[2001:DB8:0:0::1]:9/"), "[2001:db8::1]:9");
    }

    #[test]
    fn test_parse_parts() {
        let peer = PeerAddress::parse("[::1]:5000").unwrap();
        assert_eq!(peer.host(), "::1");
        assert_eq!(peer.port(), 5000);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "",
            "localhost",
            "http://localhost",
            "10.0.0.5:",
            ":5000",
            "10.0.0.5:0",
            "10.0.0.5:65536",
            "10.0.0.5:port",
            "ftp://10.0.0.5:21",
            "user@10.0.0.5:5000",
            "10.0.0.5:5000/chain",
            "host name:5000",
            "::1:5000",
            "[::1]5000",
            "[not-v6]:5000",
        ] {
            assert_eq!(
                PeerAddress::parse(input),
                Err(ConsensusError::InvalidAddress(input.to_string())),
                "input {input:?}"
            );
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = PeerRegistry::new();

        registry.register("10.0.0.5:5000").unwrap();
        registry.register("10.0.0.5:5000").unwrap();
        registry.register("http://10.0.0.5:5000/").unwrap();

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_rejects_invalid() {
        let registry = PeerRegistry::new();

        assert!(registry.register("not an address").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_all_is_atomic() {
        let registry = PeerRegistry::new();

        let result = registry.register_all(["10.0.0.1:5000", "bogus", "10.0.0.2:5000"]);
        assert!(matches!(result, Err(ConsensusError::InvalidAddress(_))));
        assert!(registry.is_empty());

        let added = registry
            .register_all(vec!["10.0.0.2:5000".to_string(), "10.0.0.1:5000".to_string()])
            .unwrap();
        assert_eq!(added.len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_members_ordered() {
        let registry = PeerRegistry::new();
        for peer in ["node-b:5000", "node-a:6000", "node-a:5000"] {
            registry.register(peer).unwrap();
        }

        let members: Vec<String> = registry.members().iter().map(ToString::to_string).collect();
        assert_eq!(members, vec!["node-a:5000", "node-a:6000", "node-b:5000"]);
        assert!(registry.contains(&PeerAddress::parse("NODE-B:5000").unwrap()));
    }

    #[test]
    fn test_serde_as_string() {
        let peer = PeerAddress::parse("http://Example.com:80").unwrap();
        assert_eq!(serde_json::to_string(&peer).unwrap(), "\"example.com:80\"");

        let decoded: PeerAddress = serde_json::from_str("\"example.com:80\"").unwrap();
        assert_eq!(decoded, peer);
        assert!(serde_json::from_str::<PeerAddress>("\"example.com\"").is_err());
    }
}

//! Host blacklisting
//!
//! Resolves the target host before any connection is made and refuses
//! loopback, private, link-local and other non-public addresses.

use super::Agent;
use crate::error::FetchError;
use crate::http::{Request, Response};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, warn};
use url::{Host, Url};

/// Hostname resolution used by [`BlacklistingAgent`]
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve `hostname` to its addresses
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, FetchError>;
}

/// Resolver backed by the operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

#[async_trait]
impl Resolve for SystemResolver {
    async fn resolve(&self, hostname: &str) -> Result<Vec<IpAddr>, FetchError> {
        let addrs = tokio::net::lookup_host((hostname, 0))
            .await
            .map_err(|e| FetchError::DnsFailure {
                hostname: hostname.to_string(),
                reason: e.to_string(),
            })?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

/// Agent wrapper that forbids requests to internal addresses
pub struct BlacklistingAgent<A> {
    inner: A,
    resolver: Arc<dyn Resolve>,
}

impl<A> BlacklistingAgent<A> {
    /// Wrap `inner`, resolving hosts through system DNS
    pub fn new(inner: A) -> Self {
        Self::with_resolver(inner, Arc::new(SystemResolver))
    }

    /// Wrap `inner` with a custom resolver
    pub fn with_resolver(inner: A, resolver: Arc<dyn Resolve>) -> Self {
        Self { inner, resolver }
    }

    /// Fail with `BlacklistedHost` if `url` points at a blocked address
    pub async fn check(&self, url: &Url) -> Result<(), FetchError> {
        let host = url
            .host()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{url} has no host")))?;

        let (hostname, addresses) = match host {
            Host::Ipv4(ip) => (ip.to_string(), vec![IpAddr::V4(ip)]),
            Host::Ipv6(ip) => (ip.to_string(), vec![IpAddr::V6(ip)]),
            Host::Domain(domain) => (domain.to_string(), self.resolver.resolve(domain).await?),
        };

        if addresses.is_empty() {
            return Err(FetchError::DnsFailure {
                hostname,
                reason: "no addresses found".to_string(),
            });
        }

        if let Some(&address) = addresses.iter().find(|ip| is_blocked_address(**ip)) {
            warn!(%hostname, %address, "Refusing request to blacklisted host");
            return Err(FetchError::BlacklistedHost { hostname, address });
        }

        debug!(%hostname, ?addresses, "Host passed blacklist check");
        Ok(())
    }
}

#[async_trait]
impl<A: Agent> Agent for BlacklistingAgent<A> {
    async fn request(&self, request: Request) -> Result<Response, FetchError> {
        self.check(&request.url).await?;
        self.inner.request(request).await
    }
}

/// Returns true for addresses that must never be fetched
pub fn is_blocked_address(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_ipv4(v4),
        IpAddr::V6(v6) => is_blocked_ipv6(v6),
    }
}

fn is_blocked_ipv4(addr: Ipv4Addr) -> bool {
    let octets = addr.octets();
    addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_unspecified()
        || addr.is_broadcast()
        || addr.is_documentation()
        || octets[0] == 0
        // 198.18.0.0/15 benchmarking
        || (octets[0] == 198 && (octets[1] & 0xfe) == 18)
        // 240.0.0.0/4 reserved
        || octets[0] >= 240
}

fn is_blocked_ipv6(addr: Ipv6Addr) -> bool {
    if let Some(v4) = embedded_ipv4(addr) {
        return is_blocked_ipv4(v4);
    }
    let first = addr.segments()[0];
    addr.is_loopback()
        || addr.is_unspecified()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (first & 0xffc0) == 0xfe80
}

/// IPv4 address carried by an IPv4-mapped (`::ffff:a.b.c.d`),
/// IPv4-compatible (`::a.b.c.d`) or NAT64 (`64:ff9b::a.b.c.d`) address
fn embedded_ipv4(addr: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = addr.to_ipv4_mapped() {
        return Some(v4);
    }
    let segments = addr.segments();
    let [.., a, b, c, d] = addr.octets();
    match segments {
        // ::1 and :: keep their IPv6 meaning
        [0, 0, 0, 0, 0, 0, _, _] if !addr.is_loopback() && !addr.is_unspecified() => {
            Some(Ipv4Addr::new(a, b, c, d))
        }
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] => Some(Ipv4Addr::new(a, b, c, d)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_ipv4() {
        for ip in [
            "127.0.0.1",
            "127.255.0.7",
            "10.0.0.1",
            "172.16.0.1",
            "172.31.255.255",
            "192.168.0.1",
            "169.254.0.1",
            "169.254.169.254",
            "0.0.0.0",
            "0.1.2.3",
            "255.255.255.255",
            "198.18.0.1",
            "240.0.0.1",
        ] {
            assert!(is_blocked_address(ip.parse().unwrap()), "{ip} should be blocked");
        }
    }

    #[test]
    fn test_public_ipv4() {
        for ip in ["8.8.8.8", "1.1.1.1", "172.32.0.1", "93.184.216.34", "198.20.0.1"] {
            assert!(!is_blocked_address(ip.parse().unwrap()), "{ip} should be allowed");
        }
    }

    #[test]
    fn test_ipv6() {
        for ip in ["::1", "::", "fe80::1", "fc00::1", "fd12:3456::1", "::ffff:127.0.0.1"] {
            assert!(is_blocked_address(ip.parse().unwrap()), "{ip} should be blocked");
        }
        for ip in ["2001:4860:4860::8888", "::ffff:8.8.8.8"] {
            assert!(!is_blocked_address(ip.parse().unwrap()), "{ip} should be allowed");
        }
    }

    #[test]
    fn test_ipv6_embedded_ipv4() {
        for ip in [
            "::127.0.0.1",
            "::10.0.0.1",
            "::169.254.169.254",
            "64:ff9b::127.0.0.1",
            "64:ff9b::192.168.1.1",
            "64:ff9b::a9fe:a9fe",
        ] {
            assert!(is_blocked_address(ip.parse().unwrap()), "{ip} should be blocked");
        }
        for ip in ["::8.8.8.8", "64:ff9b::8.8.8.8", "64:ff9b:1::a00:1"] {
            assert!(!is_blocked_address(ip.parse().unwrap()), "{ip} should be allowed");
        }
    }
}

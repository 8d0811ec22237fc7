use serde::{Deserialize, Serialize};

use crate::config::is_false;
use crate::parser::Endpoint;

// ============================================================================
// Outbound Enum
// ============================================================================

/// Outbound configuration enum
///
/// Only the outbound types this converter emits: one Hysteria2 outbound per
/// node, a selector grouping them, and a block outbound when ad blocking is
/// requested.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    /// Hysteria2 outbound
    Hysteria2(Hysteria2Outbound),
    /// Block outbound (discards matched traffic)
    Block(BlockOutbound),
    /// Selector outbound (manual node selection)
    Selector(SelectorOutbound),
}

impl Outbound {
    /// Returns the tag of this outbound
    pub fn tag(&self) -> &str {
        match self {
            Outbound::Hysteria2(o) => &o.tag,
            Outbound::Block(o) => &o.tag,
            Outbound::Selector(o) => &o.tag,
        }
    }
}

// ============================================================================
// Hysteria2
// ============================================================================

/// Hysteria2 outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Hysteria2Outbound {
    /// Outbound tag (node display name)
    pub tag: String,

    /// Server address
    pub server: String,

    /// Server port
    pub server_port: u16,

    /// Authentication password
    pub password: String,

    /// Upload bandwidth in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_mbps: Option<u32>,

    /// Download bandwidth in Mbps
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_mbps: Option<u32>,

    /// QUIC traffic obfuscation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<Hysteria2Obfs>,

    /// TLS configuration (always present, Hysteria2 requires TLS)
    pub tls: OutboundTls,
}

/// Hysteria2 obfuscation settings
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Hysteria2Obfs {
    /// Obfuscation type, currently only "salamander"
    #[serde(rename = "type")]
    pub obfs_type: String,

    /// Obfuscation password
    pub password: String,
}

/// TLS settings for an outbound
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct OutboundTls {
    /// Enable TLS
    pub enabled: bool,

    /// Skip certificate verification
    #[serde(default, skip_serializing_if = "is_false")]
    pub insecure: bool,

    /// Server name for SNI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_name: Option<String>,

    /// ALPN protocols to offer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alpn: Vec<String>,

    /// Custom CA certificate, one line per element
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate: Vec<String>,
}

impl Hysteria2Outbound {
    /// Builds a Hysteria2 outbound from a parsed endpoint.
    ///
    /// `default_alpn` fills in when the endpoint carries no ALPN of its own;
    /// an empty slice leaves ALPN unset. Obfuscation is emitted only when the
    /// endpoint has both an obfs type and a password.
    pub fn from_endpoint(endpoint: &Endpoint, default_alpn: &[String]) -> Self {
        let alpn = if endpoint.alpn.is_empty() {
            default_alpn.to_vec()
        } else {
            endpoint.alpn.clone()
        };

        let obfs = match (&endpoint.obfs, &endpoint.obfs_password) {
            (Some(obfs_type), Some(password)) => Some(Hysteria2Obfs {
                obfs_type: obfs_type.clone(),
                password: password.clone(),
            }),
            _ => None,
        };

        let certificate = endpoint
            .ca
            .as_deref()
            .map(|ca| ca.lines().map(str::to_string).collect())
            .unwrap_or_default();

        Self {
            tag: endpoint.tag.clone(),
            server: endpoint.address.clone(),
            server_port: endpoint.port,
            password: endpoint.password.clone(),
            up_mbps: endpoint.up_mbps,
            down_mbps: endpoint.down_mbps,
            obfs,
            tls: OutboundTls {
                enabled: true,
                insecure: endpoint.insecure,
                server_name: endpoint.sni.clone(),
                alpn,
                certificate,
            },
        }
    }
}

// ============================================================================
// Block and Selector
// ============================================================================

/// Block outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct BlockOutbound {
    /// Outbound tag
    pub tag: String,
}

/// Selector outbound configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SelectorOutbound {
    /// Outbound tag
    pub tag: String,

    /// Member outbound tags, in subscription order
    pub outbounds: Vec<String>,

    /// Initially selected member
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint {
            tag: "node-0".to_string(),
            address: "1.2.3.4".to_string(),
            port: 443,
            password: "secret".to_string(),
            sni: Some("example.com".to_string()),
            insecure: false,
            alpn: Vec::new(),
            obfs: None,
            obfs_password: None,
            up_mbps: None,
            down_mbps: None,
            ca: None,
        }
    }

    #[test]
    fn test_from_endpoint_basic_fields() {
        let out = Hysteria2Outbound::from_endpoint(&endpoint(), &["h3".to_string()]);
        assert_eq!(out.tag, "node-0");
        assert_eq!(out.server, "1.2.3.4");
        assert_eq!(out.server_port, 443);
        assert_eq!(out.password, "secret");
        assert!(out.tls.enabled);
        assert_eq!(out.tls.server_name.as_deref(), Some("example.com"));
        assert_eq!(out.tls.alpn, vec!["h3"]);
    }

    #[test]
    fn test_from_endpoint_own_alpn_wins_over_default() {
        let mut ep = endpoint();
        ep.alpn = vec!["h3".to_string(), "h2".to_string()];
        let out = Hysteria2Outbound::from_endpoint(&ep, &["spdy".to_string()]);
        assert_eq!(out.tls.alpn, vec!["h3", "h2"]);
    }

    #[test]
    fn test_from_endpoint_empty_default_alpn_leaves_alpn_unset() {
        let out = Hysteria2Outbound::from_endpoint(&endpoint(), &[]);
        assert!(out.tls.alpn.is_empty());
        let json = serde_json::to_string(&out).unwrap();
        assert!(!json.contains("\"alpn\""));
    }

    #[test]
    fn test_from_endpoint_obfs_requires_password() {
        let mut ep = endpoint();
        ep.obfs = Some("salamander".to_string());
        let out = Hysteria2Outbound::from_endpoint(&ep, &[]);
        assert!(out.obfs.is_none());

        ep.obfs_password = Some("obfs-pass".to_string());
        let out = Hysteria2Outbound::from_endpoint(&ep, &[]);
        let obfs = out.obfs.unwrap();
        assert_eq!(obfs.obfs_type, "salamander");
        assert_eq!(obfs.password, "obfs-pass");
    }

    #[test]
    fn test_from_endpoint_ca_splits_into_lines() {
        let mut ep = endpoint();
        ep.ca = Some("-----BEGIN CERTIFICATE-----\nMIIB\n-----END CERTIFICATE-----".to_string());
        let out = Hysteria2Outbound::from_endpoint(&ep, &[]);
        assert_eq!(out.tls.certificate.len(), 3);
        assert_eq!(out.tls.certificate[1], "MIIB");
    }

    #[test]
    fn test_serialization_tagged_type() {
        let out = Outbound::Hysteria2(Hysteria2Outbound::from_endpoint(&endpoint(), &[]));
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.starts_with("{\"type\":\"hysteria2\""));
        assert!(!json.contains("\"insecure\""));
        assert!(!json.contains("\"up_mbps\""));
    }

    #[test]
    fn test_selector_serialization() {
        let sel = Outbound::Selector(SelectorOutbound {
            tag: "proxy".to_string(),
            outbounds: vec!["a".to_string(), "b".to_string()],
            default: Some("a".to_string()),
        });
        let json = serde_json::to_string(&sel).unwrap();
        assert_eq!(
            json,
            r#"{"type":"selector","tag":"proxy","outbounds":["a","b"],"default":"a"}"#
        );
    }

    #[test]
    fn test_outbound_tag_accessor() {
        let block = Outbound::Block(BlockOutbound {
            tag: "block".to_string(),
        });
        assert_eq!(block.tag(), "block");
    }
}

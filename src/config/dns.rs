use serde::{Deserialize, Serialize};

/// DNS configuration
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Dns {
    /// DNS servers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<DnsServer>,

    /// DNS routing rules, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<DnsRule>,

    /// Server tag used when no rule matches
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "final")]
    pub final_server: Option<String>,
}

/// A single DNS server entry
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DnsServer {
    /// Server tag referenced by rules
    pub tag: String,

    /// Server address (DoH URL or "local")
    pub address: String,

    /// Outbound used to reach this server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detour: Option<String>,
}

/// A DNS routing rule
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct DnsRule {
    /// Geosite categories to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geosite: Vec<String>,

    /// Domain suffixes to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_suffix: Vec<String>,

    /// Server tag for matched queries
    pub server: String,
}

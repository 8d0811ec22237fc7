use serde::{Deserialize, Serialize};

// ============================================================================
// Route Configuration
// ============================================================================

/// Route configuration
///
/// Rules are ordered; the first matching rule wins. `final` names the
/// outbound for unmatched traffic.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Route {
    /// Route rules, evaluated in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RouteRule>,

    /// Remote rule-set definitions referenced by the rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_set: Vec<RuleSet>,

    /// Default outbound tag for unmatched traffic
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "final")]
    pub final_outbound: Option<String>,
}

/// A downloadable rule-set definition
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RuleSet {
    /// Source type, currently always "remote"
    #[serde(rename = "type")]
    pub set_type: String,

    /// Payload format, currently always "binary"
    pub format: String,

    /// Download URL
    pub url: String,

    /// Tag referenced by rule matchers
    pub tag: String,

    /// Outbound used for the download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_detour: Option<String>,

    /// Refresh interval
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<String>,
}

impl RuleSet {
    /// Remote binary rule set downloaded through `detour`, refreshed weekly
    pub fn remote(url: impl Into<String>, tag: impl Into<String>, detour: &str) -> Self {
        Self {
            set_type: "remote".to_string(),
            format: "binary".to_string(),
            url: url.into(),
            tag: tag.into(),
            download_detour: Some(detour.to_string()),
            update_interval: Some("168h".to_string()),
        }
    }
}

/// A single route rule
///
/// Matcher fields serialize before the target outbound; empty matchers are
/// omitted entirely.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RouteRule {
    /// IP CIDR blocks to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_cidr: Vec<String>,

    /// Exact domains to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,

    /// Domain suffixes to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_suffix: Vec<String>,

    /// Geosite categories to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geosite: Vec<String>,

    /// GeoIP country codes to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub geoip: Vec<String>,

    /// Rule-set tags to match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_set: Vec<String>,

    /// Target outbound tag
    pub outbound: String,
}

impl RouteRule {
    /// Rule routing traffic for the given domain suffixes
    pub fn domain_suffixes<I, S>(suffixes: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain_suffix: suffixes.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }

    /// Rule routing traffic for the given exact domains
    pub fn domains<I, S>(domains: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain: domains.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }

    /// Rule routing traffic for the given IP CIDR blocks
    pub fn ip_cidrs<I, S>(cidrs: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ip_cidr: cidrs.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }

    /// Rule routing traffic for the given geosite categories
    pub fn geosites<I, S>(categories: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            geosite: categories.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }

    /// Rule routing traffic for the given GeoIP country codes
    pub fn geoips<I, S>(countries: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            geoip: countries.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }

    /// Rule routing traffic for the given rule-set tags
    pub fn rule_sets<I, S>(tags: I, outbound: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rule_set: tags.into_iter().map(Into::into).collect(),
            outbound: outbound.to_string(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

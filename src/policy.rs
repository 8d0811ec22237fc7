//! Routing policy configuration
//!
//! A [`PolicyConfig`] controls rule synthesis for one conversion. Process-wide
//! defaults are read from the environment exactly once at startup
//! ([`PolicyConfig::from_env`]) and passed by value into every request path;
//! per-request overlays ([`PolicyOverlay`]) are plain value merges where the
//! request wins. Nothing reads the environment mid-request.

use serde::Deserialize;
use tracing::debug;

use crate::parser::split_csv;

/// Environment variable names for process-wide defaults
pub const ENV_RULES_PRESET: &str = "RULES_PRESET";
pub const ENV_ENABLE_CN_RULES: &str = "ENABLE_CN_RULES";
pub const ENV_ENABLE_ADBLOCK: &str = "ENABLE_ADBLOCK";
pub const ENV_ENABLE_DOH_DIRECT: &str = "ENABLE_DOH_DIRECT";
pub const ENV_STRICT_GLOBAL_PROXY: &str = "STRICT_GLOBAL_PROXY";
pub const ENV_BYPASS_DOMAINS: &str = "BYPASS_DOMAINS";
pub const ENV_PROXY_DOMAINS: &str = "PROXY_DOMAINS";
pub const ENV_DEFAULT_ALPN: &str = "DEFAULT_ALPN";
pub const ENV_USE_RULE_SET: &str = "USE_RULE_SET";
pub const ENV_RULE_SET_BASE: &str = "RULE_SET_BASE";

/// Fallback ALPN applied when neither node nor request nor env provides one
const BUILTIN_DEFAULT_ALPN: &str = "h3";

/// Default download location for remote rule sets
pub const DEFAULT_RULE_SET_BASE: &str =
    "https://raw.githubusercontent.com/Loyalsoldier/sing-box-rules/release/rule-set";

// ============================================================================
// Rule Presets
// ============================================================================

/// Named base rule templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesPreset {
    /// CN addresses and domains direct, everything else via proxy
    CnDirect,
    /// Everything direct
    GlobalDirect,
    /// Everything via proxy
    GlobalProxy,
    /// Only the listed proxy domains via proxy, rest direct
    ProxyDomainsOnly,
    /// Only the listed bypass domains direct, rest via proxy
    DirectDomainsOnly,
}

impl RulesPreset {
    /// Parses a preset name, accepting the alias spellings providers use
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cn_direct" | "cn-direct" | "cn" => Some(Self::CnDirect),
            "global_direct" | "direct_all" | "direct" => Some(Self::GlobalDirect),
            "global_proxy" | "proxy_all" | "proxy" => Some(Self::GlobalProxy),
            "proxy_domains_only" | "proxy_only" => Some(Self::ProxyDomainsOnly),
            "direct_domains_only" | "bypass_only" => Some(Self::DirectDomainsOnly),
            _ => None,
        }
    }
}

// ============================================================================
// Policy Configuration
// ============================================================================

/// Routing/rule toggles for one conversion.
///
/// Constructed fresh per request from [`PolicyOverlay`] applied on top of the
/// process-wide defaults; never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Base rule template; `None` behaves like [`RulesPreset::GlobalProxy`]
    /// without emitting CN rules
    pub rules_preset: Option<RulesPreset>,
    /// Force CN-direct rules regardless of preset
    pub enable_cn_rules: bool,
    /// Route advertising domains to a block outbound
    pub enable_adblock: bool,
    /// Route well-known DNS-over-HTTPS domains direct
    pub enable_doh_direct: bool,
    /// Explicitly assert proxy for non-CN domains
    pub strict_global_proxy: bool,
    /// Domains routed direct, layered on the preset
    pub bypass_domains: Vec<String>,
    /// Domains routed via proxy, layered on the preset
    pub proxy_domains: Vec<String>,
    /// Fallback ALPN for endpoints lacking one; empty disables the fallback
    pub default_alpn: Vec<String>,
    /// Match CN/adblock/non-CN via remote rule sets instead of legacy
    /// geosite/geoip fields
    pub use_rule_set: bool,
    /// Base URL for remote rule-set downloads, no trailing slash
    pub rule_set_base: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            rules_preset: None,
            enable_cn_rules: false,
            enable_adblock: false,
            enable_doh_direct: false,
            strict_global_proxy: false,
            bypass_domains: Vec::new(),
            proxy_domains: Vec::new(),
            default_alpn: vec![BUILTIN_DEFAULT_ALPN.to_string()],
            use_rule_set: true,
            rule_set_base: DEFAULT_RULE_SET_BASE.to_string(),
        }
    }
}

impl PolicyConfig {
    /// Builds the process-wide default policy from the environment.
    ///
    /// Called once at startup; the result is passed by value everywhere.
    pub fn from_env() -> Self {
        let preset = std::env::var(ENV_RULES_PRESET)
            .ok()
            .and_then(|v| RulesPreset::parse(&v));

        let default_alpn = match std::env::var(ENV_DEFAULT_ALPN) {
            Ok(v) => split_csv(&v),
            Err(_) => vec![BUILTIN_DEFAULT_ALPN.to_string()],
        };

        let rule_set_base = std::env::var(ENV_RULE_SET_BASE)
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_RULE_SET_BASE.to_string());

        let config = Self {
            rules_preset: preset,
            enable_cn_rules: env_bool(ENV_ENABLE_CN_RULES),
            enable_adblock: env_bool(ENV_ENABLE_ADBLOCK),
            enable_doh_direct: env_bool(ENV_ENABLE_DOH_DIRECT),
            strict_global_proxy: env_bool(ENV_STRICT_GLOBAL_PROXY),
            bypass_domains: env_csv(ENV_BYPASS_DOMAINS),
            proxy_domains: env_csv(ENV_PROXY_DOMAINS),
            default_alpn,
            use_rule_set: env_bool_or(ENV_USE_RULE_SET, true),
            rule_set_base,
        };
        debug!("Policy defaults from environment: {:?}", config);
        config
    }

    /// Applies request parameters on top of these defaults (request wins)
    pub fn overlay(&self, overlay: &PolicyOverlay) -> Self {
        let mut merged = self.clone();
        if let Some(preset) = overlay.rules_preset.as_deref() {
            merged.rules_preset = RulesPreset::parse(preset);
        }
        if let Some(v) = overlay.enable_adblock {
            merged.enable_adblock = v;
        }
        if let Some(v) = overlay.enable_doh_direct {
            merged.enable_doh_direct = v;
        }
        if let Some(v) = overlay.strict_global_proxy {
            merged.strict_global_proxy = v;
        }
        if let Some(v) = overlay.bypass_domains.as_deref() {
            merged.bypass_domains = split_csv(v);
        }
        if let Some(v) = overlay.proxy_domains.as_deref() {
            merged.proxy_domains = split_csv(v);
        }
        if let Some(v) = overlay.default_alpn.as_deref() {
            // An explicitly empty value disables the ALPN fallback
            merged.default_alpn = split_csv(v);
        }
        if let Some(v) = overlay.use_rule_set {
            merged.use_rule_set = v;
        }
        merged
    }

    /// Whether CN-direct rules are active (preset or env toggle)
    pub fn cn_rules_active(&self) -> bool {
        self.enable_cn_rules || self.rules_preset == Some(RulesPreset::CnDirect)
    }
}

/// Per-request policy parameters, all optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyOverlay {
    pub rules_preset: Option<String>,
    pub enable_adblock: Option<bool>,
    pub enable_doh_direct: Option<bool>,
    pub strict_global_proxy: Option<bool>,
    /// Comma-separated domain list
    pub bypass_domains: Option<String>,
    /// Comma-separated domain list
    pub proxy_domains: Option<String>,
    /// Comma-separated ALPN list; empty string disables the fallback
    pub default_alpn: Option<String>,
    pub use_rule_set: Option<bool>,
}

// ============================================================================
// Environment Helpers
// ============================================================================

/// Reads a truthy environment toggle (`1`/`true`/`yes`/`on`)
fn env_bool(name: &str) -> bool {
    env_bool_or(name, false)
}

/// Reads a truthy environment toggle, falling back to `default` when unset
fn env_bool_or(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

/// Reads a comma-separated environment list
fn env_csv(name: &str) -> Vec<String> {
    std::env::var(name).map(|v| split_csv(&v)).unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

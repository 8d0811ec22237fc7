//! Configuration synthesizer
//!
//! Builds the output [`ConfigDocument`] from an ordered list of parsed
//! endpoints and a [`PolicyConfig`]: one Hysteria2 outbound per endpoint, a
//! selector grouping them under the `proxy` tag, a DNS block, and an ordered
//! route rule list derived from the active preset and toggles.

use tracing::{debug, info};

use crate::config::ConfigDocument;
use crate::config::dns::{Dns, DnsRule, DnsServer};
use crate::config::outbound::{
    BlockOutbound, Hysteria2Outbound, Outbound, SelectorOutbound,
};
use crate::config::route::{Route, RouteRule, RuleSet};
use crate::error::{ConvertError, Result};
use crate::parser::Endpoint;
use crate::policy::{PolicyConfig, RulesPreset};

/// Tag of the selector outbound grouping all nodes
pub const SELECTOR_TAG: &str = "proxy";

/// Tag of the on-demand block outbound
pub const BLOCK_TAG: &str = "block";

/// Tag route rules use for traffic that should not go through a node
pub const DIRECT_TAG: &str = "direct";

/// Private and loopback ranges always routed direct, first rule in every
/// document
const PRIVATE_CIDRS: [&str; 7] = [
    "127.0.0.0/8",
    "10.0.0.0/8",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// Well-known DNS-over-HTTPS endpoints routed direct under `enable_doh_direct`
const DOH_DOMAINS: [&str; 5] = [
    "dns.google",
    "cloudflare-dns.com",
    "one.one.one.one",
    "doh.pub",
    "dns.alidns.com",
];

// ============================================================================
// Document Synthesis
// ============================================================================

/// Builds the complete configuration document.
///
/// Fails with [`ConvertError::EmptyNodeSet`] when no endpoint survived
/// parsing. Output is deterministic: identical endpoints and policy always
/// yield an identical document.
pub fn synthesize(endpoints: &[Endpoint], policy: &PolicyConfig) -> Result<ConfigDocument> {
    if endpoints.is_empty() {
        return Err(ConvertError::EmptyNodeSet);
    }

    let mut outbounds: Vec<Outbound> = endpoints
        .iter()
        .map(|ep| Outbound::Hysteria2(Hysteria2Outbound::from_endpoint(ep, &policy.default_alpn)))
        .collect();

    // Selector members are exactly the node tags, in subscription order
    let member_tags: Vec<String> = outbounds.iter().map(|o| o.tag().to_string()).collect();
    let selector = SelectorOutbound {
        tag: SELECTOR_TAG.to_string(),
        outbounds: member_tags.clone(),
        default: member_tags.first().cloned(),
    };

    // Block outbound exists only when something routes to it
    if policy.enable_adblock {
        outbounds.push(Outbound::Block(BlockOutbound {
            tag: BLOCK_TAG.to_string(),
        }));
    }
    outbounds.push(Outbound::Selector(selector));

    let route = build_route(policy);
    let dns = build_dns(policy);

    info!(
        "Synthesized document with {} nodes, {} route rules",
        endpoints.len(),
        route.rules.len()
    );

    Ok(ConfigDocument {
        outbounds,
        dns: Some(dns),
        route: Some(route),
    })
}

// ============================================================================
// Route Rules
// ============================================================================

/// Builds the ordered rule list, rule-set definitions, and final outbound
/// for the active policy.
///
/// With `use_rule_set` on, CN/adblock/non-CN matching goes through remote
/// rule sets; otherwise the same rules fall back to legacy geosite/geoip
/// fields and no rule-set entries are emitted.
fn build_route(policy: &PolicyConfig) -> Route {
    let mut rules = vec![RouteRule::ip_cidrs(PRIVATE_CIDRS, DIRECT_TAG)];
    let mut rule_sets: Vec<RuleSet> = Vec::new();

    if policy.enable_doh_direct {
        rules.push(RouteRule::domains(DOH_DOMAINS, DIRECT_TAG));
    }

    if policy.cn_rules_active() {
        if policy.use_rule_set {
            rule_sets.push(remote_rule_set(policy, "geoip-cn.srs", "geoip-cn"));
            rule_sets.push(remote_rule_set(
                policy,
                "geosite-geolocation-cn.srs",
                "geosite-geolocation-cn",
            ));
            rules.push(RouteRule::rule_sets(["geoip-cn"], DIRECT_TAG));
            rules.push(RouteRule::rule_sets(["geosite-geolocation-cn"], DIRECT_TAG));
        } else {
            rules.push(RouteRule::geoips(["cn"], DIRECT_TAG));
            rules.push(RouteRule::geosites(["geolocation-cn", "cn"], DIRECT_TAG));
        }
    }

    if policy.enable_adblock {
        if policy.use_rule_set {
            rule_sets.push(remote_rule_set(
                policy,
                "geosite-category-ads-all.srs",
                "ads-all",
            ));
            rules.push(RouteRule::rule_sets(["ads-all"], BLOCK_TAG));
        } else {
            rules.push(RouteRule::geosites(["category-ads-all"], BLOCK_TAG));
        }
    }

    // Explicit domain lists outrank preset-implied behavior; each list is
    // emitted at most once. Under proxy_domains_only the final is already
    // direct, so a bypass rule would be redundant (and vice versa).
    if !policy.bypass_domains.is_empty()
        && policy.rules_preset != Some(RulesPreset::ProxyDomainsOnly)
    {
        rules.push(RouteRule::domains(policy.bypass_domains.clone(), DIRECT_TAG));
    }
    if !policy.proxy_domains.is_empty()
        && policy.rules_preset != Some(RulesPreset::DirectDomainsOnly)
    {
        rules.push(RouteRule::domains(policy.proxy_domains.clone(), SELECTOR_TAG));
    }

    if policy.strict_global_proxy {
        if policy.use_rule_set {
            rule_sets.push(remote_rule_set(
                policy,
                "geosite-geolocation-!cn.srs",
                "geolocation-not-cn",
            ));
            rules.push(RouteRule::rule_sets(["geolocation-not-cn"], SELECTOR_TAG));
        } else {
            rules.push(RouteRule::geosites(["geolocation-!cn"], SELECTOR_TAG));
        }
    }

    let final_outbound = final_outbound_for(policy);
    debug!(
        "Route: {} rules, {} rule sets, final outbound {:?}",
        rules.len(),
        rule_sets.len(),
        final_outbound
    );

    Route {
        rules,
        rule_set: rule_sets,
        final_outbound: Some(final_outbound),
    }
}

/// Remote binary rule set under the policy's download base
fn remote_rule_set(policy: &PolicyConfig, file: &str, tag: &str) -> RuleSet {
    RuleSet::remote(
        format!("{}/{}", policy.rule_set_base.trim_end_matches('/'), file),
        tag,
        SELECTOR_TAG,
    )
}

/// Maps the active preset to the fallback outbound
fn final_outbound_for(policy: &PolicyConfig) -> String {
    match policy.rules_preset {
        Some(RulesPreset::GlobalDirect) | Some(RulesPreset::ProxyDomainsOnly) => {
            DIRECT_TAG.to_string()
        }
        _ => SELECTOR_TAG.to_string(),
    }
}

// ============================================================================
// DNS
// ============================================================================

/// Builds the DNS block: remote DoH resolution through the selector, local
/// resolver for traffic that stays direct
fn build_dns(policy: &PolicyConfig) -> Dns {
    let servers = vec![
        DnsServer {
            tag: "dns-remote".to_string(),
            address: "https://1.1.1.1/dns-query".to_string(),
            detour: Some(SELECTOR_TAG.to_string()),
        },
        DnsServer {
            tag: "dns-local".to_string(),
            address: "local".to_string(),
            detour: Some(DIRECT_TAG.to_string()),
        },
    ];

    let mut rules = Vec::new();
    if policy.cn_rules_active() {
        rules.push(DnsRule {
            geosite: vec!["cn".to_string()],
            domain_suffix: Vec::new(),
            server: "dns-local".to_string(),
        });
    }

    Dns {
        servers,
        rules,
        final_server: Some("dns-remote".to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(tag: &str) -> Endpoint {
        Endpoint {
            tag: tag.to_string(),
            address: "1.2.3.4".to_string(),
            port: 443,
            password: "secret".to_string(),
            sni: None,
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
    fn test_empty_node_set_rejected() {
        let result = synthesize(&[], &PolicyConfig::default());
        assert!(matches!(result, Err(ConvertError::EmptyNodeSet)));
    }

    #[test]
    fn test_selector_lists_tags_in_order() {
        let endpoints = vec![endpoint("NodeA"), endpoint("NodeB")];
        let doc = synthesize(&endpoints, &PolicyConfig::default()).unwrap();

        let selector = doc
            .outbounds
            .iter()
            .find_map(|o| match o {
                Outbound::Selector(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert_eq!(selector.tag, SELECTOR_TAG);
        assert_eq!(selector.outbounds, vec!["NodeA", "NodeB"]);
        assert_eq!(selector.default.as_deref(), Some("NodeA"));
    }

    #[test]
    fn test_selector_is_last_outbound() {
        let doc = synthesize(&[endpoint("a")], &PolicyConfig::default()).unwrap();
        assert!(matches!(doc.outbounds.last(), Some(Outbound::Selector(_))));
    }

    #[test]
    fn test_block_outbound_only_with_adblock() {
        let endpoints = vec![endpoint("a")];

        let doc = synthesize(&endpoints, &PolicyConfig::default()).unwrap();
        assert!(!doc.outbounds.iter().any(|o| o.tag() == BLOCK_TAG));

        let policy = PolicyConfig {
            enable_adblock: true,
            ..PolicyConfig::default()
        };
        let doc = synthesize(&endpoints, &policy).unwrap();
        assert!(doc.outbounds.iter().any(|o| o.tag() == BLOCK_TAG));
        // Block comes before the selector, and the selector does not list it
        let selector = doc
            .outbounds
            .iter()
            .find_map(|o| match o {
                Outbound::Selector(s) => Some(s),
                _ => None,
            })
            .unwrap();
        assert!(!selector.outbounds.contains(&BLOCK_TAG.to_string()));
    }

    #[test]
    fn test_private_cidrs_always_first_rule() {
        let doc = synthesize(&[endpoint("a")], &PolicyConfig::default()).unwrap();
        let route = doc.route.unwrap();
        let first = &route.rules[0];
        assert_eq!(first.outbound, DIRECT_TAG);
        assert!(first.ip_cidr.contains(&"127.0.0.0/8".to_string()));
        assert!(first.ip_cidr.contains(&"fc00::/7".to_string()));
    }

    #[test]
    fn test_default_final_is_proxy() {
        let doc = synthesize(&[endpoint("a")], &PolicyConfig::default()).unwrap();
        let route = doc.route.unwrap();
        assert_eq!(route.final_outbound.as_deref(), Some(SELECTOR_TAG));
        // No preset, no toggles: only the private-range rule
        assert_eq!(route.rules.len(), 1);
    }

    #[test]
    fn test_cn_direct_preset_rule_set_mode() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let route = doc.route.unwrap();
        assert_eq!(route.final_outbound.as_deref(), Some(SELECTOR_TAG));

        assert!(route
            .rules
            .iter()
            .any(|r| r.rule_set == vec!["geoip-cn"] && r.outbound == DIRECT_TAG));
        assert!(route
            .rules
            .iter()
            .any(|r| r.rule_set == vec!["geosite-geolocation-cn"] && r.outbound == DIRECT_TAG));
        // No legacy matchers in rule-set mode
        assert!(route.rules.iter().all(|r| r.geoip.is_empty() && r.geosite.is_empty()));

        let tags: Vec<&str> = route.rule_set.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["geoip-cn", "geosite-geolocation-cn"]);
        let set = &route.rule_set[0];
        assert_eq!(set.set_type, "remote");
        assert_eq!(set.format, "binary");
        assert!(set.url.ends_with("/geoip-cn.srs"));
        assert_eq!(set.download_detour.as_deref(), Some(SELECTOR_TAG));
        assert_eq!(set.update_interval.as_deref(), Some("168h"));
    }

    #[test]
    fn test_cn_direct_preset_legacy_mode() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            use_rule_set: false,
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let route = doc.route.unwrap();
        assert_eq!(route.final_outbound.as_deref(), Some(SELECTOR_TAG));
        assert!(route.rule_set.is_empty());
        assert!(route
            .rules
            .iter()
            .any(|r| r.geoip == vec!["cn"] && r.outbound == DIRECT_TAG));
        assert!(route
            .rules
            .iter()
            .any(|r| r.geosite.contains(&"geolocation-cn".to_string())));
    }

    #[test]
    fn test_adblock_and_strict_rule_sets() {
        let policy = PolicyConfig {
            enable_adblock: true,
            strict_global_proxy: true,
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let route = doc.route.unwrap();

        assert!(route
            .rules
            .iter()
            .any(|r| r.rule_set == vec!["ads-all"] && r.outbound == BLOCK_TAG));
        assert!(route
            .rules
            .iter()
            .any(|r| r.rule_set == vec!["geolocation-not-cn"] && r.outbound == SELECTOR_TAG));
        let tags: Vec<&str> = route.rule_set.iter().map(|s| s.tag.as_str()).collect();
        assert_eq!(tags, vec!["ads-all", "geolocation-not-cn"]);
        assert!(route.rule_set[1].url.ends_with("/geosite-geolocation-!cn.srs"));
    }

    #[test]
    fn test_rule_set_base_override() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            rule_set_base: "https://rules.example/base/".to_string(),
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let route = doc.route.unwrap();
        assert_eq!(route.rule_set[0].url, "https://rules.example/base/geoip-cn.srs");
    }

    #[test]
    fn test_global_direct_final() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::GlobalDirect),
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        assert_eq!(
            doc.route.unwrap().final_outbound.as_deref(),
            Some(DIRECT_TAG)
        );
    }

    #[test]
    fn test_rule_order_doh_before_cn_before_adblock() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            enable_adblock: true,
            enable_doh_direct: true,
            use_rule_set: false,
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let rules = doc.route.unwrap().rules;

        let doh_at = rules
            .iter()
            .position(|r| r.domain.contains(&"dns.google".to_string()))
            .unwrap();
        let cn_at = rules.iter().position(|r| r.geoip == vec!["cn"]).unwrap();
        let adblock_at = rules
            .iter()
            .position(|r| r.outbound == BLOCK_TAG)
            .unwrap();
        assert!(doh_at < cn_at);
        assert!(cn_at < adblock_at);
    }

    #[test]
    fn test_bypass_before_proxy_domains() {
        let policy = PolicyConfig {
            bypass_domains: vec!["intranet.example".to_string()],
            proxy_domains: vec!["blocked.example".to_string()],
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let rules = doc.route.unwrap().rules;
        let bypass_at = rules
            .iter()
            .position(|r| r.outbound == DIRECT_TAG && !r.domain.is_empty())
            .unwrap();
        let proxy_at = rules
            .iter()
            .position(|r| r.outbound == SELECTOR_TAG && !r.domain.is_empty())
            .unwrap();
        assert!(bypass_at < proxy_at);
    }

    #[test]
    fn test_proxy_domains_only_skips_bypass_rule() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::ProxyDomainsOnly),
            bypass_domains: vec!["intranet.example".to_string()],
            proxy_domains: vec!["blocked.example".to_string()],
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let route = doc.route.unwrap();
        assert_eq!(route.final_outbound.as_deref(), Some(DIRECT_TAG));
        assert!(!route
            .rules
            .iter()
            .any(|r| r.domain.contains(&"intranet.example".to_string())));
        assert!(route
            .rules
            .iter()
            .any(|r| r.domain.contains(&"blocked.example".to_string())
                && r.outbound == SELECTOR_TAG));
    }

    #[test]
    fn test_strict_global_proxy_catch_all_is_last_rule() {
        let policy = PolicyConfig {
            strict_global_proxy: true,
            proxy_domains: vec!["blocked.example".to_string()],
            use_rule_set: false,
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let rules = doc.route.unwrap().rules;
        let last = rules.last().unwrap();
        assert_eq!(last.geosite, vec!["geolocation-!cn"]);
        assert_eq!(last.outbound, SELECTOR_TAG);
    }

    #[test]
    fn test_dns_block_present_with_cn_rule() {
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            ..PolicyConfig::default()
        };
        let doc = synthesize(&[endpoint("a")], &policy).unwrap();
        let dns = doc.dns.unwrap();
        assert_eq!(dns.servers.len(), 2);
        assert_eq!(dns.final_server.as_deref(), Some("dns-remote"));
        assert_eq!(dns.rules.len(), 1);
        assert_eq!(dns.rules[0].server, "dns-local");
    }

    #[test]
    fn test_determinism() {
        let endpoints = vec![endpoint("a"), endpoint("b")];
        let policy = PolicyConfig {
            rules_preset: Some(RulesPreset::CnDirect),
            enable_adblock: true,
            ..PolicyConfig::default()
        };
        let first = synthesize(&endpoints, &policy).unwrap().to_json().unwrap();
        let second = synthesize(&endpoints, &policy).unwrap().to_json().unwrap();
        assert_eq!(first, second);
    }
}

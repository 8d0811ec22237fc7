//! sing-box configuration document model
//!
//! Typed model of the generated configuration. Serialization is compact JSON
//! with key order fixed by struct declaration order, so the same endpoint set
//! and policy always produce byte-identical output. Optional fields follow
//! the `skip_serializing_if` discipline: absent means omitted, never `null`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::dns::Dns;
use crate::config::outbound::Outbound;
use crate::config::route::Route;

pub mod dns;
pub mod outbound;
pub mod route;

/// Complete generated configuration document
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct ConfigDocument {
    /// Node outbounds, the selector, and an optional block outbound
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outbounds: Vec<Outbound>,

    /// DNS servers and rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<Dns>,

    /// Route rules and default outbound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
}

impl ConfigDocument {
    /// Serializes to compact deterministic JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize configuration document")
    }

    /// Serializes to pretty-printed JSON for human inspection
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize configuration document")
    }
}

/// Serde helper: skips serializing `false`
pub(crate) fn is_false(value: &bool) -> bool {
    !value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_serializes_to_empty_object() {
        let doc = ConfigDocument::default();
        assert_eq!(doc.to_json().unwrap(), "{}");
    }

    #[test]
    fn test_key_order_is_declaration_order() {
        let doc = ConfigDocument {
            outbounds: vec![Outbound::Block(outbound::BlockOutbound {
                tag: "block".to_string(),
            })],
            dns: Some(Dns::default()),
            route: Some(Route::default()),
        };
        let json = doc.to_json().unwrap();
        let outbounds_at = json.find("\"outbounds\"").unwrap();
        let dns_at = json.find("\"dns\"").unwrap();
        let route_at = json.find("\"route\"").unwrap();
        assert!(outbounds_at < dns_at);
        assert!(dns_at < route_at);
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let doc = ConfigDocument {
            outbounds: vec![Outbound::Block(outbound::BlockOutbound {
                tag: "block".to_string(),
            })],
            dns: None,
            route: Some(Route {
                final_outbound: Some("proxy".to_string()),
                ..Route::default()
            }),
        };
        assert_eq!(doc.to_json().unwrap(), doc.to_json().unwrap());
    }
}

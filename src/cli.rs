use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(version, about = "Convert Hysteria2 subscriptions into sing-box configs", long_about = None)]
pub struct Args {
    #[arg(short, long, global = true, help = "Emit debug log")]
    pub verbose: bool,

    #[arg(
        short,
        long,
        global = true,
        help = "Short-link store path (defaults to SUB_DB_PATH or data/subscriptions.json)"
    )]
    pub store: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Convert subscription text, a single URI, or a subscription URL
    Convert {
        /// Subscription content: hysteria2:// URI, multi-line list, Base64
        /// blob, or http(s) URL to fetch
        input: String,

        #[arg(long, help = "Rules preset (cn_direct, global_direct, global_proxy, proxy_domains_only, direct_domains_only)")]
        preset: Option<String>,

        #[arg(long, help = "Block advertising domains")]
        adblock: bool,

        #[arg(long, help = "Route well-known DoH domains direct")]
        doh_direct: bool,

        #[arg(long, help = "Explicitly assert proxy for non-CN domains")]
        strict_global_proxy: bool,

        #[arg(long, help = "Comma-separated domains routed direct")]
        bypass_domains: Option<String>,

        #[arg(long, help = "Comma-separated domains routed via proxy")]
        proxy_domains: Option<String>,

        #[arg(long, help = "Fallback ALPN list; empty value disables it")]
        default_alpn: Option<String>,

        #[arg(long, help = "Use legacy geosite/geoip matchers instead of remote rule sets")]
        no_rule_set: bool,

        #[arg(long, help = "Skip short-link registration")]
        no_store: bool,

        #[arg(long, help = "Print the decoded JSON document instead of Base64")]
        json: bool,
    },

    /// Resolve a short identifier or full encoded document
    Resolve {
        /// Short identifier or URL-safe Base64 document
        reference: String,

        #[arg(long, value_enum, default_value = "b64", help = "Output representation")]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Encoded Base64 text as stored
    B64,
    /// Decoded JSON document
    Json,
}

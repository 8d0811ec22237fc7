#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use clap::Parser;
use tracing::Level;

use hy2sing::cli::{Args, Command, OutputFormat};
use hy2sing::convert::{ResolveFormat, convert, fetch_if_url, resolve};
use hy2sing::policy::{PolicyConfig, PolicyOverlay};
use hy2sing::store::ShortLinkStore;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    match args.command {
        Command::Convert {
            input,
            preset,
            adblock,
            doh_direct,
            strict_global_proxy,
            bypass_domains,
            proxy_domains,
            default_alpn,
            no_rule_set,
            no_store,
            json,
        } => {
            let overlay = PolicyOverlay {
                rules_preset: preset,
                enable_adblock: adblock.then_some(true),
                enable_doh_direct: doh_direct.then_some(true),
                strict_global_proxy: strict_global_proxy.then_some(true),
                bypass_domains,
                proxy_domains,
                default_alpn,
                use_rule_set: no_rule_set.then_some(false),
            };
            let policy = PolicyConfig::from_env().overlay(&overlay);

            let content = fetch_if_url(&input).await?;

            let store = if no_store {
                None
            } else {
                Some(open_store(args.store.as_deref())?)
            };
            let outcome = convert(&content, &policy, store.as_ref())?;

            tracing::info!("Included {} nodes", outcome.node_count);
            for skipped in &outcome.skipped {
                tracing::warn!("Line {} skipped: {}", skipped.index, skipped.error);
            }
            if let Some(id) = &outcome.short_id {
                tracing::info!("Short id: {}", id);
            }

            if json {
                println!("{}", hy2sing::encoding::decode_document(&outcome.encoded)?);
            } else {
                println!("{}", outcome.encoded);
            }
        }
        Command::Resolve { reference, format } => {
            let store = open_store(args.store.as_deref())?;
            let format = match format {
                OutputFormat::B64 => ResolveFormat::B64,
                OutputFormat::Json => ResolveFormat::Json,
            };
            println!("{}", resolve(&store, &reference, format)?);
        }
    }
    Ok(())
}

fn open_store(path: Option<&str>) -> anyhow::Result<ShortLinkStore> {
    let store = match path {
        Some(path) => ShortLinkStore::open(path)?,
        None => ShortLinkStore::open_default()?,
    };
    Ok(store)
}

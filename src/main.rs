//! protonbadge: annotate a saved storefront page with compatibility badges.
//!
//! The page is parsed into the synthetic DOM, the relay runs on its own
//! thread against the live rating service and catalog, and the engine session
//! is driven until every request has settled or the wait runs out.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

mod logger;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dom::{Document, SelectorList, dom_utils, parse_document};
use engine::{EngineConfig, KIND_ATTRIBUTE, Session};
use runtime_relay::{RelayConfig, start_relay_runtime};
use url::Url;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One line per badge
    Badges,
    /// Indented element outline of the annotated page
    Outline,
    /// Annotated page as HTML
    Html,
}

#[derive(Parser, Debug)]
#[command(name = "protonbadge")]
#[command(about = "Annotate a saved storefront page with ProtonDB badges")]
#[command(version)]
struct Args {
    /// Address the page was saved from; selects the site adapter
    #[arg(long)]
    url: Url,

    /// Saved page to annotate
    #[arg(long)]
    html: PathBuf,

    /// TOML file layered over the built-in selectors and timings
    #[arg(short, long, env = "PROTONBADGE_CONFIG")]
    config: Option<PathBuf>,

    /// Upper bound on waiting for relay answers, in seconds
    #[arg(long, default_value_t = 15)]
    wait_secs: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Badges)]
    format: OutputFormat,

    /// Level or per-target filter, e.g. `info,engine.cache=debug`
    #[arg(long, default_value = "warn", env = "PROTONBADGE_LOG")]
    log_level: String,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::builtin()?);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    EngineConfig::with_overrides(&text).with_context(|| format!("loading config {}", path.display()))
}

fn relay_config(config: &EngineConfig) -> RelayConfig {
    let defaults = RelayConfig::default();
    let settings = &config.relay;
    RelayConfig {
        summary_url: settings.summary_url.clone(),
        search_url: settings.search_url.clone(),
        language: settings.language.clone(),
        country: settings.country.clone(),
        user_agent: settings.user_agent.clone().unwrap_or(defaults.user_agent),
        timeout: settings.timeout(),
    }
}

fn print_badges(doc: &Document) -> Result<()> {
    let selector = SelectorList::parse(&format!("[{KIND_ATTRIBUTE}]"))?;
    for badge in doc.query_all(doc.root(), &selector) {
        let kind = doc.attribute(badge, KIND_ATTRIBUTE).unwrap_or_default();
        let opens = doc.click(badge).opened.unwrap_or_default();
        println!("{kind:<6} {:<20} {opens}", doc.text_content(badge));
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(&args.log_level)?;

    let config = load_config(args.config.as_ref())?;
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("reading page {}", args.html.display()))?;
    let doc = parse_document(args.url.clone(), &html);

    let (bus, ends) = bus::channel();
    let relay_cfg = relay_config(&config);
    let client = net::HttpClient::new(&relay_cfg.client_config());
    let relay = start_relay_runtime(ends, client, relay_cfg);

    let mut session = Session::new(doc, &config, bus.cmd_tx, bus.evt_rx)
        .with_context(|| format!("starting session for {}", args.url))?;
    let first = session.start();
    log::info!(target: "protonbadge", "initial pass found {} entries", first.scanned);

    let deadline = Instant::now() + Duration::from_secs(args.wait_secs);
    let summary = session.run_until_idle(deadline);
    session.shutdown();
    if relay.join().is_err() {
        log::warn!(target: "protonbadge", "relay thread panicked");
    }
    log::info!(
        target: "protonbadge",
        "{} badge(s), {} rating request(s), {} title lookup(s), {} unanswered",
        summary.badges,
        summary.compatibility_requests,
        summary.identifier_requests,
        summary.pending
    );

    let doc = session.into_page();
    match args.format {
        OutputFormat::Badges => print_badges(&doc)?,
        OutputFormat::Outline => {
            for line in dom_utils::outline(&doc, doc.root(), usize::MAX) {
                println!("{line}");
            }
        }
        OutputFormat::Html => println!("{}", dom_utils::to_html(&doc, doc.root())),
    }
    Ok(())
}

//! Diagnostics go through the `log` facade in every crate; the binary bridges
//! them into a `tracing` subscriber so filters can name individual targets
//! (`engine.cache=debug,relay=trace`).

use anyhow::{Context, Result};
use tracing_log::LogTracer;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

fn filter(directives: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_new(directives)
}

pub fn init(directives: &str) -> Result<()> {
    let filter = filter(directives).with_context(|| format!("log filter {directives:?}"))?;
    LogTracer::init().context("bridging log records")?;
    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::uptime())
            .with_target(true),
    );
    tracing::subscriber::set_global_default(subscriber).context("installing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_target_directives() {
        assert!(filter("warn").is_ok());
        assert!(filter("warn,engine.cache=debug,relay=trace").is_ok());
        assert!(filter("engine=loud").is_err());
    }
}

use dom::{DomError, SelectorError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
    #[error("invalid selector in `{field}`: {source}")]
    Selector {
        field: &'static str,
        #[source]
        source: SelectorError,
    },
    #[error("no adapter for {0}")]
    UnsupportedSite(String),
    #[error(transparent)]
    Dom(#[from] DomError),
}

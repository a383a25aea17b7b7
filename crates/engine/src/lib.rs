//! Compatibility badge engine for storefront pages.
//!
//! A [`Session`] binds one page to a site adapter, the request caches and a
//! relay. Scans find entries, identifiers are resolved (directly or through a
//! title lookup), compatibility answers are fetched at most once per
//! identifier, and badges are injected at most once per category and target.

pub mod config;
pub mod error;
pub mod injector;
pub mod page;
pub mod reconciler;
pub mod relay_client;
pub mod request_cache;
pub mod resolver;
pub mod session;
pub mod sites;
pub mod watcher;

pub use config::EngineConfig;
pub use error::EngineError;
pub use injector::{BadgeInjector, Injection, KIND_ATTRIBUTE};
pub use page::PageView;
pub use reconciler::{EntryState, NativeCheck, PassReport};
pub use relay_client::{CommandSink, RelayClient};
pub use request_cache::{CacheState, Caches, Lookup, RequestCache};
pub use resolver::IdentifierHint;
pub use session::{Session, SessionSummary};
pub use sites::{SiteAdapter, detect_site};
pub use watcher::{Debouncer, MutationWatcher, WatcherState};

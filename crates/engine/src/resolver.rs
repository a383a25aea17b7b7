//! Identifier extraction.
//!
//! Direct identifiers come from URL paths, entry attributes or embedded
//! links and never touch the network. Free-text titles go through the
//! title cache and the relay.

use core_types::{AppId, Title};
use dom::NodeId;

use crate::relay_client::{CommandSink, RelayClient};
use crate::request_cache::{Lookup, RequestCache};

const APP_SEGMENT: &str = "/app/";

/// What an adapter knows about an entry's identifier when it finds it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentifierHint {
    Direct(AppId),
    Title(Title),
}

/// Result of turning a hint into an identifier right now.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Known(AppId),
    /// A title lookup is in flight; the entry is resumed when it settles.
    Waiting,
    /// No identifier for this title in this session.
    Failed,
}

/// First `/app/<digits>` occurrence in a path or URL.
pub fn app_id_from_path(path: &str) -> Option<AppId> {
    path.match_indices(APP_SEGMENT).find_map(|(at, _)| {
        let rest = &path[at + APP_SEGMENT.len()..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        AppId::parse(&rest[..end])
    })
}

/// First identifier of a comma-separated attribute value such as
/// `data-ds-appid="570,871540"`.
pub fn app_id_from_attribute(value: &str) -> Option<AppId> {
    value.split(',').next().and_then(AppId::parse)
}

pub fn resolve<S: CommandSink>(
    hint: &IdentifierHint,
    entry: NodeId,
    titles: &mut RequestCache<Title, AppId, NodeId>,
    relay: &mut RelayClient<S>,
) -> Resolution {
    let title = match hint {
        IdentifierHint::Direct(id) => return Resolution::Known(id.clone()),
        IdentifierHint::Title(title) => title,
    };
    match titles.get_or_fetch(title.clone(), entry, |t| {
        relay.resolve_identifier(t).map(drop)
    }) {
        Lookup::Ready(Some(id)) => Resolution::Known(id),
        Lookup::Ready(None) => Resolution::Failed,
        Lookup::Joined | Lookup::Dispatched => Resolution::Waiting,
    }
}

use core_types::{AppId, CompatibilityRecord, RequestId, Title};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

/// Requests from the page engine to the privileged relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayCommand {
    FetchCompatibility {
        request_id: RequestId,
        app_id: AppId,
    },
    ResolveIdentifier {
        request_id: RequestId,
        title: Title,
    },
    Shutdown,
}

impl RelayCommand {
    /// Action name the relay dispatches on.
    pub fn action(&self) -> &'static str {
        match self {
            RelayCommand::FetchCompatibility { .. } => "fetchCompatibility",
            RelayCommand::ResolveIdentifier { .. } => "resolveIdentifier",
            RelayCommand::Shutdown => "shutdown",
        }
    }
}

/// Relay answers. `Ok(None)` for compatibility means the upstream has no
/// record (HTTP 404), which is distinct from a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    Compatibility {
        request_id: RequestId,
        app_id: AppId,
        result: Result<Option<CompatibilityRecord>, RelayError>,
    },
    Identifier {
        request_id: RequestId,
        title: Title,
        result: Result<AppId, RelayError>,
    },
}

impl RelayEvent {
    pub fn request_id(&self) -> RequestId {
        match self {
            RelayEvent::Compatibility { request_id, .. }
            | RelayEvent::Identifier { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream answered HTTP {0}")]
    Status(u16),
    #[error("malformed upstream response: {0}")]
    Malformed(String),
    #[error("no catalog match")]
    NoMatch,
    #[error("relay is not running")]
    Disconnected,
}

/// Channel pair shared between the engine and the relay runtime.
pub struct Bus {
    pub cmd_tx: Sender<RelayCommand>,
    pub evt_rx: Receiver<RelayEvent>,
}

/// Relay-side ends of a [`Bus`].
pub struct RelayEnds {
    pub cmd_rx: Receiver<RelayCommand>,
    pub evt_tx: Sender<RelayEvent>,
}

pub fn channel() -> (Bus, RelayEnds) {
    let (cmd_tx, cmd_rx) = mpsc::channel();
    let (evt_tx, evt_rx) = mpsc::channel();
    (Bus { cmd_tx, evt_rx }, RelayEnds { cmd_rx, evt_tx })
}

use std::sync::mpsc::Sender;

use bus::{RelayCommand, RelayError};
use core_types::{AppId, RequestId, Title};

/// Where relay commands go. The live implementation is the bus sender; the
/// only failure is a relay that has gone away.
pub trait CommandSink {
    fn submit(&self, cmd: RelayCommand) -> Result<(), RelayError>;
}

impl CommandSink for Sender<RelayCommand> {
    fn submit(&self, cmd: RelayCommand) -> Result<(), RelayError> {
        self.send(cmd).map_err(|_| RelayError::Disconnected)
    }
}

/// Engine-side call boundary to the relay: allocates request ids and keeps
/// a count of what was sent.
pub struct RelayClient<S> {
    sink: S,
    next_request_id: RequestId,
    compatibility_sent: usize,
    identifier_sent: usize,
}

impl<S: CommandSink> RelayClient<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            next_request_id: 1,
            compatibility_sent: 0,
            identifier_sent: 0,
        }
    }

    pub fn fetch_compatibility(&mut self, app_id: &AppId) -> Result<RequestId, RelayError> {
        let request_id = self.allocate();
        self.sink.submit(RelayCommand::FetchCompatibility {
            request_id,
            app_id: app_id.clone(),
        })?;
        self.compatibility_sent += 1;
        log::trace!(target: "engine.relay", "#{request_id} fetchCompatibility {app_id}");
        Ok(request_id)
    }

    pub fn resolve_identifier(&mut self, title: &Title) -> Result<RequestId, RelayError> {
        let request_id = self.allocate();
        self.sink.submit(RelayCommand::ResolveIdentifier {
            request_id,
            title: title.clone(),
        })?;
        self.identifier_sent += 1;
        log::trace!(target: "engine.relay", "#{request_id} resolveIdentifier {title:?}");
        Ok(request_id)
    }

    pub fn shutdown(&self) {
        // A relay that already exited needs no shutdown.
        let _ = self.sink.submit(RelayCommand::Shutdown);
    }

    pub fn compatibility_sent(&self) -> usize {
        self.compatibility_sent
    }

    pub fn identifier_sent(&self) -> usize {
        self.identifier_sent
    }

    fn allocate(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_carry_fresh_request_ids() {
        let (bus, ends) = bus::channel();
        let mut client = RelayClient::new(bus.cmd_tx);
        let a = client.fetch_compatibility(&AppId::from(440)).unwrap();
        let b = client
            .resolve_identifier(&Title::new("Hades").unwrap())
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(client.compatibility_sent(), 1);
        assert_eq!(client.identifier_sent(), 1);

        let first = ends.cmd_rx.recv().unwrap();
        assert_eq!(
            first,
            RelayCommand::FetchCompatibility {
                request_id: a,
                app_id: AppId::from(440)
            }
        );
        assert_eq!(ends.cmd_rx.recv().unwrap().action(), "resolveIdentifier");
    }

    #[test]
    fn dropped_relay_is_reported() {
        let (bus, ends) = bus::channel();
        drop(ends);
        let mut client = RelayClient::new(bus.cmd_tx);
        assert_eq!(
            client.fetch_compatibility(&AppId::from(1)),
            Err(RelayError::Disconnected)
        );
        assert_eq!(client.compatibility_sent(), 0);
    }
}

//! Fire-and-forget sync notifications
//!
//! Events serialize as `{ "type": ..., ...payload }`. Delivery is
//! best-effort: a sink whose listener has gone away drops events silently.

use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use crate::models::Service;

/// Notification emitted while syncing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A service's sync routine started
    SyncStart { service: Service },
    /// One deck (or one inventory page) was processed
    SyncProgress {
        service: Service,
        status: String,
        processed: usize,
        total: usize,
    },
    /// All enabled routines settled
    SyncComplete {
        /// Services whose routine failed while the others finished
        failed: Vec<Service>,
    },
    /// A routine (or the whole sync, when `service` is None) failed
    SyncError {
        service: Option<Service>,
        message: String,
    },
    /// No usable credential; the user has to visit the login page
    LoginRequired { service: Service, login_url: String },
    /// A token was captured and stored
    TokenCaptured { service: Service },
}

impl SyncEvent {
    pub fn login_required(service: Service) -> Self {
        SyncEvent::LoginRequired {
            service,
            login_url: service.login_url().to_string(),
        }
    }
}

/// Receiver of sync notifications
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SyncEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SyncEvent) {}
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: SyncEvent) {
        match &event {
            SyncEvent::SyncError { service, message } => match service {
                Some(service) => error!("[{}] {}", service, message),
                None => error!("{}", message),
            },
            SyncEvent::LoginRequired { service, login_url } => {
                warn!("Log in to {} at {}", service.display_name(), login_url)
            }
            SyncEvent::SyncProgress {
                service,
                status,
                processed,
                total,
            } => info!("[{}] {} ({}/{})", service, status, processed, total),
            other => info!("{:?}", other),
        }
    }
}

/// Forwards events over a channel, ignoring a closed receiver
pub struct ChannelSink {
    sender: Mutex<Sender<SyncEvent>>,
}

impl ChannelSink {
    pub fn new(sender: Sender<SyncEvent>) -> Self {
        Self {
            sender: Mutex::new(sender),
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: SyncEvent) {
        if let Ok(sender) = self.sender.lock() {
            // Nobody listening is fine
            let _ = sender.send(event);
        }
    }
}

/// Records events in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SyncEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: SyncEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_event_wire_shape() {
        let event = SyncEvent::SyncProgress {
            service: Service::DecksOfKeyforge,
            status: "Forging keys".to_string(),
            processed: 2,
            total: 5,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "sync_progress",
                "service": "dok",
                "status": "Forging keys",
                "processed": 2,
                "total": 5
            })
        );
    }

    #[test]
    fn test_login_required_carries_url() {
        let event = SyncEvent::login_required(Service::Crucible);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "login_required");
        assert_eq!(json["login_url"], Service::Crucible.login_url());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::channel();
        let sink = ChannelSink::new(tx);

        sink.emit(SyncEvent::SyncStart {
            service: Service::MasterVault,
        });
        assert_eq!(
            rx.recv().unwrap(),
            SyncEvent::SyncStart {
                service: Service::MasterVault
            }
        );

        drop(rx);
        sink.emit(SyncEvent::SyncComplete { failed: vec![] });
    }

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.emit(SyncEvent::TokenCaptured {
            service: Service::Crucible,
        });
        sink.emit(SyncEvent::SyncComplete { failed: vec![] });
        assert_eq!(sink.events().len(), 2);
    }
}

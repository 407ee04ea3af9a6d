use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountChanged {
    pub account_identifier: String,
}

type Listener = Arc<dyn Fn(&AccountChanged) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// In-process fan-out of active account changes.
///
/// Dispatch is synchronous on the publishing task. Events published while a
/// listener is not subscribed are never replayed to it.
#[derive(Default, Clone)]
pub struct ChangeBroadcaster {
    listeners: Arc<Mutex<Listeners>>,
}

/// Keeps a listener registered. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl ChangeBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&AccountChanged) + Send + Sync + 'static,
    {
        let mut listeners = self.lock();
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn publish(&self, event: &AccountChanged) {
        // listeners may subscribe or unsubscribe from inside the callback
        let snapshot: Vec<Listener> = self
            .lock()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        tracing::debug!(
            account_id = %event.account_identifier,
            subscribers = snapshot.len(),
            "active account changed"
        );
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().entries.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().unwrap_or_else(|e| e.into_inner());
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(broadcaster: &ChangeBroadcaster) -> (Arc<Mutex<Vec<String>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = broadcaster.subscribe(move |event| {
            sink.lock().unwrap().push(event.account_identifier.clone());
        });
        (seen, subscription)
    }

    #[test]
    fn every_subscriber_receives_the_event() {
        let broadcaster = ChangeBroadcaster::new();
        let (first, _a) = recorder(&broadcaster);
        let (second, _b) = recorder(&broadcaster);

        broadcaster.publish(&AccountChanged {
            account_identifier: "acc-1".to_string(),
        });

        assert_eq!(*first.lock().unwrap(), vec!["acc-1"]);
        assert_eq!(*second.lock().unwrap(), vec!["acc-1"]);
    }

    #[test]
    fn dropped_subscription_stops_delivery() {
        let broadcaster = ChangeBroadcaster::new();
        let (seen, subscription) = recorder(&broadcaster);
        drop(subscription);
        assert_eq!(broadcaster.subscriber_count(), 0);

        broadcaster.publish(&AccountChanged {
            account_identifier: "acc-1".to_string(),
        });
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn late_subscriber_gets_no_replay() {
        let broadcaster = ChangeBroadcaster::new();
        broadcaster.publish(&AccountChanged {
            account_identifier: "acc-3".to_string(),
        });
        let (seen, _subscription) = recorder(&broadcaster);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn payload_field_is_account_identifier() {
        let event = AccountChanged {
            account_identifier: "acc-1".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"accountIdentifier":"acc-1"}"#
        );
    }
}

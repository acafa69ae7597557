//! Retained publish/subscribe broker.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde_json::Value;

type Callback = Box<dyn FnMut(&Value) + Send>;

#[derive(Default)]
struct Inner {
    retained: HashMap<String, Value>,
    subscribers: HashMap<String, Vec<Callback>>,
    ready: bool,
}

/// Keys are logical paths, usually the url path of the publishing directory.
///
/// Callbacks run while the broker lock is held and must not call back into
/// the broker.
#[derive(Default)]
pub struct Broker {
    inner: Mutex<Inner>,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `key`. Callbacks of one key run in
    /// registration order.
    pub fn subscribe<F>(&self, key: impl Into<String>, callback: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.inner
            .lock()
            .subscribers
            .entry(key.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Before `ready()`, retain `data` as the latest value of `key`.
    /// Afterwards, deliver it to the current subscribers right away.
    pub fn publish(&self, key: &str, data: Value) {
        let mut inner = self.inner.lock();
        if inner.ready {
            if let Some(callbacks) = inner.subscribers.get_mut(key) {
                for callback in callbacks.iter_mut() {
                    callback(&data);
                }
            }
        } else {
            inner.retained.insert(key.to_string(), data);
        }
    }

    /// Deliver every retained value (or `Null` for keys never published)
    /// to every subscriber, then switch to immediate delivery.
    /// Calling it again has no effect.
    pub fn ready(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.ready {
            return;
        }
        inner.ready = true;

        let retained = std::mem::take(&mut inner.retained);
        let zero = Value::Null;
        let mut delivered = 0usize;
        for (key, callbacks) in inner.subscribers.iter_mut() {
            let data = retained.get(key).unwrap_or(&zero);
            for callback in callbacks.iter_mut() {
                callback(data);
                delivered += 1;
            }
        }
        tracing::debug!(
            keys = inner.subscribers.len(),
            retained = retained.len(),
            delivered,
            "Broker ready"
        );
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().ready
    }
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Broker")
            .field("retained", &inner.retained.keys().collect::<Vec<_>>())
            .field("subscribed", &inner.subscribers.keys().collect::<Vec<_>>())
            .field("ready", &inner.ready)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use parking_lot::Mutex;
    use serde_json::json;

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl FnMut(&Value) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |data: &Value| sink.lock().push(data.clone()))
    }

    #[test]
    fn test_nothing_delivered_before_ready() {
        let broker = Broker::new();
        let (seen, callback) = recorder();
        broker.subscribe("/foo", callback);
        broker.publish("/foo", json!("hello-world"));
        assert!(seen.lock().is_empty());

        broker.ready();
        assert_eq!(*seen.lock(), vec![json!("hello-world")]);

        broker.publish("/foo", json!("goodbye"));
        assert_eq!(*seen.lock(), vec![json!("hello-world"), json!("goodbye")]);
    }

    #[test]
    fn test_publish_before_subscribe_is_delivered_once() {
        let broker = Broker::new();
        broker.publish("/blog", json!(1));
        broker.publish("/blog", json!(2));

        let (seen, callback) = recorder();
        broker.subscribe("/blog", callback);
        broker.ready();

        assert_eq!(*seen.lock(), vec![json!(2)]);
    }

    #[test]
    fn test_unpublished_key_delivers_null() {
        let broker = Broker::new();
        let (seen, callback) = recorder();
        broker.subscribe("/never", callback);
        broker.ready();
        assert_eq!(*seen.lock(), vec![Value::Null]);
    }

    #[test]
    fn test_ready_twice_does_not_redeliver() {
        let broker = Broker::new();
        let (seen, callback) = recorder();
        broker.subscribe("/foo", callback);
        broker.publish("/foo", json!("x"));
        broker.ready();
        broker.ready();
        assert_eq!(seen.lock().len(), 1);
        assert!(broker.is_ready());
    }

    #[test]
    fn test_subscriber_after_ready_gets_only_later_publishes() {
        let broker = Broker::new();
        broker.publish("/foo", json!("retained"));
        broker.ready();

        let (seen, callback) = recorder();
        broker.subscribe("/foo", callback);
        assert!(seen.lock().is_empty());

        broker.publish("/foo", json!("fresh"));
        assert_eq!(*seen.lock(), vec![json!("fresh")]);
    }

    #[test]
    fn test_delivery_follows_registration_order() {
        let broker = Broker::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            broker.subscribe("/k", move |_| order.lock().push(i));
        }
        broker.ready();
        broker.publish("/k", json!(null));
        assert_eq!(*order.lock(), vec![0, 1, 2, 0, 1, 2]);
    }
}

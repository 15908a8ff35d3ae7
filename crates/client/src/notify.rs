//! Property-changed notifications

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Callback receiving the name of a changed property
pub type PropertyListener = Arc<dyn Fn(&str) + Send + Sync>;

/// List of property-changed listeners
#[derive(Default)]
pub struct PropertyNotifier {
    listeners: Mutex<Vec<PropertyListener>>,
}

impl PropertyNotifier {
    /// Notifier without listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    /// Tell every listener that `property` changed
    pub fn notify(&self, property: &str) {
        let listeners: Vec<PropertyListener> = self.listeners.lock().clone();
        for listener in listeners {
            listener(property);
        }
    }

    /// Notify several properties in order
    pub fn notify_all(&self, properties: &[&str]) {
        for property in properties {
            self.notify(property);
        }
    }
}

impl fmt::Debug for PropertyNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyNotifier")
            .field("listeners", &self.listeners.lock().len())
            .finish()
    }
}

use super::Exchange;

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A set of exchanges looked up by name.
///
/// Exchanges are created on first use and live as long as the registry or
/// any handle returned by [`get`](Self::get).
#[derive(Debug)]
pub struct ExchangeRegistry<M> {
    exchanges: Mutex<HashMap<String, Arc<Exchange<M>>>>,
}

impl<M> ExchangeRegistry<M> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            exchanges: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the exchange called `name`, creating it if needed.
    pub fn get(&self, name: &str) -> Arc<Exchange<M>> {
        self.exchanges
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Exchange::new(name)))
            .clone()
    }

    /// Removes the exchange called `name` from the registry.
    ///
    /// Existing handles keep working; the next [`get`](Self::get) creates a
    /// fresh exchange.
    pub fn remove(&self, name: &str) -> Option<Arc<Exchange<M>>> {
        self.exchanges.lock().remove(name)
    }

    /// Names of the registered exchanges, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.exchanges.lock().keys().cloned().collect()
    }
}

impl<M> Default for ExchangeRegistry<M> {
    fn default() -> Self {
        Self::new()
    }
}

//! Session: per-command-sequence tag→orders map (§3: "Session").

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::order::BrokerOrder;

/// A session scopes one command sequence's tagged broker orders so later
/// commands in the same sequence (or a `cancelOrders(which=tagged, ...)`)
/// can address orders placed by earlier commands. Sessions are created per
/// sequence and dropped when the sequence finishes — they are not persisted
/// (§1 Non-goals: no persistence across restarts).
#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    tagged: HashMap<String, Vec<BrokerOrder>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            tagged: HashMap::new(),
        }
    }

    pub fn register(&mut self, tag: impl Into<String>, order: BrokerOrder) {
        self.tagged.entry(tag.into()).or_default().push(order);
    }

    /// Replace the most recent order registered under `tag` with `new_order`.
    /// Used by the trailing-stop ratchet after `updateOrderPrice` returns a
    /// (possibly different) broker order id (§4.3).
    pub fn replace_last(&mut self, tag: &str, new_order: BrokerOrder) {
        if let Some(orders) = self.tagged.get_mut(tag) {
            if let Some(last) = orders.last_mut() {
                *last = new_order;
                return;
            }
        }
        self.register(tag, new_order);
    }

    pub fn orders_for_tag(&self, tag: &str) -> &[BrokerOrder] {
        self.tagged.get(tag).map_or(&[], Vec::as_slice)
    }

    pub fn all_orders(&self) -> impl Iterator<Item = &BrokerOrder> {
        self.tagged.values().flatten()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

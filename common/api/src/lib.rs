use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The flattened form of an inbound payload: a single-level mapping from
/// output field name to stringified value. The downstream ingestion API only
/// accepts string property values, so values are stringified at insertion.
pub type FlatData = HashMap<String, String>;

/// An EventRecord is the normalized result of remapping one inbound webhook
/// payload: the event name, the flattened data and the resolved distinct
/// user, if any.
/// Records are produced by Mappers, handed to the dispatch gate and discarded
/// afterwards; they are immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct EventRecord {
    name: Option<String>,
    data: FlatData,
    user: Option<String>,
}

impl EventRecord {
    pub fn new(name: Option<String>, data: FlatData, user: Option<String>) -> EventRecord {
        EventRecord { name, data, user }
    }

    /// A record carrying no name, data or user, as produced when one or more
    /// of the inputs needed to assemble a real record were missing.
    pub fn empty() -> EventRecord {
        EventRecord::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> &FlatData {
        &self.data
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether the record carries enough content to be dispatched: the name
    /// must be longer than one character and the data must hold more than one
    /// entry. Near-empty or placeholder records fail this gate.
    pub fn complete(&self) -> bool {
        self.name.as_ref().map_or(false, |name| name.len() > 1) && self.data.len() > 1
    }

    pub fn into_parts(self) -> (Option<String>, FlatData, Option<String>) {
        (self.name, self.data, self.user)
    }
}

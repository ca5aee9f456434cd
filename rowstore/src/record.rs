use serde_json::Value;

/// One row of remote data: an opaque JSON payload plus its position in the
/// logical row sequence.
///
/// Records are immutable once stored. A fresh fetch for the same index
/// replaces the whole record (last-write-wins); nothing mutates in place.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct RowRecord {
    index: u64,
    payload: Value,
}

impl RowRecord {
    pub(crate) fn new(index: u64, payload: Value) -> Self {
        Self { index, payload }
    }

    /// Absolute index of this row in the logical sequence.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// The raw payload as returned by the server.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Convenience accessor for a top-level payload field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

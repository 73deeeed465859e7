//! # Circuit Signals — Named Inputs for the Proving Primitive
//!
//! A `CircuitSignals` value is the fixed-size, field-element-encoded,
//! signal-named structure handed to the proving primitive. Entry order is
//! the order the mapping step emitted — the rename from internal field
//! names is order-preserving, so serialization is deterministic.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// One signal slot: a scalar, a flat array, or an array of arrays
/// (per-record Merkle path matrices).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalValue {
    Scalar(String),
    Array(Vec<String>),
    Matrix(Vec<Vec<String>>),
}

impl Serialize for SignalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SignalValue::Scalar(s) => serializer.serialize_str(s),
            SignalValue::Array(items) => items.serialize(serializer),
            SignalValue::Matrix(rows) => rows.serialize(serializer),
        }
    }
}

/// The full set of named signals for one proving call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitSignals {
    entries: Vec<(String, SignalValue)>,
}

impl CircuitSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal. Names are expected to be unique; the mapping step
    /// emits each exactly once.
    pub fn push(&mut self, name: impl Into<String>, value: SignalValue) {
        self.entries.push((name.into(), value));
    }

    /// Look up a signal by name.
    pub fn get(&self, name: &str) -> Option<&SignalValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Signal names in emission order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Entries in emission order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignalValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deterministic JSON form, entries in emission order. This is the
    /// byte form witness generators consume.
    pub fn to_json(&self) -> String {
        // Serialization of strings and vectors cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl Serialize for CircuitSignals {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_get() {
        let mut signals = CircuitSignals::new();
        signals.push("root", SignalValue::Scalar("7".to_string()));
        signals.push(
            "timestamps",
            SignalValue::Array(vec!["1".to_string(), "0".to_string()]),
        );
        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals.get("root"),
            Some(&SignalValue::Scalar("7".to_string()))
        );
        assert!(signals.get("missing").is_none());
    }

    #[test]
    fn test_json_preserves_emission_order() {
        let mut signals = CircuitSignals::new();
        signals.push("zeta", SignalValue::Scalar("1".to_string()));
        signals.push("alpha", SignalValue::Scalar("2".to_string()));
        assert_eq!(signals.to_json(), r#"{"zeta":"1","alpha":"2"}"#);
    }

    #[test]
    fn test_matrix_serialization() {
        let mut signals = CircuitSignals::new();
        signals.push(
            "pathElements",
            SignalValue::Matrix(vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["0".to_string(), "0".to_string()],
            ]),
        );
        assert_eq!(
            signals.to_json(),
            r#"{"pathElements":[["1","2"],["0","0"]]}"#
        );
    }
}

//! Cycle-safe JSON serialization of dynamic values.
//!
//! The identity set holds the containers on the current path only, so a
//! container shared by two siblings is written twice while a container that
//! reaches itself is written as [`CIRCULAR_MARKER`].

use std::collections::HashSet;

use contracts::{format_number, ContractError, ObjectMap, Value};

/// Written in place of a container that references one of its ancestors
pub const CIRCULAR_MARKER: &str = "[Circular]";

/// Serialize a value to JSON text
///
/// # Errors
/// Fails when a shared container can no longer be read (poisoned lock)
pub fn safe_stringify(value: &Value) -> Result<String, ContractError> {
    let mut writer = JsonWriter::default();
    writer.write_value(value)?;
    Ok(writer.out)
}

/// Serialize a plain object body to JSON text
pub fn safe_stringify_map(map: &ObjectMap) -> Result<String, ContractError> {
    let mut writer = JsonWriter::default();
    writer.write_map(map)?;
    Ok(writer.out)
}

#[derive(Default)]
struct JsonWriter {
    out: String,
    ancestors: HashSet<usize>,
}

impl JsonWriter {
    fn write_value(&mut self, value: &Value) -> Result<(), ContractError> {
        match value {
            Value::Undefined | Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) if n.is_finite() => self.out.push_str(&format_number(*n)),
            Value::Number(_) => self.out.push_str("null"),
            Value::String(s) => self.write_str(s)?,
            Value::Array(items) => {
                let id = items.id();
                if !self.ancestors.insert(id) {
                    return self.write_str(CIRCULAR_MARKER);
                }
                let guard = items
                    .read()
                    .map_err(|_| ContractError::serialization("array is poisoned"))?;
                self.out.push('[');
                for (idx, item) in guard.iter().enumerate() {
                    if idx > 0 {
                        self.out.push(',');
                    }
                    self.write_value(item)?;
                }
                self.out.push(']');
                self.ancestors.remove(&id);
            }
            Value::Object(map) => {
                let id = map.id();
                if !self.ancestors.insert(id) {
                    return self.write_str(CIRCULAR_MARKER);
                }
                let guard = map
                    .read()
                    .map_err(|_| ContractError::serialization("object is poisoned"))?;
                self.write_map(&guard)?;
                self.ancestors.remove(&id);
            }
        }
        Ok(())
    }

    fn write_map(&mut self, map: &ObjectMap) -> Result<(), ContractError> {
        self.out.push('{');
        let mut first = true;
        // Undefined members are left out entirely
        for (key, value) in map.iter().filter(|(_, v)| !matches!(v, Value::Undefined)) {
            if !first {
                self.out.push(',');
            }
            first = false;
            self.write_str(key)?;
            self.out.push(':');
            self.write_value(value)?;
        }
        self.out.push('}');
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<(), ContractError> {
        let quoted =
            serde_json::to_string(s).map_err(|e| ContractError::serialization(e.to_string()))?;
        self.out.push_str(&quoted);
        Ok(())
    }
}

use serde::{Deserialize, Serialize};

/// Sentinel value meaning "every available option".
pub const ALL_VALUE: &str = "$__all";

/// Current value of a template variable.
///
/// `null` on the wire is represented by `Option<VariableValue>::None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Single(String),
    Multiple(Vec<String>),
}

impl VariableValue {
    /// The "All" sentinel as a scalar.
    pub fn all() -> Self {
        VariableValue::Single(ALL_VALUE.to_string())
    }

    /// Whether this is exactly the scalar "All" sentinel.
    pub fn is_all(&self) -> bool {
        matches!(self, VariableValue::Single(v) if v == ALL_VALUE)
    }

    pub fn is_multiple(&self) -> bool {
        matches!(self, VariableValue::Multiple(_))
    }

    /// Values as a slice-like list; a scalar is a one-element list.
    pub fn values(&self) -> Vec<&str> {
        match self {
            VariableValue::Single(v) => vec![v.as_str()],
            VariableValue::Multiple(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// True for an empty string or an empty selection.
    pub fn is_empty(&self) -> bool {
        match self {
            VariableValue::Single(v) => v.is_empty(),
            VariableValue::Multiple(vs) => vs.is_empty(),
        }
    }

    pub fn as_single(&self) -> Option<&str> {
        match self {
            VariableValue::Single(v) => Some(v),
            VariableValue::Multiple(_) => None,
        }
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::Single(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::Single(value)
    }
}

impl From<Vec<String>> for VariableValue {
    fn from(values: Vec<String>) -> Self {
        VariableValue::Multiple(values)
    }
}

impl From<Vec<&str>> for VariableValue {
    fn from(values: Vec<&str>) -> Self {
        VariableValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

/// Collapse a selection holding only the "All" sentinel into the bare sentinel.
///
/// Consumers compare the stored value against the scalar sentinel on every
/// update, so `["$__all"]` must never be stored. Idempotent.
pub fn normalize_all_value(value: Option<VariableValue>) -> Option<VariableValue> {
    match value {
        Some(VariableValue::Multiple(values)) if values.len() == 1 && values[0] == ALL_VALUE => {
            Some(VariableValue::all())
        }
        other => other,
    }
}

/// Canonicalize a user selection that contains the "All" sentinel.
///
/// Choosing "All" last makes it the exclusive choice. Adding items while
/// "All" is selected drops "All" from the selection.
pub fn canonicalize_selection(value: Option<VariableValue>) -> Option<VariableValue> {
    match value {
        Some(VariableValue::Multiple(values)) if values.iter().any(|v| v == ALL_VALUE) => {
            if values.last().map(String::as_str) == Some(ALL_VALUE) {
                Some(VariableValue::all())
            } else {
                Some(VariableValue::Multiple(
                    values.into_iter().filter(|v| v != ALL_VALUE).collect(),
                ))
            }
        }
        other => other,
    }
}

/// A selectable option of a list variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOption {
    pub label: String,
    pub value: String,
}

impl VariableOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl From<&str> for VariableOption {
    fn from(value: &str) -> Self {
        Self::new(value, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serde() {
        let single: VariableValue = serde_json::from_str(r#""prod""#).unwrap();
        assert_eq!(single, VariableValue::from("prod"));

        let multiple: VariableValue = serde_json::from_str(r#"["a","b"]"#).unwrap();
        assert_eq!(multiple, VariableValue::from(vec!["a", "b"]));

        let null: Option<VariableValue> = serde_json::from_str("null").unwrap();
        assert!(null.is_none());

        assert_eq!(serde_json::to_string(&multiple).unwrap(), r#"["a","b"]"#);
    }

    #[test]
    fn test_normalize_singleton_all() {
        let value = Some(VariableValue::from(vec![ALL_VALUE]));
        let once = normalize_all_value(value);
        assert_eq!(once, Some(VariableValue::all()));

        let twice = normalize_all_value(once.clone());
        assert_eq!(twice, once);
    }

    #[test]
    fn test_normalize_leaves_other_values() {
        let value = Some(VariableValue::from(vec![ALL_VALUE, "a"]));
        assert_eq!(normalize_all_value(value.clone()), value);
        assert_eq!(normalize_all_value(None), None);
    }

    #[test]
    fn test_selecting_all_last_is_exclusive() {
        let value = Some(VariableValue::from(vec!["a", "b", ALL_VALUE]));
        assert_eq!(canonicalize_selection(value), Some(VariableValue::all()));
    }

    #[test]
    fn test_adding_after_all_drops_all() {
        let value = Some(VariableValue::from(vec![ALL_VALUE, "a", "b"]));
        assert_eq!(
            canonicalize_selection(value),
            Some(VariableValue::from(vec!["a", "b"]))
        );
    }

    #[test]
    fn test_values_and_emptiness() {
        assert_eq!(VariableValue::from("x").values(), vec!["x"]);
        assert!(VariableValue::from("").is_empty());
        assert!(VariableValue::Multiple(vec![]).is_empty());
        assert!(!VariableValue::from(vec!["a"]).is_empty());
        assert!(VariableValue::all().is_all());
        assert!(!VariableValue::from(vec![ALL_VALUE]).is_all());
    }
}

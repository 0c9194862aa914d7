//! Core types for the Loomflow wiring engine.
//!
//! This module defines the type-tag vocabulary used to decide whether an
//! output may feed an input, plus the runtime [`Value`] alias that flows
//! along edges. These are the core domain concepts that define what a
//! wiring *is*; execution-time types live in [`crate::scheduler`].
//!
//! # Examples
//!
//! ```rust
//! use loomflow::types::{TypeTag, types_overlap};
//!
//! let produced = vec![TypeTag::Text];
//! let accepted = vec![TypeTag::Text, TypeTag::Data];
//! assert!(types_overlap(&produced, &accepted));
//!
//! // Any matches everything on either side.
//! assert!(types_overlap(&[TypeTag::Any], &[TypeTag::Integer]));
//! assert!(!types_overlap(&[TypeTag::Integer], &[TypeTag::Text]));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime value carried along edges and cached per `(vertex, output)`.
///
/// Loomflow does not define its own value algebra; everything that flows
/// through a graph is a JSON-compatible value.
pub type Value = serde_json::Value;

/// Tag describing what kind of value an input accepts or an output produces.
///
/// Tags gate connections: an output may feed an input iff their tag sets
/// intersect (see [`types_overlap`]). Tags deliberately say nothing about
/// runtime representation: a `Text` value is still a [`Value::String`].
///
/// # Persistence
///
/// `TypeTag` serializes to a plain string (`"Text"`, `"Custom:Embedding"`)
/// so persisted graph documents stay human-editable.
///
/// # Examples
///
/// ```rust
/// use loomflow::types::TypeTag;
///
/// let tag = TypeTag::Custom("Embedding".to_string());
/// assert_eq!(tag.encode(), "Custom:Embedding");
/// assert_eq!(TypeTag::decode(&tag.encode()), tag);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    /// Plain text / message-like values.
    Text,
    /// Integral numbers.
    Integer,
    /// Floating-point numbers.
    Number,
    /// Booleans.
    Boolean,
    /// Structured key/value payloads.
    Data,
    /// The permissive tag: compatible with every other tag.
    Any,
    /// Domain-defined tag identified by name.
    Custom(String),
}

impl TypeTag {
    /// Encode a tag into its persisted string form.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            TypeTag::Text => "Text".to_string(),
            TypeTag::Integer => "Integer".to_string(),
            TypeTag::Number => "Number".to_string(),
            TypeTag::Boolean => "Boolean".to_string(),
            TypeTag::Data => "Data".to_string(),
            TypeTag::Any => "Any".to_string(),
            TypeTag::Custom(name) => format!("Custom:{name}"),
        }
    }

    /// Decode a persisted string form back into a tag.
    ///
    /// Unrecognized strings become `Custom(s)` for forward compatibility.
    #[must_use]
    pub fn decode(s: &str) -> Self {
        match s {
            "Text" => TypeTag::Text,
            "Integer" => TypeTag::Integer,
            "Number" => TypeTag::Number,
            "Boolean" => TypeTag::Boolean,
            "Data" => TypeTag::Data,
            "Any" => TypeTag::Any,
            other => match other.strip_prefix("Custom:") {
                Some(rest) => TypeTag::Custom(rest.to_string()),
                None => TypeTag::Custom(other.to_string()),
            },
        }
    }

    /// Returns `true` if this tag is compatible with `other`.
    ///
    /// `Any` matches everything on either side; all other tags match by
    /// exact equality (`Custom` by name). There is no implicit coercion
    /// between distinct tags.
    #[must_use]
    pub fn matches(&self, other: &TypeTag) -> bool {
        matches!(self, TypeTag::Any) || matches!(other, TypeTag::Any) || self == other
    }

    /// Returns `true` if this is the permissive [`Any`](Self::Any) tag.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, TypeTag::Any)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Custom(name) => write!(f, "{name}"),
            other => write!(f, "{}", other.encode()),
        }
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        TypeTag::decode(s)
    }
}

impl Serialize for TypeTag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for TypeTag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(TypeTag::decode(&s))
    }
}

/// Decide whether a produced type set can feed an accepted type set.
///
/// This is the single compatibility rule used by the edge resolver at
/// wiring time and by the serializer when re-validating loaded documents.
#[must_use]
pub fn types_overlap(produced: &[TypeTag], accepted: &[TypeTag]) -> bool {
    produced
        .iter()
        .any(|p| accepted.iter().any(|a| p.matches(a)))
}

/// Render a type set for diagnostics, e.g. `[Text, Data]`.
#[must_use]
pub fn format_type_set(tags: &[TypeTag]) -> String {
    let joined = tags
        .iter()
        .map(TypeTag::encode)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_matches_both_directions() {
        assert!(TypeTag::Any.matches(&TypeTag::Integer));
        assert!(TypeTag::Integer.matches(&TypeTag::Any));
    }

    #[test]
    fn custom_matches_by_name() {
        let a = TypeTag::Custom("Embedding".into());
        let b = TypeTag::Custom("Embedding".into());
        let c = TypeTag::Custom("Document".into());
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn overlap_requires_common_member() {
        assert!(!types_overlap(&[TypeTag::Text], &[TypeTag::Integer]));
        assert!(types_overlap(
            &[TypeTag::Text, TypeTag::Data],
            &[TypeTag::Data]
        ));
        assert!(!types_overlap(&[], &[TypeTag::Text]));
    }

    #[test]
    fn encode_decode_round_trip() {
        for tag in [
            TypeTag::Text,
            TypeTag::Integer,
            TypeTag::Number,
            TypeTag::Boolean,
            TypeTag::Data,
            TypeTag::Any,
            TypeTag::Custom("Vector".into()),
        ] {
            assert_eq!(TypeTag::decode(&tag.encode()), tag);
        }
    }

    #[test]
    fn serde_uses_string_form() {
        let json = serde_json::to_string(&TypeTag::Custom("Vector".into())).unwrap();
        assert_eq!(json, "\"Custom:Vector\"");
        let back: TypeTag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, TypeTag::Custom("Vector".into()));
    }
}

//! Snapshot values
//!
//! The serializable leaf type of every snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A serializable state value
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    #[serde(with = "float_repr")]
    Float(f64),
    Str(String),
    List(Vec<StateValue>),
    Map(BTreeMap<String, StateValue>),
}

impl StateValue {
    /// Build a map value from key/value pairs
    pub fn map<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<StateValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Check for null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Boolean view. Strings `"true"`/`"false"` are coerced.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Str(s) if s.eq_ignore_ascii_case("true") => Some(true),
            Self::Str(s) if s.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, StateValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[StateValue]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// Short name of the variant, used in shape errors
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<bool> for StateValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for StateValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for StateValue {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for StateValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for StateValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for StateValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<StateValue>> From<Vec<T>> for StateValue {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<StateValue>> From<Option<T>> for StateValue {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Self::Null, Into::into)
    }
}

/// JSON has no NaN or infinities; those travel as strings
mod float_repr {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const NAN: &str = "NaN";
    const INFINITY: &str = "inf";
    const NEG_INFINITY: &str = "-inf";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str(NAN)
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { INFINITY } else { NEG_INFINITY })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INFINITY => Ok(f64::INFINITY),
                NEG_INFINITY => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid float {other:?}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_coercion() {
        assert_eq!(StateValue::Bool(false).as_bool(), Some(false));
        assert_eq!(StateValue::from("TRUE").as_bool(), Some(true));
        assert_eq!(StateValue::from("yes").as_bool(), None);
        assert_eq!(StateValue::Int(1).as_bool(), None);
    }

    #[test]
    fn test_map_builder() {
        let v = StateValue::map([("a", 1), ("b", 2)]);
        let m = v.as_map().unwrap();
        assert_eq!(m.get("a"), Some(&StateValue::Int(1)));
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_option_conversion() {
        let none: Option<&str> = None;
        assert!(StateValue::from(none).is_null());
        assert_eq!(StateValue::from(Some("x")).as_str(), Some("x"));
    }

    #[test]
    fn test_json_shape() {
        let v = StateValue::map([("count", StateValue::Int(3))]);
        let json = serde_json::to_string(&v).unwrap();
        let back: StateValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        let v = StateValue::List(vec![
            StateValue::Float(f64::NAN),
            StateValue::Float(f64::INFINITY),
            StateValue::Float(f64::NEG_INFINITY),
            StateValue::Float(0.25),
        ]);
        let json = serde_json::to_string(&v).unwrap();
        let back: StateValue = serde_json::from_str(&json).unwrap();

        let items = back.as_list().unwrap();
        assert!(matches!(items[0], StateValue::Float(f) if f.is_nan()));
        assert_eq!(items[1], StateValue::Float(f64::INFINITY));
        assert_eq!(items[2], StateValue::Float(f64::NEG_INFINITY));
        assert_eq!(items[3], StateValue::Float(0.25));
    }

    #[test]
    fn test_unknown_float_text_rejected() {
        assert!(serde_json::from_str::<StateValue>(r#"{"float":"lots"}"#).is_err());
    }
}

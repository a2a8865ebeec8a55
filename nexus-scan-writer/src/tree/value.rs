use serde::Deserialize;

/// Element type of a field or attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NexusDataType {
    #[strum(to_string = "int")]
    Int,
    #[strum(to_string = "float")]
    Float,
    #[strum(to_string = "string")]
    #[serde(rename = "string")]
    Str,
}

/// A concrete value held by a constant field or an attribute.
/// Deserializes from a JSON number, string, or homogeneous array of either.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum NexusValue {
    Int(i64),
    Float(f64),
    Str(String),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    StrArray(Vec<String>),
}

impl NexusValue {
    pub fn data_type(&self) -> NexusDataType {
        match self {
            Self::Int(_) | Self::IntArray(_) => NexusDataType::Int,
            Self::Float(_) | Self::FloatArray(_) => NexusDataType::Float,
            Self::Str(_) | Self::StrArray(_) => NexusDataType::Str,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_) | Self::Str(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int_array(&self) -> Option<&[i64]> {
        match self {
            Self::IntArray(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str_array(&self) -> Option<&[String]> {
        match self {
            Self::StrArray(values) => Some(values),
            _ => None,
        }
    }

    /// Builds an integer array from dimension indices or shapes.
    pub fn from_indices<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        Self::IntArray(
            indices
                .into_iter()
                .map(|index| i64::try_from(index).unwrap_or(i64::MAX))
                .collect(),
        )
    }
}

impl From<i64> for NexusValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for NexusValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for NexusValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for NexusValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<i64>> for NexusValue {
    fn from(values: Vec<i64>) -> Self {
        Self::IntArray(values)
    }
}

impl From<Vec<f64>> for NexusValue {
    fn from(values: Vec<f64>) -> Self {
        Self::FloatArray(values)
    }
}

impl From<Vec<String>> for NexusValue {
    fn from(values: Vec<String>) -> Self {
        Self::StrArray(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_narrowest_type() {
        let values: Vec<NexusValue> =
            serde_json::from_str(r#"[3, 2.5, "i99", [1, 2], [0.5, 1], ["x", "y"]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                NexusValue::Int(3),
                NexusValue::Float(2.5),
                NexusValue::Str("i99".to_owned()),
                NexusValue::IntArray(vec![1, 2]),
                NexusValue::FloatArray(vec![0.5, 1.0]),
                NexusValue::StrArray(vec!["x".to_owned(), "y".to_owned()]),
            ]
        );
    }

    #[test]
    fn objects_are_not_values() {
        assert!(serde_json::from_str::<NexusValue>(r#"{"value": 1}"#).is_err());
    }

    #[test]
    fn indices_become_integers() {
        assert_eq!(
            NexusValue::from_indices([0, 2]).as_int_array(),
            Some([0, 2].as_slice())
        );
        assert_eq!(NexusValue::from_indices([0]).data_type(), NexusDataType::Int);
    }
}

//! Serde bridges that read JSON scalars as text.
//!
//! Environment values, test parameters and dependency versions end up on a
//! command line or in a child environment, so `"LOG_LEVEL": 3` and
//! `"openssl_versions": [3.0, 3.3]` are accepted alongside their quoted
//! forms. Used through `#[serde(deserialize_with = "...")]`.

use serde::{Deserialize, Deserializer};

use super::OrderedMap;

/// A string, number or boolean.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
  Text(String),
  Number(serde_json::Number),
  Bool(bool),
}

impl From<Scalar> for String {
  fn from(scalar: Scalar) -> Self {
    match scalar {
      Scalar::Text(text) => text,
      // serde_json keeps the fraction, so 3.0 stays "3.0"
      Scalar::Number(number) => number.to_string(),
      Scalar::Bool(true) => "True".to_string(),
      Scalar::Bool(false) => "False".to_string(),
    }
  }
}

/// `{ "KEY": scalar }` as a string map.
pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<OrderedMap<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = OrderedMap::<Scalar>::deserialize(deserializer)?;
  Ok(raw.into_iter().map(|(key, value)| (key, value.into())).collect())
}

/// `{ "-switch": scalar | null }` as a parameter map.
pub(crate) fn param_map<'de, D>(deserializer: D) -> Result<OrderedMap<Option<String>>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = OrderedMap::<Option<Scalar>>::deserialize(deserializer)?;
  Ok(raw.into_iter().map(|(key, value)| (key, value.map(String::from))).collect())
}

/// `[scalar, ...]` as a string list.
pub(crate) fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let raw = Vec::<Scalar>::deserialize(deserializer)?;
  Ok(raw.into_iter().map(String::from).collect())
}

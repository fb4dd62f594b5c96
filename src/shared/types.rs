use serde::{Deserialize, Deserializer};

/// Deserializer for patch fields that distinguish "absent" from "set to null".
///
/// Use with `#[serde(default, deserialize_with = "...")]` on an `Option<Option<T>>`:
/// a missing key stays `None`, `null` becomes `Some(None)`, a value `Some(Some(v))`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

//! Enums that survive values they do not know.
//!
//! A backend adding a new enum case should not break decoding of the whole
//! payload. Types implementing [`Unparsed`] fall back to a sentinel instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Types with a sentinel value for unrecognized input.
pub trait Unparsed: Sized {
    fn unparsed() -> Self;
}

/// Implement [`Unparsed`] by naming the sentinel variant.
///
/// ```
/// use courier_common_core::{permissive_enum, Permissive};
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// #[serde(rename_all = "lowercase")]
/// enum Color {
///     Red,
///     Unknown,
/// }
///
/// permissive_enum!(Color => Color::Unknown);
///
/// let color: Permissive<Color> = serde_json::from_str("\"teal\"").unwrap();
/// assert_eq!(color.into_inner(), Color::Unknown);
/// ```
#[macro_export]
macro_rules! permissive_enum {
    ($($ty:ty => $sentinel:expr),+ $(,)?) => {
        $(
            impl $crate::permissive::Unparsed for $ty {
                fn unparsed() -> Self {
                    $sentinel
                }
            }
        )+
    };
}

/// Deserialize `T`, substituting [`Unparsed::unparsed`] on failure.
///
/// Use with `#[serde(deserialize_with = "deserialize_or_unparsed")]`.
pub fn deserialize_or_unparsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Unparsed,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(from_value_or_unparsed(value))
}

fn from_value_or_unparsed<T: DeserializeOwned + Unparsed>(value: serde_json::Value) -> T {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::debug!(
                target_type = std::any::type_name::<T>(),
                value = %value,
                "unparsed enum value"
            );
            T::unparsed()
        }
    }
}

/// Wrapper applying the unparsed fallback wherever `T` appears, e.g. in `Vec<Permissive<T>>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Permissive<T>(pub T);

impl<T> Permissive<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::ops::Deref for Permissive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<'de, T: DeserializeOwned + Unparsed> Deserialize<'de> for Permissive<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserialize_or_unparsed(deserializer).map(Permissive)
    }
}

impl<T: Serialize> Serialize for Permissive<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

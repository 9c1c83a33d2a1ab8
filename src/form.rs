//! Value forms — the typed codec between lane values and their structural
//! representation.
//!
//! A form molds native values into `serde_json::Value` for transport and
//! casts them back. It also supplies the lane's *unit* value: the sentinel
//! returned when an operation addresses an absent entry.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::LaneError;

/// Typed value codec for a lane.
pub trait Form: Send + Sync + 'static {
    /// The native value type this form codes.
    type Value: Clone + Send + Sync + 'static;

    /// The sentinel value standing in for an absent entry.
    fn unit(&self) -> Self::Value;

    /// Mold a native value into its structural representation.
    fn mold(&self, value: &Self::Value) -> Result<serde_json::Value, LaneError>;

    /// Cast a structural representation back into a native value.
    fn cast(&self, repr: &serde_json::Value) -> Result<Self::Value, LaneError>;
}

/// A form for any serde-serializable value type.
///
/// The unit value is supplied at construction, or taken from `Default` via
/// [`ValueForm::for_default`].
pub struct ValueForm<V> {
    unit: V,
}

impl<V: Clone> ValueForm<V> {
    /// Create a form with an explicit unit value.
    pub fn new(unit: V) -> Self {
        Self { unit }
    }
}

impl<V: Clone + Default> ValueForm<V> {
    /// Create a form whose unit value is `V::default()`.
    pub fn for_default() -> Self {
        Self::new(V::default())
    }
}

impl<V> Form for ValueForm<V>
where
    V: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    type Value = V;

    fn unit(&self) -> V {
        self.unit.clone()
    }

    fn mold(&self, value: &V) -> Result<serde_json::Value, LaneError> {
        serde_json::to_value(value).map_err(|err| LaneError::codec(err.to_string()))
    }

    fn cast(&self, repr: &serde_json::Value) -> Result<V, LaneError> {
        serde_json::from_value(repr.clone()).map_err(|err| LaneError::codec(err.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_form_mold_cast() {
        let form = ValueForm::<String>::for_default();
        let repr = form.mold(&"hello".to_string()).unwrap();
        assert_eq!(repr, serde_json::json!("hello"));
        assert_eq!(form.cast(&repr).unwrap(), "hello");
    }

    #[test]
    fn test_value_form_unit() {
        let form = ValueForm::new(-1i64);
        assert_eq!(form.unit(), -1);
    }

    #[test]
    fn test_cast_mismatch_is_codec_error() {
        let form = ValueForm::<u32>::for_default();
        let err = form.cast(&serde_json::json!("not a number")).unwrap_err();
        assert!(matches!(err, LaneError::Codec { .. }));
        assert!(!err.is_fatal());
    }
}

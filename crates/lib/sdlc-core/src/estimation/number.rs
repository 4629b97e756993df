//! Lenient numeric fields for model-produced JSON.
//!
//! Values are accepted as JSON numbers or numeric strings, and written back as
//! integers whenever they are whole.

use std::fmt;

use serde::de::{self, Visitor};
use serde::{Deserializer, Serializer};

/// Largest magnitude that is written as an integer.
const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

#[allow(clippy::cast_possible_truncation, clippy::trivially_copy_pass_by_ref)]
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(NumberVisitor)
}

/// Phase ids: a whole number in `0..=u32::MAX`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
pub fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = deserializer.deserialize_any(NumberVisitor)?;
    if value.fract() != 0.0 || value < 0.0 || value > f64::from(u32::MAX) {
        return Err(de::Error::custom(format!("invalid phase id {value}")));
    }
    Ok(value as u32)
}

/// Renders a figure the way it appears in notes: integers without a decimal
/// point, everything else to two places.
#[must_use]
pub fn display(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Rounds to cents.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

struct NumberVisitor;

impl Visitor<'_> for NumberVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a number or a numeric string")
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_i64<E: de::Error>(self, value: i64) -> Result<f64, E> {
        Ok(value as f64)
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, value: u64) -> Result<f64, E> {
        Ok(value as f64)
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<f64, E> {
        Ok(value)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<f64, E> {
        let cleaned: String = value
            .trim()
            .trim_end_matches('h')
            .chars()
            .filter(|ch| *ch != ',' && *ch != '$')
            .collect();
        cleaned
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|number| number.is_finite())
            .ok_or_else(|| E::custom(format!("'{value}' is not a number")))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super")]
        value: f64,
    }

    fn parse(json: &str) -> Result<f64, serde_json::Error> {
        serde_json::from_str::<Holder>(json).map(|holder| holder.value)
    }

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        assert_eq!(parse(r#"{"value": 188}"#).expect("int"), 188.0);
        assert_eq!(parse(r#"{"value": 160.8}"#).expect("float"), 160.8);
        assert_eq!(parse(r#"{"value": "15,040"}"#).expect("string"), 15040.0);
        assert_eq!(parse(r#"{"value": "$80"}"#).expect("currency"), 80.0);
        assert!(parse(r#"{"value": "lots"}"#).is_err());
        assert!(parse(r#"{"value": null}"#).is_err());
    }

    #[test]
    fn whole_values_serialize_as_integers() {
        let whole = serde_json::to_string(&Holder { value: 428.0 }).expect("serializes");
        assert_eq!(whole, r#"{"value":428}"#);
        let fractional = serde_json::to_string(&Holder { value: 20.4 }).expect("serializes");
        assert_eq!(fractional, r#"{"value":20.4}"#);
    }

    #[test]
    fn display_trims_whole_numbers() {
        assert_eq!(display(136.0), "136");
        assert_eq!(display(81.6), "81.60");
    }
}

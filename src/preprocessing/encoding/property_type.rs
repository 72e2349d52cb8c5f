//! One-hot indicators over the fixed property-type set.

use crate::dataset::PropertyType;
use crate::error::Result;

/// Number of one-hot columns.
pub const ONE_HOT_WIDTH: usize = PropertyType::ALL.len();

/// Indicator vector with exactly one `1.0`, in [`PropertyType::ALL`] order.
pub fn one_hot(property_type: PropertyType) -> [f64; ONE_HOT_WIDTH] {
    let mut indicators = [0.0; ONE_HOT_WIDTH];
    indicators[property_type.index()] = 1.0;
    indicators
}

/// Parse a request's `type_bien`.
///
/// A label outside the fixed set is rejected with
/// [`crate::PriceError::UnknownPropertyType`] instead of producing an
/// all-zero indicator vector.
pub fn parse_property_type(label: &str) -> Result<PropertyType> {
    label.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PriceError;

    #[test]
    fn test_exactly_one_indicator() {
        for ty in PropertyType::ALL {
            let v = one_hot(ty);
            assert_eq!(v.iter().sum::<f64>(), 1.0);
            assert_eq!(v[ty.index()], 1.0);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_labels() {
        assert_eq!(parse_property_type("Villa").unwrap(), PropertyType::Villa);
        assert!(matches!(
            parse_property_type("penthouse"),
            Err(PriceError::UnknownPropertyType(_))
        ));
        assert!(parse_property_type("").is_err());
    }
}

//! Error types for dataset loading, feature engineering and prediction.

use thiserror::Error;

/// Error type shared by the training pipeline and the serving path.
#[derive(Error, Debug)]
pub enum PriceError {
    /// Required columns are missing or the file cannot be interpreted as a table.
    #[error("Dataset format error: {0}")]
    DatasetFormat(String),

    /// A categorical key is absent from the fitted vocabulary.
    #[error("Unknown {field} category: {value:?}")]
    UnknownCategory { field: &'static str, value: String },

    /// An assembled feature vector does not match the versioned schema.
    #[error("Feature schema mismatch: {0}")]
    FeatureSchema(String),

    /// A property type outside the fixed one-hot set.
    #[error("Unknown property type: {0:?}")]
    UnknownPropertyType(String),

    /// A prediction request failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid hyperparameter or configuration value.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Empty data provided where non-empty was required.
    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PriceError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PriceError::DatasetFormat(_) => "dataset_format",
            PriceError::UnknownCategory { .. } => "unknown_category",
            PriceError::FeatureSchema(_) => "feature_schema",
            PriceError::UnknownPropertyType(_) => "unknown_property_type",
            PriceError::InvalidRequest(_) => "invalid_request",
            PriceError::InvalidParameter(_) => "invalid_parameter",
            PriceError::EmptyData(_) => "empty_data",
            PriceError::Io(_) => "io",
            PriceError::Csv(_) => "csv",
            PriceError::Serialization(_) => "serialization",
        }
    }
}

impl From<bincode::Error> for PriceError {
    fn from(err: bincode::Error) -> Self {
        PriceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for PriceError {
    fn from(err: serde_json::Error) -> Self {
        PriceError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PriceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_dataset_format() {
        let err = PriceError::DatasetFormat("missing column prix".to_string());
        assert!(err.to_string().contains("Dataset format error"));
        assert_eq!(err.kind(), "dataset_format");
    }

    #[test]
    fn test_error_display_unknown_category() {
        let err = PriceError::UnknownCategory {
            field: "city",
            value: "atlantis".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("city"));
        assert!(msg.contains("atlantis"));
    }

    #[test]
    fn test_error_display_feature_schema() {
        let err = PriceError::FeatureSchema("missing field city_code".to_string());
        assert!(err.to_string().contains("Feature schema mismatch"));
    }

    #[test]
    fn test_error_display_unknown_property_type() {
        let err = PriceError::UnknownPropertyType("chalet".to_string());
        assert!(err.to_string().contains("chalet"));
        assert_eq!(err.kind(), "unknown_property_type");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: PriceError = io_err.into();
        assert!(matches!(err, PriceError::Io(_)));
    }

    #[test]
    fn test_error_from_bincode_error() {
        let bad_bytes: &[u8] = &[0xff, 0xff, 0xff, 0xff];
        let result: std::result::Result<String, bincode::Error> = bincode::deserialize(bad_bytes);
        if let Err(e) = result {
            let err: PriceError = e.into();
            assert!(matches!(err, PriceError::Serialization(_)));
        }
    }

    #[test]
    fn test_error_is_std_error() {
        let err = PriceError::InvalidParameter("test".to_string());
        let _: &dyn std::error::Error = &err;
    }
}

//! Single-listing price prediction.
//!
//! A [`ServingContext`] is built once from a [`PriceModelBundle`] and is
//! read-only afterwards. It is `Send + Sync`; request handlers share it by
//! reference or through an `Arc`, without locks or globals.
//!
//! ```ignore
//! let context = ServingContext::load("price_model.bin")?;
//! match context.respond(r#"{"surface": 100, ... }"#) {
//!     Ok(response) => println!("{}", response.formatted_price),
//!     Err(rejected) => eprintln!("{}: {}", rejected.kind, rejected.message),
//! }
//! ```

use crate::dataset::{Amenities, PropertyType};
use crate::error::{PriceError, Result};
use crate::features::{
    EncodeMode, FeatureAssembler, FeatureSchema, FeatureVector, ListingAttributes,
};
use crate::model::InferenceModel;
use crate::pipeline::{PriceModelBundle, CURRENCY};
use crate::preprocessing::{parse_property_type, EncodingVocabulary};
use crate::transform::to_price;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Prediction request as sent by the form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub surface: f64,
    #[serde(rename = "nombre_de_chambres")]
    pub bedrooms: i64,
    #[serde(rename = "nombre_de_salles_de_bain")]
    pub bathrooms: i64,
    #[serde(rename = "etage")]
    pub floor: i64,
    #[serde(rename = "terrasse")]
    pub terrace: u8,
    pub garage: u8,
    #[serde(rename = "ascenseur")]
    pub elevator: u8,
    #[serde(rename = "piscine")]
    pub pool: u8,
    #[serde(rename = "securite")]
    pub security: u8,
    #[serde(rename = "type_bien")]
    pub property_type: String,
    #[serde(rename = "ville")]
    pub city: String,
    #[serde(rename = "quartier")]
    pub neighborhood: String,
}

fn flag(name: &str, value: u8) -> Result<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(PriceError::InvalidRequest(format!(
            "{name} must be 0 or 1, got {other}"
        ))),
    }
}

fn count(name: &str, value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        PriceError::InvalidRequest(format!("{name} must be a non-negative integer, got {value}"))
    })
}

fn label(name: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PriceError::InvalidRequest(format!("{name} must not be empty")));
    }
    Ok(trimmed.to_string())
}

impl PredictionRequest {
    /// Validate the request and convert it into assembler input.
    ///
    /// # Errors
    /// - [`PriceError::InvalidRequest`] for a non-positive surface, negative
    ///   counts, flags other than 0/1 or empty labels
    /// - [`PriceError::UnknownPropertyType`] for a type outside the fixed set
    pub fn to_attributes(&self) -> Result<ListingAttributes> {
        if !(self.surface.is_finite() && self.surface > 0.0) {
            return Err(PriceError::InvalidRequest(format!(
                "surface must be > 0, got {}",
                self.surface
            )));
        }
        let floor = i32::try_from(self.floor).map_err(|_| {
            PriceError::InvalidRequest(format!("etage out of range: {}", self.floor))
        })?;
        let property_type: PropertyType = parse_property_type(&self.property_type)?;

        Ok(ListingAttributes {
            surface: self.surface,
            bedrooms: Some(count("nombre_de_chambres", self.bedrooms)?),
            bathrooms: Some(count("nombre_de_salles_de_bain", self.bathrooms)?),
            floor: Some(floor),
            amenities: Amenities {
                terrace: flag("terrasse", self.terrace)?,
                garage: flag("garage", self.garage)?,
                elevator: flag("ascenseur", self.elevator)?,
                pool: flag("piscine", self.pool)?,
                security: flag("securite", self.security)?,
            },
            property_type,
            city: label("ville", &self.city)?,
            neighborhood: label("quartier", &self.neighborhood)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
    pub formatted_price: String,
}

/// Structured rejection returned by [`ServingContext::respond`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRequest {
    /// Machine-readable error kind, see [`PriceError::kind`].
    pub kind: String,
    pub message: String,
}

impl From<PriceError> for RejectedRequest {
    fn from(err: PriceError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for RejectedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Format a price with thousands separators and two decimals: `1,234,567.89 MAD`.
pub fn format_price(price: f64, currency: &str) -> String {
    let fixed = format!("{:.2}", price.abs());
    let (integer, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if price < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{decimals} {currency}")
}

/// Immutable prediction state: schema, vocabulary and regressor.
pub struct ServingContext {
    schema: FeatureSchema,
    vocabulary: EncodingVocabulary,
    model: Box<dyn InferenceModel>,
    currency: String,
}

impl fmt::Debug for ServingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServingContext")
            .field("schema_version", &self.schema.version())
            .field("n_features", &self.model.n_features())
            .field("cities", &self.vocabulary.city.n_cities())
            .field("currency", &self.currency)
            .finish()
    }
}

impl ServingContext {
    /// Build from a bundle, validating its schema.
    pub fn new(bundle: PriceModelBundle) -> Result<Self> {
        bundle.validate()?;
        let model = bundle.regressor()?;
        let PriceModelBundle {
            schema,
            vocabulary,
            currency,
            ..
        } = bundle;
        Ok(Self {
            schema,
            vocabulary,
            model: Box::new(model),
            currency,
        })
    }

    /// Build from a vocabulary and any regressor over the current schema.
    pub fn from_parts<M>(vocabulary: EncodingVocabulary, model: M) -> Result<Self>
    where
        M: InferenceModel + 'static,
    {
        let schema = FeatureSchema::current();
        if model.n_features() != schema.len() {
            return Err(PriceError::FeatureSchema(format!(
                "model expects {} features, schema has {}",
                model.n_features(),
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            vocabulary,
            model: Box::new(model),
            currency: CURRENCY.to_string(),
        })
    }

    /// Load a bundle file and build the context.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(PriceModelBundle::load(path)?)
    }

    /// The schema the model was trained against.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn vocabulary(&self) -> &EncodingVocabulary {
        &self.vocabulary
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// The feature vector a request is scored on.
    ///
    /// # Errors
    /// [`PriceError::FeatureSchema`] if the assembled vector does not have
    /// the width of the model's schema.
    pub fn features(&self, request: &PredictionRequest) -> Result<FeatureVector> {
        let attributes = request.to_attributes()?;
        let features =
            FeatureAssembler::new(&self.vocabulary).assemble(&attributes, EncodeMode::Inference)?;
        if features.len() != self.schema.len() {
            return Err(PriceError::FeatureSchema(format!(
                "assembled {} features, model schema v{} has {}",
                features.len(),
                self.schema.version(),
                self.schema.len()
            )));
        }
        Ok(features)
    }

    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        let features = self.features(request)?;
        let log_price = self.model.predict(&features)?;
        let predicted_price = to_price(log_price);
        if !predicted_price.is_finite() {
            return Err(PriceError::InvalidRequest(format!(
                "request produced a non-finite price (log price {log_price})"
            )));
        }
        debug!(log_price, predicted_price, "scored request");
        Ok(PredictionResponse {
            predicted_price,
            formatted_price: format_price(predicted_price, &self.currency),
        })
    }

    /// Parse a JSON request body and predict.
    pub fn predict_json(&self, body: &str) -> Result<PredictionResponse> {
        let request: PredictionRequest =
            serde_json::from_str(body).map_err(|e| PriceError::InvalidRequest(e.to_string()))?;
        self.predict(&request)
    }

    /// Request boundary: every failure becomes a [`RejectedRequest`].
    pub fn respond(&self, body: &str) -> std::result::Result<PredictionResponse, RejectedRequest> {
        self.predict_json(body).map_err(RejectedRequest::from)
    }
}

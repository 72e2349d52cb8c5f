//! Unified feature assembly for training rows and inference requests.
//!
//! [`FeatureAssembler::assemble`] is the only function that turns listing
//! attributes into model input. Training and serving both call it, so the two
//! paths cannot drift apart in field names, order or count. The produced
//! field list is checked against the versioned [`FeatureSchema`] before it
//! becomes a [`FeatureVector`].

use crate::dataset::{Amenities, ListingRecord, PropertyType};
use crate::error::{PriceError, Result};
use crate::preprocessing::{
    one_hot, CountCells, DerivedFeatureBuilder, EncodingVocabulary, FittedTransformer,
};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Version of [`FEATURE_NAMES`]. Bump on any change of names or order.
pub const SCHEMA_VERSION: u32 = 1;

/// Number of model input fields.
pub const N_FEATURES: usize = 24;

/// Model input fields, in column order.
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "surface",
    "bedrooms",
    "bathrooms",
    "floor",
    "amenity_score",
    "price_per_area",
    "surface_villa",
    "surface_appartement",
    "terrace",
    "garage",
    "elevator",
    "pool",
    "security",
    "type_apartment",
    "type_office",
    "type_farm",
    "type_commercial",
    "type_housing",
    "type_house",
    "type_riad",
    "type_land",
    "type_villa",
    "city_code",
    "neighborhood_target_encoded",
];

const TYPE_FIELDS: [&str; 9] = [
    "type_apartment",
    "type_office",
    "type_farm",
    "type_commercial",
    "type_housing",
    "type_house",
    "type_riad",
    "type_land",
    "type_villa",
];

const AMENITY_FIELDS: [&str; Amenities::COUNT] =
    ["terrace", "garage", "elevator", "pool", "security"];

/// Named, versioned list of model input fields. Persisted with the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    names: Vec<String>,
}

impl FeatureSchema {
    /// The schema this build assembles.
    pub fn current() -> Self {
        Self {
            version: SCHEMA_VERSION,
            names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Check an assembled field list against the schema.
    ///
    /// # Errors
    /// [`PriceError::FeatureSchema`] if a field is missing, unexpected, out of
    /// order, or carries a non-finite value.
    pub fn align(&self, fields: Vec<(&str, f64)>) -> Result<FeatureVector> {
        let expected: BTreeSet<&str> = self.names.iter().map(String::as_str).collect();
        let got: BTreeSet<&str> = fields.iter().map(|(name, _)| *name).collect();

        if let Some(missing) = expected.difference(&got).next() {
            return Err(PriceError::FeatureSchema(format!(
                "missing field '{missing}'"
            )));
        }
        if let Some(extra) = got.difference(&expected).next() {
            return Err(PriceError::FeatureSchema(format!(
                "unexpected field '{extra}'"
            )));
        }
        if fields.len() != self.names.len() {
            return Err(PriceError::FeatureSchema(format!(
                "expected {} fields, got {}",
                self.names.len(),
                fields.len()
            )));
        }

        let mut values = Vec::with_capacity(fields.len());
        for (position, ((name, value), expected)) in fields.iter().zip(&self.names).enumerate() {
            if *name != expected.as_str() {
                return Err(PriceError::FeatureSchema(format!(
                    "field '{name}' at position {position}, expected '{expected}'"
                )));
            }
            if !value.is_finite() {
                return Err(PriceError::FeatureSchema(format!(
                    "non-finite value for field '{name}'"
                )));
            }
            values.push(*value);
        }
        Ok(FeatureVector { values })
    }

    /// Compare a persisted schema with this one.
    pub fn validate(&self, other: &FeatureSchema) -> Result<()> {
        if self.version != other.version {
            return Err(PriceError::FeatureSchema(format!(
                "schema version {} does not match version {}",
                other.version, self.version
            )));
        }
        if self.names != other.names {
            let position = self
                .names
                .iter()
                .zip(&other.names)
                .position(|(a, b)| a != b)
                .unwrap_or_else(|| self.names.len().min(other.names.len()));
            return Err(PriceError::FeatureSchema(format!(
                "field lists differ at position {position}"
            )));
        }
        Ok(())
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::current()
    }
}

/// One assembled model input, in [`FEATURE_NAMES`] order.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a named field.
    pub fn get(&self, name: &str) -> Option<f64> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(|i| self.values.get(i).copied())
    }

    /// `(name, value)` pairs.
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES.iter().copied().zip(self.values.iter().copied())
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(self.values.clone())
    }
}

/// Row-stacked feature vectors.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureMatrix {
    data: Array2<f64>,
}

impl FeatureMatrix {
    pub fn from_vectors(vectors: &[FeatureVector]) -> Result<Self> {
        let flat: Vec<f64> = vectors.iter().flat_map(|v| v.values.iter().copied()).collect();
        let data = Array2::from_shape_vec((vectors.len(), N_FEATURES), flat)
            .map_err(|e| PriceError::FeatureSchema(e.to_string()))?;
        Ok(Self { data })
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn as_array(&self) -> &Array2<f64> {
        &self.data
    }

    pub fn into_array(self) -> Array2<f64> {
        self.data
    }
}

/// Whether categorical lookups may fall back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncodeMode {
    /// Every city must be in the vocabulary; neighborhood fallbacks are silent.
    Training,
    /// Unseen cities get the hash fallback code; every fallback is logged.
    Inference,
}

/// Listing attributes the assembler consumes: a training row minus its price,
/// or a validated request.
#[derive(Clone, Debug, PartialEq)]
pub struct ListingAttributes {
    pub surface: f64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub floor: Option<i32>,
    pub amenities: Amenities,
    pub property_type: PropertyType,
    pub city: String,
    pub neighborhood: String,
}

impl From<&ListingRecord> for ListingAttributes {
    fn from(record: &ListingRecord) -> Self {
        Self {
            surface: record.surface,
            bedrooms: record.bedrooms,
            bathrooms: record.bathrooms,
            floor: record.floor,
            amenities: record.amenities,
            property_type: record.property_type,
            city: record.city.clone(),
            neighborhood: record.neighborhood.clone(),
        }
    }
}

/// Builds feature vectors against one fitted vocabulary.
#[derive(Clone, Debug)]
pub struct FeatureAssembler<'a> {
    vocabulary: &'a EncodingVocabulary,
    schema: FeatureSchema,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(vocabulary: &'a EncodingVocabulary) -> Self {
        Self {
            vocabulary,
            schema: FeatureSchema::current(),
        }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn vocabulary(&self) -> &'a EncodingVocabulary {
        self.vocabulary
    }

    /// Named fields of one listing, before schema alignment.
    pub fn fields(
        &self,
        attributes: &ListingAttributes,
        mode: EncodeMode,
    ) -> Result<Vec<(&'static str, f64)>> {
        let vocab = self.vocabulary;
        let counts = vocab.counts.transform(&CountCells {
            bedrooms: attributes.bedrooms,
            bathrooms: attributes.bathrooms,
            floor: attributes.floor,
        })?;
        let indicators = one_hot(attributes.property_type);
        // Training rows of the test partition hit the price fallbacks
        // routinely; the pipeline reports their count once instead of per row.
        let derived = DerivedFeatureBuilder::new(&vocab.price_per_area)
            .warn_on_fallback(mode == EncodeMode::Inference)
            .build(
                attributes.surface,
                &indicators,
                &attributes.amenities,
                &attributes.city,
            )?;
        let city_code = match mode {
            EncodeMode::Training => vocab.city.transform(&attributes.city)?,
            EncodeMode::Inference => vocab.city.encode_for_inference(&attributes.city),
        };
        let neighborhood = match mode {
            EncodeMode::Training => vocab.neighborhood.lookup(&attributes.neighborhood).value,
            EncodeMode::Inference => vocab.neighborhood.transform(&attributes.neighborhood)?,
        };

        let mut fields = Vec::with_capacity(N_FEATURES);
        fields.push(("surface", attributes.surface));
        fields.push(("bedrooms", counts.bedrooms));
        fields.push(("bathrooms", counts.bathrooms));
        fields.push(("floor", counts.floor));
        fields.push(("amenity_score", derived.amenity_score));
        fields.push(("price_per_area", derived.price_per_area));
        fields.push(("surface_villa", derived.surface_villa));
        fields.push(("surface_appartement", derived.surface_appartement));
        for (name, flag) in AMENITY_FIELDS.iter().copied().zip(attributes.amenities.flags()) {
            fields.push((name, if flag { 1.0 } else { 0.0 }));
        }
        fields.extend(TYPE_FIELDS.iter().copied().zip(indicators));
        fields.push(("city_code", city_code as f64));
        fields.push(("neighborhood_target_encoded", neighborhood));
        Ok(fields)
    }

    /// Assemble and schema-check one listing.
    pub fn assemble(
        &self,
        attributes: &ListingAttributes,
        mode: EncodeMode,
    ) -> Result<FeatureVector> {
        self.schema.align(self.fields(attributes, mode)?)
    }

    /// Assemble the given rows of `records` into a matrix.
    pub fn assemble_rows(
        &self,
        records: &[ListingRecord],
        indices: &[usize],
        mode: EncodeMode,
    ) -> Result<FeatureMatrix> {
        let vectors = indices
            .iter()
            .map(|&i| {
                let record = records.get(i).ok_or_else(|| {
                    PriceError::InvalidParameter(format!("row index {i} out of range"))
                })?;
                self.assemble(&ListingAttributes::from(record), mode)
            })
            .collect::<Result<Vec<_>>>()?;
        FeatureMatrix::from_vectors(&vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;
    use crate::preprocessing::fallback_city_code;

    fn fixture() -> (Vec<ListingRecord>, EncodingVocabulary) {
        let mut records = vec![
            record(1_000_000.0, 100.0, "Rabat", "Agdal", PropertyType::Apartment),
            record(3_000_000.0, 200.0, "Rabat", "Souissi", PropertyType::Villa),
            record(600_000.0, 60.0, "Fes", "Medina", PropertyType::Riad),
        ];
        records[1].amenities.pool = true;
        records[1].amenities.garage = true;
        records[2].bedrooms = None;
        let vocab = EncodingVocabulary::fit_all(&records).unwrap();
        (records, vocab)
    }

    #[test]
    fn test_schema_names_and_version() {
        let schema = FeatureSchema::current();
        assert_eq!(schema.version(), 1);
        assert_eq!(schema.len(), 24);
        assert_eq!(schema.names()[0], "surface");
        assert_eq!(schema.names()[23], "neighborhood_target_encoded");
    }

    #[test]
    fn test_assemble_villa_row() {
        let (records, vocab) = fixture();
        let assembler = FeatureAssembler::new(&vocab);
        let v = assembler
            .assemble(&ListingAttributes::from(&records[1]), EncodeMode::Training)
            .unwrap();

        assert_eq!(v.len(), N_FEATURES);
        assert_eq!(v.get("surface"), Some(200.0));
        assert_eq!(v.get("surface_villa"), Some(200.0));
        assert_eq!(v.get("surface_appartement"), Some(0.0));
        assert_eq!(v.get("type_villa"), Some(1.0));
        assert_eq!(v.get("type_apartment"), Some(0.0));
        assert_eq!(v.get("pool"), Some(1.0));
        assert_eq!(v.get("terrace"), Some(0.0));
        assert!((v.get("amenity_score").unwrap() - 0.4).abs() < 1e-12);
        // Rabat: (1.0M + 3.0M) / (100 + 200)
        assert!((v.get("price_per_area").unwrap() - 4_000_000.0 / 300.0).abs() < 1e-9);
        assert_eq!(v.get("city_code"), Some(1.0));
        assert_eq!(v.get("neighborhood_target_encoded"), Some(3_000_000.0));
    }

    #[test]
    fn test_missing_count_is_imputed() {
        let (records, vocab) = fixture();
        let v = FeatureAssembler::new(&vocab)
            .assemble(&ListingAttributes::from(&records[2]), EncodeMode::Training)
            .unwrap();
        assert_eq!(v.get("bedrooms"), Some(vocab.counts.statistics().bedrooms));
    }

    #[test]
    fn test_training_and_inference_agree_on_known_values() {
        let (records, vocab) = fixture();
        let assembler = FeatureAssembler::new(&vocab);
        for r in &records {
            let attrs = ListingAttributes::from(r);
            let train = assembler.assemble(&attrs, EncodeMode::Training).unwrap();
            let serve = assembler.assemble(&attrs, EncodeMode::Inference).unwrap();
            assert_eq!(train, serve);
        }
    }

    #[test]
    fn test_training_rows_fall_back_to_global_price_statistics() {
        let (records, _) = fixture();
        // Fes is in the city vocabulary but absent from the price tables.
        let vocab = EncodingVocabulary::fit(&records, &[0, 1]).unwrap();
        assert!(vocab.price_per_area.lookup("Fes").used_fallback);

        let v = FeatureAssembler::new(&vocab)
            .assemble(&ListingAttributes::from(&records[2]), EncodeMode::Training)
            .unwrap();
        assert_eq!(v.get("price_per_area"), Some(vocab.price_per_area.global()));
        assert_eq!(
            v.get("neighborhood_target_encoded"),
            Some(vocab.neighborhood.fallback())
        );
    }

    #[test]
    fn test_unknown_city_depends_on_mode() {
        let (records, vocab) = fixture();
        let assembler = FeatureAssembler::new(&vocab);
        let mut attrs = ListingAttributes::from(&records[0]);
        attrs.city = "Oujda".to_string();
        attrs.neighborhood = "Centre".to_string();

        let err = assembler.assemble(&attrs, EncodeMode::Training).unwrap_err();
        assert!(matches!(err, PriceError::UnknownCategory { field: "city", .. }));

        let v = assembler.assemble(&attrs, EncodeMode::Inference).unwrap();
        assert_eq!(v.get("city_code"), Some(fallback_city_code("Oujda") as f64));
        assert_eq!(v.get("price_per_area"), Some(vocab.price_per_area.global()));
        assert_eq!(
            v.get("neighborhood_target_encoded"),
            Some(vocab.neighborhood.fallback())
        );
    }

    #[test]
    fn test_align_rejects_missing_field() {
        let (records, vocab) = fixture();
        let assembler = FeatureAssembler::new(&vocab);
        let mut fields = assembler
            .fields(&ListingAttributes::from(&records[0]), EncodeMode::Training)
            .unwrap();
        fields.retain(|(name, _)| *name != "floor");
        let err = assembler.schema().align(fields).unwrap_err();
        assert!(matches!(err, PriceError::FeatureSchema(ref m) if m.contains("floor")));
    }

    #[test]
    fn test_align_rejects_extra_and_reordered_fields() {
        let (records, vocab) = fixture();
        let assembler = FeatureAssembler::new(&vocab);
        let attrs = ListingAttributes::from(&records[0]);

        let mut extra = assembler.fields(&attrs, EncodeMode::Training).unwrap();
        extra.push(("balcony", 1.0));
        assert!(matches!(
            assembler.schema().align(extra),
            Err(PriceError::FeatureSchema(_))
        ));

        let mut swapped = assembler.fields(&attrs, EncodeMode::Training).unwrap();
        swapped.swap(0, 1);
        assert!(matches!(
            assembler.schema().align(swapped),
            Err(PriceError::FeatureSchema(ref m)) if m.contains("position 0")
        ));

        let mut duplicated = assembler.fields(&attrs, EncodeMode::Training).unwrap();
        duplicated.push(("surface", 1.0));
        assert!(assembler.schema().align(duplicated).is_err());
    }

    #[test]
    fn test_validate_persisted_schema() {
        let current = FeatureSchema::current();
        assert!(current.validate(&FeatureSchema::current()).is_ok());

        let mut older = FeatureSchema::current();
        older.version = 0;
        assert!(current.validate(&older).is_err());

        let mut shorter = FeatureSchema::current();
        shorter.names.pop();
        assert!(matches!(
            current.validate(&shorter),
            Err(PriceError::FeatureSchema(_))
        ));
    }

    #[test]
    fn test_matrix_shape() {
        let (records, vocab) = fixture();
        let m = FeatureAssembler::new(&vocab)
            .assemble_rows(&records, &[2, 0], EncodeMode::Training)
            .unwrap();
        assert_eq!(m.as_array().dim(), (2, N_FEATURES));
        assert_eq!(m.as_array()[[1, 0]], 100.0);

        let err = FeatureAssembler::new(&vocab)
            .assemble_rows(&records, &[7], EncodeMode::Training)
            .unwrap_err();
        assert!(matches!(err, PriceError::InvalidParameter(_)));
    }
}

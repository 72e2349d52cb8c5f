//! Listing records and the raw tabular dataset they are cleaned from.
//!
//! # Core Concepts
//!
//! - [`RawListing`]: one row as read from the delimited file. Every cell that
//!   could not be parsed is `None`, never a silent zero.
//! - [`ListingRecord`]: a cleaned row with a known positive `price` and
//!   `surface` and exactly one property type. Only these are used for fitting.
//! - [`Dataset`]: the rows of one file plus the cleaning step between the two.
//!
//! # Example
//!
//! ```no_run
//! use immo_price::dataset::RawDatasetReader;
//!
//! let dataset = RawDatasetReader::new().read("data_final.csv").unwrap();
//! let records = dataset.complete_records();
//! println!("{} usable listings", records.len());
//! ```

use crate::error::PriceError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

pub mod reader;
pub use self::reader::{sniff_delimiter, RawDatasetReader};

/// Normalize a categorical label: trimmed, lowercased, inner whitespace collapsed.
///
/// Every city and neighborhood key goes through this function, both when a
/// vocabulary is fitted and when it is queried.
pub fn normalize_label(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Property types of the fixed one-hot schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyType {
    Apartment,
    Office,
    Farm,
    Commercial,
    Housing,
    House,
    Riad,
    Land,
    Villa,
}

impl PropertyType {
    /// All types, in one-hot column order.
    pub const ALL: [PropertyType; 9] = [
        PropertyType::Apartment,
        PropertyType::Office,
        PropertyType::Farm,
        PropertyType::Commercial,
        PropertyType::Housing,
        PropertyType::House,
        PropertyType::Riad,
        PropertyType::Land,
        PropertyType::Villa,
    ];

    /// Label used by the listing site and by prediction requests.
    pub fn label(self) -> &'static str {
        match self {
            PropertyType::Apartment => "appartement",
            PropertyType::Office => "bureau",
            PropertyType::Farm => "ferme",
            PropertyType::Commercial => "local_commercial",
            PropertyType::Housing => "logement",
            PropertyType::House => "maison",
            PropertyType::Riad => "riad",
            PropertyType::Land => "terrain",
            PropertyType::Villa => "villa",
        }
    }

    /// Dataset column holding this type's indicator (`bien_<label>`).
    pub fn column_name(self) -> String {
        format!("bien_{}", self.label())
    }

    /// Position of this type in [`PropertyType::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PropertyType {
    type Err = PriceError;

    /// Accepts the site labels (`appartement`, `local commercial`, ...), the
    /// dataset column names (`bien_villa`) and English names (`apartment`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = normalize_label(s).replace([' ', '-'], "_");
        let key = key.strip_prefix("bien_").unwrap_or(&key);
        match key {
            "appartement" | "apartment" => Ok(PropertyType::Apartment),
            "bureau" | "office" => Ok(PropertyType::Office),
            "ferme" | "farm" => Ok(PropertyType::Farm),
            "local_commercial" | "commercial" => Ok(PropertyType::Commercial),
            "logement" | "housing" => Ok(PropertyType::Housing),
            "maison" | "house" => Ok(PropertyType::House),
            "riad" => Ok(PropertyType::Riad),
            "terrain" | "land" => Ok(PropertyType::Land),
            "villa" => Ok(PropertyType::Villa),
            _ => Err(PriceError::UnknownPropertyType(s.trim().to_string())),
        }
    }
}

/// The five boolean amenity flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenities {
    pub terrace: bool,
    pub garage: bool,
    pub elevator: bool,
    pub pool: bool,
    pub security: bool,
}

impl Amenities {
    pub const COUNT: usize = 5;

    /// Flags in feature order: terrace, garage, elevator, pool, security.
    pub fn flags(&self) -> [bool; 5] {
        [
            self.terrace,
            self.garage,
            self.elevator,
            self.pool,
            self.security,
        ]
    }
}

/// Amenity cells as read from the file; `None` marks an unparseable or empty cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RawAmenities {
    pub terrace: Option<bool>,
    pub garage: Option<bool>,
    pub elevator: Option<bool>,
    pub pool: Option<bool>,
    pub security: Option<bool>,
}

impl RawAmenities {
    fn resolve(&self) -> (Amenities, usize) {
        let cells = [
            self.terrace,
            self.garage,
            self.elevator,
            self.pool,
            self.security,
        ];
        let missing = cells.iter().filter(|c| c.is_none()).count();
        let amenities = Amenities {
            terrace: self.terrace.unwrap_or(false),
            garage: self.garage.unwrap_or(false),
            elevator: self.elevator.unwrap_or(false),
            pool: self.pool.unwrap_or(false),
            security: self.security.unwrap_or(false),
        };
        (amenities, missing)
    }
}

/// One row of the input file with typed, possibly missing cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawListing {
    pub price: Option<f64>,
    pub surface: Option<f64>,
    pub bedrooms: Option<f64>,
    pub bathrooms: Option<f64>,
    pub floor: Option<f64>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    /// Types whose `bien_<type>` cell is true.
    pub property_types: Vec<PropertyType>,
    pub amenities: RawAmenities,
}

/// Why a raw row could not become a [`ListingRecord`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum DropReason {
    MissingPrice,
    NonPositivePrice,
    MissingSurface,
    NonPositiveSurface,
    MissingCity,
    MissingNeighborhood,
    NoPropertyType,
    AmbiguousPropertyType,
}

impl RawListing {
    /// Convert into a cleaned record, or report why the row is unusable.
    ///
    /// Missing amenity cells resolve to `false`; the number of such cells is
    /// returned alongside the record so the caller can report it.
    pub fn to_record(&self) -> Result<(ListingRecord, usize), DropReason> {
        let price = self.price.ok_or(DropReason::MissingPrice)?;
        if price <= 0.0 {
            return Err(DropReason::NonPositivePrice);
        }
        let surface = self.surface.ok_or(DropReason::MissingSurface)?;
        if surface <= 0.0 {
            return Err(DropReason::NonPositiveSurface);
        }
        let city = non_empty(&self.city).ok_or(DropReason::MissingCity)?;
        let neighborhood = non_empty(&self.neighborhood).ok_or(DropReason::MissingNeighborhood)?;
        let property_type = match self.property_types.as_slice() {
            [] => return Err(DropReason::NoPropertyType),
            [only] => *only,
            _ => return Err(DropReason::AmbiguousPropertyType),
        };
        let (amenities, missing_amenities) = self.amenities.resolve();

        let record = ListingRecord {
            price,
            surface,
            bedrooms: self.bedrooms.and_then(to_count),
            bathrooms: self.bathrooms.and_then(to_count),
            floor: self.floor.map(|f| f.round() as i32),
            city,
            neighborhood,
            property_type,
            amenities,
        };
        Ok((record, missing_amenities))
    }
}

fn non_empty(cell: &Option<String>) -> Option<String> {
    cell.as_ref()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn to_count(value: f64) -> Option<u32> {
    if value >= 0.0 && value <= u32::MAX as f64 {
        Some(value.round() as u32)
    } else {
        None
    }
}

/// One cleaned listing, usable for fitting.
///
/// Invariant: `price > 0` and `surface > 0`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub price: f64,
    pub surface: f64,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub floor: Option<i32>,
    pub city: String,
    pub neighborhood: String,
    pub property_type: PropertyType,
    pub amenities: Amenities,
}

impl ListingRecord {
    /// Normalized city key.
    pub fn city_key(&self) -> String {
        normalize_label(&self.city)
    }

    /// Normalized neighborhood key.
    pub fn neighborhood_key(&self) -> String {
        normalize_label(&self.neighborhood)
    }
}

/// All rows of one dataset file.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    rows: Vec<RawListing>,
}

impl Dataset {
    pub fn new(rows: Vec<RawListing>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[RawListing] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows that satisfy the [`ListingRecord`] invariant, in file order.
    ///
    /// Dropped rows are counted per [`DropReason`] and reported as a warning.
    pub fn complete_records(&self) -> Vec<ListingRecord> {
        let mut records = Vec::with_capacity(self.rows.len());
        let mut dropped: BTreeMap<DropReason, usize> = BTreeMap::new();
        let mut missing_amenities = 0usize;

        for row in &self.rows {
            match row.to_record() {
                Ok((record, missing)) => {
                    missing_amenities += missing;
                    records.push(record);
                }
                Err(reason) => *dropped.entry(reason).or_insert(0) += 1,
            }
        }

        if !dropped.is_empty() {
            warn!(
                total = self.rows.len(),
                kept = records.len(),
                dropped = ?dropped,
                "dropped incomplete listings"
            );
        }
        if missing_amenities > 0 {
            warn!(
                cells = missing_amenities,
                "missing amenity cells treated as absent"
            );
        }
        records
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Record builder shared by the unit tests of other modules.
    pub(crate) fn record(
        price: f64,
        surface: f64,
        city: &str,
        neighborhood: &str,
        property_type: PropertyType,
    ) -> ListingRecord {
        ListingRecord {
            price,
            surface,
            bedrooms: Some(2),
            bathrooms: Some(1),
            floor: Some(1),
            city: city.to_string(),
            neighborhood: neighborhood.to_string(),
            property_type,
            amenities: Amenities::default(),
        }
    }

    fn raw_row() -> RawListing {
        RawListing {
            price: Some(950_000.0),
            surface: Some(80.0),
            bedrooms: Some(2.0),
            bathrooms: Some(1.0),
            floor: Some(3.0),
            city: Some("Casablanca".to_string()),
            neighborhood: Some("Maarif".to_string()),
            property_types: vec![PropertyType::Apartment],
            amenities: RawAmenities {
                terrace: Some(true),
                garage: None,
                elevator: Some(true),
                pool: Some(false),
                security: Some(true),
            },
        }
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Casa   Blanca "), "casa blanca");
        assert_eq!(normalize_label("MAARIF"), "maarif");
    }

    #[test]
    fn test_property_type_parsing() {
        assert_eq!(
            "Appartement".parse::<PropertyType>().unwrap(),
            PropertyType::Apartment
        );
        assert_eq!(
            "local commercial".parse::<PropertyType>().unwrap(),
            PropertyType::Commercial
        );
        assert_eq!(
            "bien_villa".parse::<PropertyType>().unwrap(),
            PropertyType::Villa
        );
        assert_eq!("land".parse::<PropertyType>().unwrap(), PropertyType::Land);

        let err = "chalet".parse::<PropertyType>().unwrap_err();
        assert!(matches!(err, PriceError::UnknownPropertyType(ref s) if s == "chalet"));
    }

    #[test]
    fn test_property_type_order_matches_index() {
        for (i, ty) in PropertyType::ALL.iter().enumerate() {
            assert_eq!(ty.index(), i);
        }
        assert_eq!(PropertyType::Commercial.column_name(), "bien_local_commercial");
    }

    #[test]
    fn test_raw_row_to_record() {
        let (record, missing) = raw_row().to_record().unwrap();
        assert_eq!(record.price, 950_000.0);
        assert_eq!(record.bedrooms, Some(2));
        assert_eq!(record.floor, Some(3));
        assert_eq!(record.property_type, PropertyType::Apartment);
        assert!(record.amenities.terrace);
        assert!(!record.amenities.garage);
        assert_eq!(missing, 1);
    }

    #[test]
    fn test_raw_row_drop_reasons() {
        let mut row = raw_row();
        row.price = None;
        assert_eq!(row.to_record().unwrap_err(), DropReason::MissingPrice);

        let mut row = raw_row();
        row.surface = Some(0.0);
        assert_eq!(row.to_record().unwrap_err(), DropReason::NonPositiveSurface);

        let mut row = raw_row();
        row.neighborhood = Some("   ".to_string());
        assert_eq!(row.to_record().unwrap_err(), DropReason::MissingNeighborhood);

        let mut row = raw_row();
        row.property_types.clear();
        assert_eq!(row.to_record().unwrap_err(), DropReason::NoPropertyType);

        let mut row = raw_row();
        row.property_types.push(PropertyType::Villa);
        assert_eq!(
            row.to_record().unwrap_err(),
            DropReason::AmbiguousPropertyType
        );
    }

    #[test]
    fn test_negative_counts_become_missing() {
        let mut row = raw_row();
        row.bedrooms = Some(-1.0);
        let (record, _) = row.to_record().unwrap();
        assert_eq!(record.bedrooms, None);
    }

    #[test]
    fn test_complete_records_keeps_order() {
        let mut bad = raw_row();
        bad.price = None;
        let mut second = raw_row();
        second.price = Some(1_200_000.0);

        let dataset = Dataset::new(vec![raw_row(), bad, second]);
        let records = dataset.complete_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].price, 950_000.0);
        assert_eq!(records[1].price, 1_200_000.0);
    }
}

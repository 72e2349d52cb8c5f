//! Listing catalog for the prediction form.
//!
//! Summarizes the cleaned dataset into the choices a front-end offers: the
//! cities, the neighborhoods of each city, the property types present, which
//! amenities are worth asking about per type, and which types have bedrooms
//! or floors at all. Keys are the French field names the form expects.

use crate::dataset::{normalize_label, ListingRecord, PropertyType};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::info;

/// Share of a type's listings above which an amenity is offered for that type.
const AMENITY_RELEVANCE: f64 = 0.05;

const AMENITY_LABELS: [&str; 5] = ["terrasse", "garage", "ascenseur", "piscine", "securite"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListingCatalog {
    #[serde(rename = "villes")]
    pub cities: Vec<String>,
    #[serde(rename = "quartiers_par_ville")]
    pub neighborhoods_by_city: BTreeMap<String, Vec<String>>,
    #[serde(rename = "type_features")]
    pub amenities_by_type: BTreeMap<String, Vec<String>>,
    #[serde(rename = "types_sans_chambres")]
    pub types_without_bedrooms: Vec<String>,
    #[serde(rename = "types_avec_etage")]
    pub types_with_floors: Vec<String>,
    #[serde(rename = "types_biens_disponibles")]
    pub property_types: Vec<String>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

impl ListingCatalog {
    /// Build the catalog from cleaned records.
    ///
    /// Cities and neighborhoods are grouped by normalized label and shown
    /// with the first spelling encountered.
    pub fn from_records(records: &[ListingRecord]) -> Self {
        let mut city_labels: BTreeMap<String, String> = BTreeMap::new();
        let mut neighborhoods: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
        let mut by_type: BTreeMap<PropertyType, Vec<&ListingRecord>> = BTreeMap::new();

        for record in records {
            let city_key = record.city_key();
            city_labels
                .entry(city_key.clone())
                .or_insert_with(|| record.city.trim().to_string());
            neighborhoods
                .entry(city_key)
                .or_default()
                .entry(record.neighborhood_key())
                .or_insert_with(|| record.neighborhood.trim().to_string());
            by_type.entry(record.property_type).or_default().push(record);
        }

        let cities: BTreeSet<String> = city_labels.values().cloned().collect();
        let neighborhoods_by_city = neighborhoods
            .into_iter()
            .filter_map(|(key, names)| {
                let label = city_labels.get(&key)?.clone();
                let mut names: Vec<String> = names.into_values().collect();
                names.sort();
                Some((label, names))
            })
            .collect();

        let mut amenities_by_type = BTreeMap::new();
        let mut types_without_bedrooms = Vec::new();
        let mut types_with_floors = Vec::new();
        for (ty, rows) in &by_type {
            let label = ty.label().to_string();
            let n = rows.len() as f64;

            let relevant = AMENITY_LABELS
                .iter()
                .enumerate()
                .filter(|(i, _)| {
                    let present = rows.iter().filter(|r| r.amenities.flags()[*i]).count();
                    present as f64 / n > AMENITY_RELEVANCE
                })
                .map(|(_, name)| name.to_string())
                .collect();
            amenities_by_type.insert(label.clone(), relevant);

            let bedrooms: Vec<f64> = rows
                .iter()
                .filter_map(|r| r.bedrooms)
                .map(f64::from)
                .collect();
            if mean(&bedrooms).is_some_and(|m| m < 0.5) {
                types_without_bedrooms.push(label.clone());
            }

            let floors: Vec<f64> = rows.iter().filter_map(|r| r.floor).map(f64::from).collect();
            let max_floor = floors.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if mean(&floors).is_some_and(|m| m > 0.5) || max_floor > 2.0 {
                types_with_floors.push(label.clone());
            }
        }

        let catalog = Self {
            cities: cities.into_iter().collect(),
            neighborhoods_by_city,
            amenities_by_type,
            types_without_bedrooms,
            types_with_floors,
            property_types: by_type.keys().map(|t| t.label().to_string()).collect(),
        };
        info!(
            cities = catalog.cities.len(),
            types = catalog.property_types.len(),
            "built listing catalog"
        );
        catalog
    }

    /// Neighborhoods of a city, matched on the normalized label.
    pub fn neighborhoods(&self, city: &str) -> Option<&[String]> {
        let key = normalize_label(city);
        self.neighborhoods_by_city
            .iter()
            .find(|(label, _)| normalize_label(label) == key)
            .map(|(_, names)| names.as_slice())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// `const DATA = {…};`, loadable by a plain `<script>` tag.
    pub fn to_js(&self) -> Result<String> {
        Ok(format!("const DATA = {};", self.to_json()?))
    }

    /// Write as a script when the extension is `.js`, as JSON otherwise.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = match path.extension().and_then(|e| e.to_str()) {
            Some("js") => self.to_js()?,
            _ => self.to_json()?,
        };
        std::fs::write(path, text)?;
        info!(path = %path.display(), "wrote listing catalog");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::tests::record;

    fn records() -> Vec<ListingRecord> {
        let mut rows = vec![
            record(1.0, 80.0, "Rabat", "Agdal", PropertyType::Apartment),
            record(1.0, 80.0, "rabat", "Hassan", PropertyType::Apartment),
            record(1.0, 80.0, "Casablanca", "Maarif", PropertyType::Apartment),
            record(1.0, 500.0, "Rabat", "Souissi", PropertyType::Land),
            record(1.0, 500.0, "Rabat", "Agdal ", PropertyType::Land),
        ];
        rows[0].amenities.elevator = true;
        rows[0].floor = Some(4);
        rows[1].floor = Some(2);
        rows[2].floor = None;
        for land in &mut rows[3..] {
            land.bedrooms = Some(0);
            land.floor = Some(0);
        }
        rows
    }

    #[test]
    fn test_cities_and_neighborhoods() {
        let catalog = ListingCatalog::from_records(&records());
        assert_eq!(catalog.cities, vec!["Casablanca", "Rabat"]);
        assert_eq!(
            catalog.neighborhoods("RABAT").unwrap(),
            &["Agdal", "Hassan", "Souissi"]
        );
        assert!(catalog.neighborhoods("Fes").is_none());
    }

    #[test]
    fn test_type_properties() {
        let catalog = ListingCatalog::from_records(&records());
        assert_eq!(catalog.property_types, vec!["appartement", "terrain"]);
        assert_eq!(catalog.amenities_by_type["appartement"], vec!["ascenseur"]);
        assert!(catalog.amenities_by_type["terrain"].is_empty());
        assert_eq!(catalog.types_without_bedrooms, vec!["terrain"]);
        assert_eq!(catalog.types_with_floors, vec!["appartement"]);
    }

    #[test]
    fn test_js_export() {
        let catalog = ListingCatalog::from_records(&records());
        let js = catalog.to_js().unwrap();
        assert!(js.starts_with("const DATA = {"));
        assert!(js.ends_with("};"));
        assert!(js.contains("\"quartiers_par_ville\""));

        let parsed: ListingCatalog =
            serde_json::from_str(js.trim_start_matches("const DATA = ").trim_end_matches(';'))
                .unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn test_save_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ListingCatalog::from_records(&records());

        let js = dir.path().join("data.js");
        catalog.save(&js).unwrap();
        assert!(std::fs::read_to_string(&js).unwrap().starts_with("const DATA"));

        let json = dir.path().join("data.json");
        catalog.save(&json).unwrap();
        assert!(std::fs::read_to_string(&json).unwrap().starts_with('{'));
    }
}

//! OpenStreetMap lookups: Nominatim for geocoding, Overpass for nearby search

use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;

use super::{dedup_and_sort, Coordinates, Place, PlaceCategory, SEARCH_RADIUS_METERS};
use crate::core::http;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

/// A resolved free-text address
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedLocation {
    pub coordinates: Coordinates,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NominatimResult {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

impl NominatimResult {
    fn into_location(self) -> Option<GeocodedLocation> {
        let coordinates = Coordinates::new(self.lat.parse().ok()?, self.lon.parse().ok()?)?;
        Some(GeocodedLocation {
            coordinates,
            label: self.display_name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct Center {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

impl OverpassResponse {
    /// Places with their distance from `origin`; elements without a
    /// position are skipped
    pub(crate) fn into_places(self, origin: Coordinates) -> Vec<Place> {
        self.elements
            .into_iter()
            .filter_map(|element| {
                let (lat, lon) = match (element.lat, element.lon, element.center) {
                    (Some(lat), Some(lon), _) => (lat, lon),
                    (_, _, Some(center)) => (center.lat, center.lon),
                    _ => return None,
                };
                let position = Coordinates::new(lat, lon)?;
                let tags = element.tags;

                let name = tags
                    .get("name")
                    .filter(|n| !n.trim().is_empty())
                    .cloned()
                    .unwrap_or_else(|| "Unnamed".to_string());
                let street = tags.get("addr:street").map(String::as_str).unwrap_or("");
                let house = tags.get("addr:housenumber").map(String::as_str).unwrap_or("");
                let address = match (street.is_empty(), house.is_empty()) {
                    (false, false) => format!("{street}, {house}"),
                    (false, true) => street.to_string(),
                    _ => "Address not specified".to_string(),
                };

                Some(Place {
                    name,
                    address,
                    coordinates: position,
                    distance_km: origin.distance_km(&position),
                })
            })
            .collect()
    }
}

/// Overpass QL for every filter of a category around a point
pub fn build_overpass_query(category: PlaceCategory, origin: Coordinates) -> String {
    let mut query = String::from("[out:json][timeout:25];\n(\n");
    for filter in category.filters() {
        for kind in ["node", "way"] {
            query.push_str(&format!(
                "  {kind}[{filter}](around:{SEARCH_RADIUS_METERS},{},{});\n",
                origin.latitude, origin.longitude
            ));
        }
    }
    query.push_str(");\nout center;");
    query
}

pub struct PlacesClient {
    http: reqwest::Client,
    nominatim_url: String,
    overpass_url: String,
}

impl PlacesClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            nominatim_url: NOMINATIM_URL.to_string(),
            overpass_url: OVERPASS_URL.to_string(),
        })
    }

    pub fn with_urls(mut self, nominatim_url: impl Into<String>, overpass_url: impl Into<String>) -> Self {
        self.nominatim_url = nominatim_url.into();
        self.overpass_url = overpass_url.into();
        self
    }

    /// Resolve a free-text address; `None` when nothing matches
    pub async fn geocode(&self, query: &str) -> Result<Option<GeocodedLocation>> {
        debug!("Geocoding '{query}'");
        let request = self
            .http
            .get(&self.nominatim_url)
            .query(&[("q", query), ("format", "json"), ("limit", "1")]);
        let results: Vec<NominatimResult> = http::get_json(request).await?;
        Ok(results.into_iter().find_map(NominatimResult::into_location))
    }

    /// Places of a category within the search radius, nearest first
    pub async fn search(&self, origin: Coordinates, category: PlaceCategory) -> Result<Vec<Place>> {
        let query = build_overpass_query(category, origin);
        let request = self.http.post(&self.overpass_url).form(&[("data", query)]);
        let response: OverpassResponse = http::get_json(request).await?;

        let places = dedup_and_sort(response.into_places(origin));
        info!(
            "Found {} {} near {:.4},{:.4}",
            places.len(),
            category.key(),
            origin.latitude,
            origin.longitude
        );
        Ok(places)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const OVERPASS: &str = r#"{
        "version": 0.6,
        "elements": [
            {"type": "node", "id": 1, "lat": 48.7860, "lon": 44.7520,
             "tags": {"amenity": "pharmacy", "name": "Apteka 1", "addr:street": "Lenina", "addr:housenumber": "10"}},
            {"type": "way", "id": 2, "center": {"lat": 48.7800, "lon": 44.7700},
             "tags": {"amenity": "pharmacy", "name": "Apteka 2", "addr:street": "Mira"}},
            {"type": "node", "id": 3, "lat": 48.7861, "lon": 44.7521,
             "tags": {"amenity": "pharmacy", "name": "Apteka 1", "addr:street": "Lenina", "addr:housenumber": "10"}},
            {"type": "node", "id": 4, "lat": 48.7900, "lon": 44.7600, "tags": {"amenity": "pharmacy"}},
            {"type": "relation", "id": 5, "tags": {"name": "No position"}}
        ]
    }"#;

    pub const NOMINATIM: &str = r#"[
        {"place_id": 1, "lat": "48.7858", "lon": "44.7797",
         "display_name": "Lenina Avenue, Volzhskiy, Volgograd Oblast, Russia"}
    ]"#;
}

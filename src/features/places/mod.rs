//! # Places Feature
//!
//! Nearby pharmacies, vet clinics and grocery shops from OpenStreetMap.
//!
//! - **Version**: 1.1.1
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.1: Place names and addresses are markdown-escaped
//! - 1.1.0: Results cached per user for paging, raw `lat, lon` input
//! - 1.0.0: Initial release

pub mod client;

pub use client::{GeocodedLocation, PlacesClient};

use regex::Regex;
use std::collections::HashMap;

use crate::core::keyboard::{nav_row, paginate, Button, Keyboard, Screen, Style};
use crate::core::response::escape_markdown;

pub const SEARCH_RADIUS_METERS: u32 = 2000;
pub const PLACES_PER_PAGE: usize = 10;

const EARTH_RADIUS_KM: f64 = 6371.0088;
const COORDINATES_PATTERN: &str = r"^\s*(-?\d{1,3}(?:\.\d+)?)\s*[,;\s]\s*(-?\d{1,3}(?:\.\d+)?)\s*$";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// `None` when either value is outside the valid range
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance (haversine)
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceCategory {
    Pharmacies,
    Vet,
    Groceries,
}

impl PlaceCategory {
    pub const ALL: [PlaceCategory; 3] = [
        PlaceCategory::Pharmacies,
        PlaceCategory::Vet,
        PlaceCategory::Groceries,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            PlaceCategory::Pharmacies => "pharmacies",
            PlaceCategory::Vet => "vet",
            PlaceCategory::Groceries => "groceries",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaceCategory::Pharmacies => "Pharmacies",
            PlaceCategory::Vet => "Vet clinics & pet shops",
            PlaceCategory::Groceries => "Groceries",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            PlaceCategory::Pharmacies => "💊",
            PlaceCategory::Vet => "🏥",
            PlaceCategory::Groceries => "🛒",
        }
    }

    /// OpenStreetMap tag filters searched for this category
    pub fn filters(&self) -> &'static [&'static str] {
        match self {
            PlaceCategory::Pharmacies => &["amenity=pharmacy"],
            PlaceCategory::Vet => &["amenity=veterinary", "shop=pet"],
            PlaceCategory::Groceries => &[
                "shop=supermarket",
                "shop=convenience",
                "shop=bakery",
                "shop=butcher",
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub distance_km: f64,
}

/// Last search of a user, kept for paging
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceSearch {
    pub category: PlaceCategory,
    pub origin: Coordinates,
    pub places: Vec<Place>,
}

/// Keep the nearest entry per name and address, nearest first
pub fn dedup_and_sort(places: Vec<Place>) -> Vec<Place> {
    let mut unique: HashMap<(String, String), Place> = HashMap::new();
    for place in places {
        let key = (place.name.clone(), place.address.clone());
        match unique.get(&key) {
            Some(existing) if existing.distance_km <= place.distance_km => {}
            _ => {
                unique.insert(key, place);
            }
        }
    }

    let mut sorted: Vec<Place> = unique.into_values().collect();
    sorted.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.name.cmp(&b.name))
    });
    sorted
}

/// Parse `lat, lon` (comma, semicolon or space separated)
pub fn parse_coordinates(input: &str) -> Option<Coordinates> {
    let pattern = Regex::new(COORDINATES_PATTERN).ok()?;
    let captures = pattern.captures(input)?;
    let latitude: f64 = captures[1].parse().ok()?;
    let longitude: f64 = captures[2].parse().ok()?;
    Coordinates::new(latitude, longitude)
}

pub fn format_distance(km: f64) -> String {
    if km < 1.0 {
        format!("{:.0} m", km * 1000.0)
    } else {
        format!("{km:.2} km")
    }
}

pub fn map_url(coordinates: &Coordinates) -> String {
    let (lat, lon) = (coordinates.latitude, coordinates.longitude);
    format!("https://osmand.net/map?pin={lat},{lon}#17/{lat}/{lon}")
}

pub fn format_place(place: &Place, number: usize) -> String {
    format!(
        "{number}. **{}**\n   📍 {} ({}) · [map](<{}>)",
        escape_markdown(&place.name),
        escape_markdown(&place.address),
        format_distance(place.distance_km),
        map_url(&place.coordinates)
    )
}

fn category_keyboard() -> Keyboard {
    let mut buttons: Vec<Button> = PlaceCategory::ALL
        .iter()
        .map(|c| Button::new(format!("{} {}", c.emoji(), short_label(*c)), format!("places:search:{}", c.key())))
        .collect();
    buttons.push(Button::new("📍 Change location", "places:location"));
    buttons.push(Button::new("◀️ Back", "menu:main"));
    Keyboard::adjusted(buttons, &[3, 2])
}

fn short_label(category: PlaceCategory) -> &'static str {
    match category {
        PlaceCategory::Pharmacies => "Pharmacies",
        PlaceCategory::Vet => "Vet",
        PlaceCategory::Groceries => "Groceries",
    }
}

/// Entry screen when no location is known yet
pub fn location_prompt_screen() -> Screen {
    Screen::new(
        "📍 **Places nearby**\n\n\
         Find the nearest pharmacies, vet clinics and grocery shops.\n\n\
         Start by setting a location: an address or coordinates like `48.78, 44.77`.",
        Keyboard::new().row(vec![
            Button::new("📍 Set location", "places:location").style(Style::Primary),
            Button::new("◀️ Back", "menu:main"),
        ]),
    )
}

/// Category choice for a known location
pub fn category_screen(location_label: Option<&str>) -> Screen {
    let header = match location_label {
        Some(label) => format!("📍 **Location:** {label}\n\n"),
        None => "📍 **Choose a place type**\n\n".to_string(),
    };
    Screen::new(format!("{header}What would you like to find nearby?"), category_keyboard())
}

/// One page of search results
pub fn results_screen(search: &PlaceSearch, page: usize) -> Screen {
    if search.places.is_empty() {
        let mut screen = category_screen(None);
        screen.text = format!(
            "❌ No {} found within {} km.\n\nTry another place type or location.",
            search.category.label().to_lowercase(),
            SEARCH_RADIUS_METERS / 1000
        );
        return screen;
    }

    let page = paginate(&search.places, page, PLACES_PER_PAGE);
    let mut text = format!(
        "{} **{}** (page {}/{})\n*Found: {}*\n\n",
        search.category.emoji(),
        search.category.label(),
        page.index + 1,
        page.total_pages,
        search.places.len()
    );
    for (i, place) in page.items.iter().enumerate() {
        text.push_str(&format_place(place, page.offset + i + 1));
        text.push_str("\n\n");
    }

    let keyboard = Keyboard::new()
        .row(nav_row(&page, |p| format!("places:page:{p}"), "places:noop"))
        .row(vec![
            Button::new("🔄 Other type", "places:types"),
            Button::new("◀️ Menu", "menu:main"),
        ]);

    Screen::new(text.trim_end(), keyboard)
}

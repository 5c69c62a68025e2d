// Static catalog: destinations, hotels, guides, vendors and itineraries
// Loaded once at startup and never mutated afterwards

use crate::query::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info};

// Built-in data set shipped with the crate
pub const BUILTIN_CATALOG_JSON: &str = include_str!("../samples/catalog.json");

const RELATED_HOTELS_LIMIT: usize = 3;
const RELATED_GUIDES_LIMIT: usize = 2;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Catalog parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: CatalogKind, id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub description: String,
    pub short_description: String,
    pub location: String,
    pub rating: f32,
    pub review_count: u32,
    pub image: String,
    pub price: u32,
    pub features: Vec<String>,
    pub highlights: Vec<String>,
    pub best_time: String,
    pub duration: String,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub rating: f32,
    pub review_count: u32,
    pub image: String,
    pub price_per_night: u32,
    pub amenities: Vec<String>,
    pub room_types: Vec<String>,
    // Name of the destination this hotel serves
    pub destination: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guide {
    pub id: String,
    pub name: String,
    pub description: String,
    pub location: String,
    pub rating: f32,
    pub review_count: u32,
    pub image: String,
    pub price_per_day: u32,
    pub languages: Vec<String>,
    pub specialties: Vec<String>,
    // Years
    pub experience: u32,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorCategory {
    Homestay,
    Artisan,
    Experience,
}

impl VendorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            VendorCategory::Homestay => "Homestays",
            VendorCategory::Artisan => "Artisans",
            VendorCategory::Experience => "Experiences",
        }
    }
}

impl FromStr for VendorCategory {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homestay" => Ok(VendorCategory::Homestay),
            "artisan" => Ok(VendorCategory::Artisan),
            "experience" => Ok(VendorCategory::Experience),
            other => Err(QueryError::UnknownVendorCategory(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub category: VendorCategory,
    pub description: String,
    pub location: String,
    pub rating: f32,
    pub review_count: u32,
    pub image: String,
    pub price: u32,
    pub features: Vec<String>,
    pub owner: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
}

impl FromStr for Difficulty {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Easy" | "easy" => Ok(Difficulty::Easy),
            "Moderate" | "moderate" => Ok(Difficulty::Moderate),
            "Challenging" | "challenging" => Ok(Difficulty::Challenging),
            other => Err(QueryError::UnknownDifficulty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Itinerary {
    pub id: String,
    pub title: String,
    pub description: String,
    // Free text such as "5 Days / 4 Nights"
    pub duration: String,
    pub price: u32,
    pub rating: f32,
    pub review_count: u32,
    pub image: String,
    pub highlights: Vec<String>,
    pub destinations: Vec<String>,
    pub difficulty: Difficulty,
}

impl Itinerary {
    // Leading integer of the duration text; zero when it has none
    pub fn duration_days(&self) -> u32 {
        self.duration
            .split_whitespace()
            .next()
            .and_then(|days| days.parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub user: String,
    pub rating: u8,
    pub comment: String,
    pub date: chrono::NaiveDate,
    // Where the reviewer is from
    pub location: String,
    // Destination name the review is about
    pub destination: String,
}

// The four browsable collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKind {
    Destination,
    Hotel,
    Guide,
    Vendor,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 4] = [
        CatalogKind::Destination,
        CatalogKind::Hotel,
        CatalogKind::Guide,
        CatalogKind::Vendor,
    ];

    // Singular form used by detail and booking paths
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Destination => "destination",
            CatalogKind::Hotel => "hotel",
            CatalogKind::Guide => "guide",
            CatalogKind::Vendor => "vendor",
        }
    }

    // Plural form used by the search page `type` parameter
    pub fn plural(&self) -> &'static str {
        match self {
            CatalogKind::Destination => "destinations",
            CatalogKind::Hotel => "hotels",
            CatalogKind::Guide => "guides",
            CatalogKind::Vendor => "vendors",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogKind {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "destination" | "destinations" => Ok(CatalogKind::Destination),
            "hotel" | "hotels" => Ok(CatalogKind::Hotel),
            "guide" | "guides" => Ok(CatalogKind::Guide),
            "vendor" | "vendors" => Ok(CatalogKind::Vendor),
            other => Err(QueryError::UnknownCatalogKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceUnit {
    Flat,
    PerNight,
    PerDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price {
    pub amount: u32,
    pub unit: PriceUnit,
}

impl Price {
    pub fn label(&self) -> String {
        match self.unit {
            PriceUnit::Flat => format!("₹{}", self.amount),
            PriceUnit::PerNight => format!("₹{}/night", self.amount),
            PriceUnit::PerDay => format!("₹{}/day", self.amount),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CatalogItem {
    Destination(Destination),
    Hotel(Hotel),
    Guide(Guide),
    Vendor(Vendor),
}

// The one place that knows which price field each variant carries
pub fn price_of(item: &CatalogItem) -> Price {
    match item {
        CatalogItem::Destination(d) => Price {
            amount: d.price,
            unit: PriceUnit::Flat,
        },
        CatalogItem::Hotel(h) => Price {
            amount: h.price_per_night,
            unit: PriceUnit::PerNight,
        },
        CatalogItem::Guide(g) => Price {
            amount: g.price_per_day,
            unit: PriceUnit::PerDay,
        },
        CatalogItem::Vendor(v) => Price {
            amount: v.price,
            unit: PriceUnit::Flat,
        },
    }
}

impl CatalogItem {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogItem::Destination(_) => CatalogKind::Destination,
            CatalogItem::Hotel(_) => CatalogKind::Hotel,
            CatalogItem::Guide(_) => CatalogKind::Guide,
            CatalogItem::Vendor(_) => CatalogKind::Vendor,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            CatalogItem::Destination(d) => &d.id,
            CatalogItem::Hotel(h) => &h.id,
            CatalogItem::Guide(g) => &g.id,
            CatalogItem::Vendor(v) => &v.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogItem::Destination(d) => &d.name,
            CatalogItem::Hotel(h) => &h.name,
            CatalogItem::Guide(g) => &g.name,
            CatalogItem::Vendor(v) => &v.name,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            CatalogItem::Destination(d) => &d.location,
            CatalogItem::Hotel(h) => &h.location,
            CatalogItem::Guide(g) => &g.location,
            CatalogItem::Vendor(v) => &v.location,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            CatalogItem::Destination(d) => &d.description,
            CatalogItem::Hotel(h) => &h.description,
            CatalogItem::Guide(g) => &g.description,
            CatalogItem::Vendor(v) => &v.description,
        }
    }

    pub fn rating(&self) -> f32 {
        match self {
            CatalogItem::Destination(d) => d.rating,
            CatalogItem::Hotel(h) => h.rating,
            CatalogItem::Guide(g) => g.rating,
            CatalogItem::Vendor(v) => v.rating,
        }
    }

    pub fn review_count(&self) -> u32 {
        match self {
            CatalogItem::Destination(d) => d.review_count,
            CatalogItem::Hotel(h) => h.review_count,
            CatalogItem::Guide(g) => g.review_count,
            CatalogItem::Vendor(v) => v.review_count,
        }
    }

    pub fn image(&self) -> &str {
        match self {
            CatalogItem::Destination(d) => &d.image,
            CatalogItem::Hotel(h) => &h.image,
            CatalogItem::Guide(g) => &g.image,
            CatalogItem::Vendor(v) => &v.image,
        }
    }

    pub fn price(&self) -> Price {
        price_of(self)
    }

    // Path of the item's detail page
    pub fn detail_path(&self) -> String {
        format!("/{}/{}", self.kind(), self.id())
    }
}

// Raw layout of the catalog JSON document
#[derive(Debug, Deserialize)]
struct CatalogSeed {
    #[serde(default)]
    destinations: Vec<Destination>,
    #[serde(default)]
    hotels: Vec<Hotel>,
    #[serde(default)]
    guides: Vec<Guide>,
    #[serde(default)]
    vendors: Vec<Vendor>,
    #[serde(default)]
    itineraries: Vec<Itinerary>,
    #[serde(default)]
    reviews: Vec<Review>,
}

// What the destination detail page shows next to the destination itself
#[derive(Debug)]
pub struct DestinationRelations<'a> {
    pub destination: &'a Destination,
    pub hotels: Vec<&'a Hotel>,
    pub guides: Vec<&'a Guide>,
    pub reviews: Vec<&'a Review>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    destinations: Vec<CatalogItem>,
    hotels: Vec<CatalogItem>,
    guides: Vec<CatalogItem>,
    vendors: Vec<CatalogItem>,
    itineraries: Vec<Itinerary>,
    reviews: Vec<Review>,
}

impl Catalog {
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG_JSON)
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let seed: CatalogSeed = serde_json::from_str(json)?;

        let catalog = Catalog {
            destinations: seed
                .destinations
                .into_iter()
                .map(CatalogItem::Destination)
                .collect(),
            hotels: seed.hotels.into_iter().map(CatalogItem::Hotel).collect(),
            guides: seed.guides.into_iter().map(CatalogItem::Guide).collect(),
            vendors: seed.vendors.into_iter().map(CatalogItem::Vendor).collect(),
            itineraries: seed.itineraries,
            reviews: seed.reviews,
        };
        catalog.check_unique_ids()?;

        info!(
            destinations = catalog.destinations.len(),
            hotels = catalog.hotels.len(),
            guides = catalog.guides.len(),
            vendors = catalog.vendors.len(),
            itineraries = catalog.itineraries.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    // Build a catalog from already-typed items, e.g. for tests and benchmarks
    pub fn from_items(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut catalog = Catalog::default();
        for item in items {
            match item.kind() {
                CatalogKind::Destination => catalog.destinations.push(item),
                CatalogKind::Hotel => catalog.hotels.push(item),
                CatalogKind::Guide => catalog.guides.push(item),
                CatalogKind::Vendor => catalog.vendors.push(item),
            }
        }
        catalog.check_unique_ids()?;
        Ok(catalog)
    }

    fn check_unique_ids(&self) -> Result<(), CatalogError> {
        for kind in CatalogKind::ALL {
            let mut seen = HashSet::new();
            for item in self.items(kind) {
                if !seen.insert(item.id()) {
                    return Err(CatalogError::DuplicateId {
                        kind,
                        id: item.id().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn items(&self, kind: CatalogKind) -> &[CatalogItem] {
        match kind {
            CatalogKind::Destination => &self.destinations,
            CatalogKind::Hotel => &self.hotels,
            CatalogKind::Guide => &self.guides,
            CatalogKind::Vendor => &self.vendors,
        }
    }

    pub fn find(&self, kind: CatalogKind, id: &str) -> Option<&CatalogItem> {
        let found = self.items(kind).iter().find(|item| item.id() == id);
        if found.is_none() {
            debug!("No {} with id '{}'", kind, id);
        }
        found
    }

    pub fn itineraries(&self) -> &[Itinerary] {
        &self.itineraries
    }

    pub fn find_itinerary(&self, id: &str) -> Option<&Itinerary> {
        self.itineraries.iter().find(|itinerary| itinerary.id == id)
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    // Distinct locations in first-seen catalog order
    pub fn unique_locations(&self, kind: CatalogKind) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.items(kind)
            .iter()
            .map(CatalogItem::location)
            .filter(|location| seen.insert(*location))
            .collect()
    }

    pub fn destination_relations(&self, id: &str) -> Option<DestinationRelations<'_>> {
        let destination = match self.find(CatalogKind::Destination, id)? {
            CatalogItem::Destination(d) => d,
            _ => return None,
        };

        let hotels = self
            .hotels
            .iter()
            .filter_map(|item| match item {
                CatalogItem::Hotel(h) if h.destination == destination.name => Some(h),
                _ => None,
            })
            .take(RELATED_HOTELS_LIMIT)
            .collect();

        let guides = self
            .guides
            .iter()
            .filter_map(|item| match item {
                CatalogItem::Guide(g) if g.location.contains(&destination.location) => Some(g),
                _ => None,
            })
            .take(RELATED_GUIDES_LIMIT)
            .collect();

        let reviews = self
            .reviews
            .iter()
            .filter(|review| review.destination == destination.name)
            .collect();

        Some(DestinationRelations {
            destination,
            hotels,
            guides,
            reviews,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use test_case::test_case;

    pub(crate) fn hotel(id: &str, location: &str, rating: f32, price_per_night: u32) -> CatalogItem {
        CatalogItem::Hotel(Hotel {
            id: id.to_string(),
            name: format!("Hotel {}", id),
            description: "Test hotel".to_string(),
            location: location.to_string(),
            rating,
            review_count: 10,
            image: "/assets/test.jpg".to_string(),
            price_per_night,
            amenities: vec![],
            room_types: vec![],
            destination: "Nowhere".to_string(),
            coordinates: Coordinates { lat: 0.0, lng: 0.0 },
        })
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.items(CatalogKind::Destination).len(), 6);
        assert_eq!(catalog.items(CatalogKind::Hotel).len(), 4);
        assert_eq!(catalog.items(CatalogKind::Guide).len(), 4);
        assert_eq!(catalog.items(CatalogKind::Vendor).len(), 4);
        assert_eq!(catalog.itineraries().len(), 4);
        assert_eq!(catalog.reviews().len(), 3);
    }

    #[test_case(CatalogKind::Destination, "1", 500, PriceUnit::Flat; "destination flat price")]
    #[test_case(CatalogKind::Hotel, "2", 1200, PriceUnit::PerNight; "hotel per night")]
    #[test_case(CatalogKind::Guide, "1", 2000, PriceUnit::PerDay; "guide per day")]
    #[test_case(CatalogKind::Vendor, "4", 2500, PriceUnit::Flat; "vendor flat price")]
    fn test_price_of_normalizes_per_variant(kind: CatalogKind, id: &str, amount: u32, unit: PriceUnit) {
        let catalog = Catalog::builtin().unwrap();
        let item = catalog.find(kind, id).unwrap();
        assert_eq!(price_of(item), Price { amount, unit });
    }

    #[test]
    fn test_price_labels() {
        let catalog = Catalog::builtin().unwrap();
        let hotel = catalog.find(CatalogKind::Hotel, "1").unwrap();
        assert_eq!(hotel.price().label(), "₹3500/night");
        let guide = catalog.find(CatalogKind::Guide, "3").unwrap();
        assert_eq!(guide.price().label(), "₹1800/day");
        let destination = catalog.find(CatalogKind::Destination, "2").unwrap();
        assert_eq!(destination.price().label(), "₹800");
    }

    #[test_case("hotel", CatalogKind::Hotel)]
    #[test_case("hotels", CatalogKind::Hotel)]
    #[test_case("guides", CatalogKind::Guide)]
    #[test_case("destination", CatalogKind::Destination)]
    #[test_case("vendors", CatalogKind::Vendor)]
    fn test_kind_parses_singular_and_plural(raw: &str, expected: CatalogKind) {
        assert_eq!(raw.parse::<CatalogKind>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_kind_is_an_error() {
        let result = "castle".parse::<CatalogKind>();
        assert!(matches!(result, Err(QueryError::UnknownCatalogKind(k)) if k == "castle"));
    }

    #[test]
    fn test_ids_are_scoped_per_collection() {
        let catalog = Catalog::builtin().unwrap();
        // Every collection has an id "1"; each lookup stays within its own kind
        assert_eq!(catalog.find(CatalogKind::Hotel, "1").unwrap().name(), "Forest View Resort");
        assert_eq!(catalog.find(CatalogKind::Guide, "1").unwrap().name(), "Rajesh Kumar");
        assert!(catalog.find(CatalogKind::Hotel, "does-not-exist").is_none());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::from_items(vec![
            hotel("1", "Ranchi", 4.0, 1000),
            hotel("1", "Khunti", 4.5, 2000),
        ]);
        assert!(matches!(
            result,
            Err(CatalogError::DuplicateId { kind: CatalogKind::Hotel, .. })
        ));
    }

    #[test]
    fn test_unique_locations_keep_first_seen_order() {
        let catalog = Catalog::builtin().unwrap();
        let locations = catalog.unique_locations(CatalogKind::Destination);
        assert_eq!(locations, vec!["Ranchi", "Latehar", "Various", "Palamu"]);
    }

    #[test]
    fn test_destination_relations() {
        let catalog = Catalog::builtin().unwrap();

        let relations = catalog.destination_relations("1").unwrap();
        assert_eq!(relations.destination.name, "Hundru Falls");
        let hotel_names: Vec<_> = relations.hotels.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(hotel_names, vec!["Waterfall Inn"]);
        let guide_names: Vec<_> = relations.guides.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(guide_names, vec!["Amit Singh"]);
        assert_eq!(relations.reviews.len(), 1);
        assert_eq!(relations.reviews[0].user, "Rohit Verma");

        assert!(catalog.destination_relations("99").is_none());
    }

    #[test]
    fn test_find_itinerary() {
        let catalog = Catalog::builtin().unwrap();
        let itinerary = catalog.find_itinerary("2").unwrap();
        assert_eq!(itinerary.title, "Waterfall Adventure");
        assert!(catalog.find_itinerary("does-not-exist").is_none());
    }

    #[test]
    fn test_itinerary_duration_days() {
        let catalog = Catalog::builtin().unwrap();
        let days: Vec<u32> = catalog
            .itineraries()
            .iter()
            .map(Itinerary::duration_days)
            .collect();
        assert_eq!(days, vec![5, 4, 6, 3]);
    }

    #[test]
    fn test_detail_path() {
        let catalog = Catalog::builtin().unwrap();
        let vendor = catalog.find(CatalogKind::Vendor, "2").unwrap();
        assert_eq!(vendor.detail_path(), "/vendor/2");
        match vendor {
            CatalogItem::Vendor(v) => assert_eq!(v.category, VendorCategory::Homestay),
            other => panic!("expected vendor, got {:?}", other.kind()),
        }
    }
}

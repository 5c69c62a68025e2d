// Catalog query engine: free text, location, price and category filters plus stable sorting
// Queries never mutate the catalog; results borrow from it

use crate::catalog::{price_of, Catalog, CatalogItem, CatalogKind, Difficulty, Itinerary, VendorCategory};
use crate::config::SearchConfig;
use std::cmp::Ordering;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Unknown sort key: {0}")]
    UnknownSortKey(String),

    #[error("Unknown catalog type: {0}")]
    UnknownCatalogKind(String),

    #[error("Unknown vendor category: {0}")]
    UnknownVendorCategory(String),

    #[error("Unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("Unknown duration filter: {0}")]
    UnknownDurationFilter(String),
}

// Inclusive price bounds; min never exceeds max
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRange {
    min: u32,
    max: u32,
}

impl PriceRange {
    // An inverted range is clamped so that min == max rather than matching nothing
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            min: 0,
            max: u32::MAX,
        }
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn contains(&self, amount: u32) -> bool {
        self.min <= amount && amount <= self.max
    }
}

impl From<&SearchConfig> for PriceRange {
    fn from(config: &SearchConfig) -> Self {
        PriceRange::new(config.default_price_min, config.default_price_max)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LocationFilter {
    #[default]
    All,
    Only(String),
}

impl LocationFilter {
    pub fn parse(raw: &str) -> Self {
        if raw == "all" {
            LocationFilter::All
        } else {
            LocationFilter::Only(raw.to_string())
        }
    }

    fn accepts(&self, location: &str) -> bool {
        match self {
            LocationFilter::All => true,
            LocationFilter::Only(wanted) => wanted == location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    RatingDesc,
    PriceAsc,
    PriceDesc,
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rating" | "rating-desc" => Ok(SortKey::RatingDesc),
            "price_low" | "price-asc" => Ok(SortKey::PriceAsc),
            "price_high" | "price-desc" => Ok(SortKey::PriceDesc),
            other => Err(QueryError::UnknownSortKey(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryCriteria {
    pub term: String,
    pub location: LocationFilter,
    pub price_range: PriceRange,
    pub sort: SortKey,
    // Marketplace tab; only vendors can match a category
    pub vendor_category: Option<VendorCategory>,
}

impl Default for QueryCriteria {
    fn default() -> Self {
        Self::from_config(&SearchConfig::default())
    }
}

impl QueryCriteria {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            term: String::new(),
            location: LocationFilter::All,
            price_range: PriceRange::from(config),
            sort: SortKey::RatingDesc,
            vendor_category: None,
        }
    }

    pub fn with_term(mut self, term: impl Into<String>) -> Self {
        self.term = term.into();
        self
    }

    pub fn with_location(mut self, location: LocationFilter) -> Self {
        self.location = location;
        self
    }

    pub fn with_price_range(mut self, price_range: PriceRange) -> Self {
        self.price_range = price_range;
        self
    }

    pub fn sorted_by(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    pub fn in_category(mut self, category: VendorCategory) -> Self {
        self.vendor_category = Some(category);
        self
    }

    pub fn matches(&self, item: &CatalogItem) -> bool {
        matches_term(&self.term, item)
            && self.location.accepts(item.location())
            && self.price_range.contains(price_of(item).amount)
            && self.matches_category(item)
    }

    fn matches_category(&self, item: &CatalogItem) -> bool {
        match (self.vendor_category, item) {
            (None, _) => true,
            (Some(wanted), CatalogItem::Vendor(vendor)) => vendor.category == wanted,
            (Some(_), _) => false,
        }
    }
}

fn matches_term(term: &str, item: &CatalogItem) -> bool {
    if term.is_empty() {
        return true;
    }
    let needle = term.to_lowercase();
    [item.name(), item.location(), item.description()]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

fn compare_items(sort: SortKey, a: &CatalogItem, b: &CatalogItem) -> Ordering {
    match sort {
        SortKey::RatingDesc => b.rating().total_cmp(&a.rating()),
        SortKey::PriceAsc => price_of(a).amount.cmp(&price_of(b).amount),
        SortKey::PriceDesc => price_of(b).amount.cmp(&price_of(a).amount),
    }
}

#[derive(Debug, Clone)]
pub struct QueryOutcome<'a> {
    pub items: Vec<&'a CatalogItem>,
    // Size of the collection before filtering
    pub candidates: usize,
}

impl<'a> QueryOutcome<'a> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_zero_matches(&self) -> bool {
        self.items.is_empty()
    }

    pub fn ids(&self) -> Vec<&'a str> {
        self.items.iter().map(|&item| item.id()).collect()
    }
}

// Filter then stable-sort; ties keep catalog order
pub fn run_query<'a>(items: &'a [CatalogItem], criteria: &QueryCriteria) -> QueryOutcome<'a> {
    let mut matched: Vec<&CatalogItem> = items.iter().filter(|item| criteria.matches(item)).collect();
    matched.sort_by(|a, b| compare_items(criteria.sort, a, b));

    debug!(
        "Query '{}' kept {} of {} items",
        criteria.term,
        matched.len(),
        items.len()
    );

    QueryOutcome {
        items: matched,
        candidates: items.len(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DurationFilter {
    #[default]
    All,
    // Up to 3 days
    Short,
    // 4 to 6 days
    Medium,
    // 7 days or more
    Long,
}

impl DurationFilter {
    fn accepts(&self, days: u32) -> bool {
        match self {
            DurationFilter::All => true,
            DurationFilter::Short => days <= 3,
            DurationFilter::Medium => (4..=6).contains(&days),
            DurationFilter::Long => days >= 7,
        }
    }
}

impl FromStr for DurationFilter {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(DurationFilter::All),
            "short" => Ok(DurationFilter::Short),
            "medium" => Ok(DurationFilter::Medium),
            "long" => Ok(DurationFilter::Long),
            other => Err(QueryError::UnknownDurationFilter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ItinerarySort {
    #[default]
    RatingDesc,
    PriceAsc,
    PriceDesc,
    DurationAsc,
}

impl FromStr for ItinerarySort {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "duration" => Ok(ItinerarySort::DurationAsc),
            other => other.parse::<SortKey>().map(|key| match key {
                SortKey::RatingDesc => ItinerarySort::RatingDesc,
                SortKey::PriceAsc => ItinerarySort::PriceAsc,
                SortKey::PriceDesc => ItinerarySort::PriceDesc,
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItineraryCriteria {
    pub term: String,
    pub duration: DurationFilter,
    pub difficulty: Option<Difficulty>,
    pub sort: ItinerarySort,
}

impl ItineraryCriteria {
    pub fn matches(&self, itinerary: &Itinerary) -> bool {
        if !self.term.is_empty() {
            let needle = self.term.to_lowercase();
            let hit = itinerary.title.to_lowercase().contains(&needle)
                || itinerary.description.to_lowercase().contains(&needle)
                || itinerary
                    .destinations
                    .iter()
                    .any(|dest| dest.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }

        if !self.duration.accepts(itinerary.duration_days()) {
            return false;
        }

        self.difficulty.map_or(true, |wanted| itinerary.difficulty == wanted)
    }
}

pub fn run_itinerary_query<'a>(
    itineraries: &'a [Itinerary],
    criteria: &ItineraryCriteria,
) -> Vec<&'a Itinerary> {
    let mut matched: Vec<&Itinerary> = itineraries
        .iter()
        .filter(|itinerary| criteria.matches(itinerary))
        .collect();

    matched.sort_by(|a, b| match criteria.sort {
        ItinerarySort::RatingDesc => b.rating.total_cmp(&a.rating),
        ItinerarySort::PriceAsc => a.price.cmp(&b.price),
        ItinerarySort::PriceDesc => b.price.cmp(&a.price),
        ItinerarySort::DurationAsc => a.duration_days().cmp(&b.duration_days()),
    });
    matched
}

// Entry point the listing, search and marketplace pages go through
pub struct QueryEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> QueryEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    pub fn search(&self, kind: CatalogKind, criteria: &QueryCriteria) -> QueryOutcome<'a> {
        run_query(self.catalog.items(kind), criteria)
    }

    pub fn marketplace(&self, criteria: &QueryCriteria) -> QueryOutcome<'a> {
        self.search(CatalogKind::Vendor, criteria)
    }

    pub fn itineraries(&self, criteria: &ItineraryCriteria) -> Vec<&'a Itinerary> {
        run_itinerary_query(self.catalog.itineraries(), criteria)
    }

    pub fn locations(&self, kind: CatalogKind) -> Vec<&'a str> {
        self.catalog.unique_locations(kind)
    }
}

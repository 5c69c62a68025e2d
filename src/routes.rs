// Path and query parsing for the site's pages, and resolution of item pages against the catalog

use crate::catalog::{Catalog, CatalogItem, CatalogKind, DestinationRelations};
use crate::wizard::WizardStep;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    // `/search`, `/hotels` and `/guides` share the search page
    Search { kind: CatalogKind, query: String },
    Destinations,
    Detail { kind: CatalogKind, id: String },
    Marketplace,
    Itineraries,
    About,
    Contact,
    Book { kind: CatalogKind, id: String, step: WizardStep },
    Login,
    Register,
    Dashboard { section: Option<String> },
    NotFound { path: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryParams {
    #[serde(rename = "type")]
    kind: Option<String>,
    query: Option<String>,
    step: Option<String>,
}

impl QueryParams {
    fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(raw) if !raw.is_empty() => serde_urlencoded::from_str(raw).unwrap_or_else(|e| {
                warn!("Ignoring malformed query string {:?}: {}", raw, e);
                QueryParams::default()
            }),
            _ => QueryParams::default(),
        }
    }
}

impl Route {
    pub fn parse(url: &str) -> Self {
        let (path, raw_query) = match url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (url, None),
        };
        let params = QueryParams::parse(raw_query);

        // Segments are percent-decoded like the query string
        let decoded: Result<Vec<String>, _> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).map(|segment| segment.into_owned()))
            .collect();
        let decoded = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Undecodable path {:?}: {}", path, e);
                return Route::not_found(path);
            }
        };
        let segments: Vec<&str> = decoded.iter().map(String::as_str).collect();

        let route = match segments.as_slice() {
            [] => Route::Home,
            ["search"] => match params.kind.as_deref() {
                None => Route::Search {
                    kind: CatalogKind::Destination,
                    query: params.query.unwrap_or_default(),
                },
                Some(kind) => match kind.parse() {
                    Ok(kind) => Route::Search {
                        kind,
                        query: params.query.unwrap_or_default(),
                    },
                    Err(_) => Route::not_found(path),
                },
            },
            ["hotels"] => Route::Search {
                kind: CatalogKind::Hotel,
                query: params.query.unwrap_or_default(),
            },
            ["guides"] => Route::Search {
                kind: CatalogKind::Guide,
                query: params.query.unwrap_or_default(),
            },
            ["destinations"] => Route::Destinations,
            [kind @ ("destination" | "hotel" | "guide" | "vendor"), id] => match kind.parse() {
                Ok(kind) => Route::Detail {
                    kind,
                    id: id.to_string(),
                },
                Err(_) => Route::not_found(path),
            },
            ["marketplace"] => Route::Marketplace,
            ["itineraries"] => Route::Itineraries,
            ["about"] => Route::About,
            ["contact"] => Route::Contact,
            // Only singular kinds name a bookable item
            ["book", kind @ ("destination" | "hotel" | "guide" | "vendor"), id] => match kind.parse() {
                Ok(kind) => Route::Book {
                    kind,
                    id: id.to_string(),
                    step: WizardStep::from_param(params.step.as_deref()),
                },
                Err(_) => Route::not_found(path),
            },
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["dashboard"] => Route::Dashboard { section: None },
            ["dashboard", rest @ ..] => Route::Dashboard {
                section: Some(rest.join("/")),
            },
            _ => Route::not_found(path),
        };

        debug!("Parsed {} as {:?}", url, route);
        route
    }

    fn not_found(path: &str) -> Self {
        Route::NotFound {
            path: path.to_string(),
        }
    }
}

// Where a "back to browsing" link should land for each kind
pub fn browse_path(kind: CatalogKind) -> &'static str {
    match kind {
        CatalogKind::Destination => "/destinations",
        CatalogKind::Hotel => "/hotels",
        CatalogKind::Guide => "/guides",
        CatalogKind::Vendor => "/marketplace",
    }
}

#[derive(Debug)]
pub enum Page<'a> {
    Detail(&'a CatalogItem),
    Destination(DestinationRelations<'a>),
    Booking { item: &'a CatalogItem, step: WizardStep },
    // Pages that need nothing from the catalog to resolve
    View(Route),
    NotFound { back_link: String },
}

impl Page<'_> {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Page::NotFound { .. })
    }
}

pub fn resolve<'a>(catalog: &'a Catalog, route: &Route) -> Page<'a> {
    match route {
        Route::Detail {
            kind: CatalogKind::Destination,
            id,
        } => match catalog.destination_relations(id) {
            Some(relations) => Page::Destination(relations),
            None => missing(CatalogKind::Destination, id),
        },
        Route::Detail { kind, id } => match catalog.find(*kind, id) {
            Some(item) => Page::Detail(item),
            None => missing(*kind, id),
        },
        Route::Book { kind, id, step } => match catalog.find(*kind, id) {
            Some(item) => Page::Booking { item, step: *step },
            None => missing(*kind, id),
        },
        Route::NotFound { path } => {
            warn!("No page at {}", path);
            Page::NotFound {
                back_link: "/".to_string(),
            }
        }
        other => Page::View(other.clone()),
    }
}

fn missing<'a>(kind: CatalogKind, id: &str) -> Page<'a> {
    warn!("{} {} not found", kind, id);
    Page::NotFound {
        back_link: browse_path(kind).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("/", Route::Home ; "#1 home")]
    #[test_case("/destinations", Route::Destinations ; "#2 destinations")]
    #[test_case("/hotels", Route::Search { kind: CatalogKind::Hotel, query: String::new() } ; "#3 hotels search")]
    #[test_case("/search?type=guides&query=forest+trek", Route::Search { kind: CatalogKind::Guide, query: "forest trek".to_string() } ; "#4 search params")]
    #[test_case("/search?query=Hundru%20Falls", Route::Search { kind: CatalogKind::Destination, query: "Hundru Falls".to_string() } ; "#5 default type")]
    #[test_case("/vendor/3", Route::Detail { kind: CatalogKind::Vendor, id: "3".to_string() } ; "#6 vendor detail")]
    #[test_case("/book/hotel/2?step=2", Route::Book { kind: CatalogKind::Hotel, id: "2".to_string(), step: WizardStep::Payment } ; "#7 booking step")]
    #[test_case("/book/guide/1?step=oops", Route::Book { kind: CatalogKind::Guide, id: "1".to_string(), step: WizardStep::Details } ; "#8 malformed step")]
    #[test_case("/dashboard/favorites", Route::Dashboard { section: Some("favorites".to_string()) } ; "#9 dashboard section")]
    #[test_case("/itineraries/", Route::Itineraries ; "#10 trailing slash")]
    #[test_case("/hotel/a%20b", Route::Detail { kind: CatalogKind::Hotel, id: "a b".to_string() } ; "#11 encoded id")]
    #[test_case("/book/guide/x%2By?step=2", Route::Book { kind: CatalogKind::Guide, id: "x+y".to_string(), step: WizardStep::Payment } ; "#12 encoded booking id")]
    #[test_case("/%61bout", Route::About ; "#13 encoded page name")]
    fn test_parse(url: &str, expected: Route) {
        assert_eq!(Route::parse(url), expected);
    }

    #[test_case("/nowhere" ; "#1 unknown page")]
    #[test_case("/book/spaceship/1" ; "#2 unknown booking kind")]
    #[test_case("/book/hotels/1" ; "#3 plural booking kind")]
    #[test_case("/search?type=castles" ; "#4 unknown search type")]
    #[test_case("/hotel/1/extra" ; "#5 extra segment")]
    #[test_case("/hotel/%FF" ; "#6 invalid utf-8 segment")]
    fn test_parse_not_found(url: &str) {
        assert!(matches!(Route::parse(url), Route::NotFound { .. }));
    }

    #[test]
    fn test_missing_booking_item_is_not_found() {
        let catalog = Catalog::builtin().unwrap();
        let page = resolve(&catalog, &Route::parse("/book/hotel/does-not-exist"));

        match page {
            Page::NotFound { back_link } => assert_eq!(back_link, "/hotels"),
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_booking_and_detail() {
        let catalog = Catalog::builtin().unwrap();

        match resolve(&catalog, &Route::parse("/book/vendor/2?step=1")) {
            Page::Booking { item, step } => {
                assert_eq!(item.name(), "Village Homestay");
                assert_eq!(step, WizardStep::Details);
            }
            other => panic!("unexpected page {:?}", other),
        }

        match resolve(&catalog, &Route::parse("/guide/4")) {
            Page::Detail(item) => assert_eq!(item.name(), "Priya Sharma"),
            other => panic!("unexpected page {:?}", other),
        }

        assert!(resolve(&catalog, &Route::parse("/vendor/99")).is_not_found());
    }

    #[test]
    fn test_resolve_destination_with_relations() {
        let catalog = Catalog::builtin().unwrap();

        match resolve(&catalog, &Route::parse("/destination/2")) {
            Page::Destination(relations) => {
                assert_eq!(relations.destination.name, "Netarhat");
                assert!(relations.hotels.len() <= 3);
                assert!(relations.guides.len() <= 2);
            }
            other => panic!("unexpected page {:?}", other),
        }
    }

    #[test]
    fn test_static_pages_pass_through() {
        let catalog = Catalog::builtin().unwrap();
        assert!(matches!(
            resolve(&catalog, &Route::parse("/about")),
            Page::View(Route::About)
        ));
        match resolve(&catalog, &Route::parse("/missing/page")) {
            Page::NotFound { back_link } => assert_eq!(back_link, "/"),
            other => panic!("unexpected page {:?}", other),
        }
    }
}

// Catalog search, booking wizard and account state for the Johar Jharkhand tourism site

pub mod auth;
pub mod catalog;
pub mod config;
pub mod favorites;
pub mod query;
pub mod routes;
pub mod store;
pub mod wizard;

// Re-export key types for convenience
pub use auth::{AuthError, IdentityProvider, MockIdentityProvider, SessionContext, User};
pub use catalog::{price_of, Catalog, CatalogError, CatalogItem, CatalogKind, Price, PriceUnit};
pub use config::{AppConfig, ConfigError};
pub use favorites::{
    FavoriteKind, FavoriteRecord, FavoritesError, FavoritesStore, NewFavorite, ToggleOutcome,
};
pub use query::{
    run_query, LocationFilter, PriceRange, QueryCriteria, QueryEngine, QueryError, QueryOutcome,
    SortKey,
};
pub use routes::{resolve, Page, Route};
pub use store::{FileStore, KeyValueStore, MemoryStore, StoreError};
pub use wizard::{
    BookingConfirmation, BookingWizard, PaymentError, PaymentGateway, PriceBreakdown,
    SimulatedPaymentGateway, WizardError, WizardStep,
};

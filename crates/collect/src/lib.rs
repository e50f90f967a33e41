//! Collection side of leadbase: business lookup, iterative search and
//! website email enrichment.

pub mod collector;
pub mod email;
pub mod enrich;
pub mod error;
pub mod places;
pub mod source;

pub use collector::{CollectStats, CollectorConfig, IterativeCollector};
pub use email::{EmailFinder, SiteEmailScanner};
pub use enrich::{enrich_all, EnrichOutcome};
pub use error::{LookupError, ScanError};
pub use places::{PlacesClient, PlacesOptions};
pub use source::{Listing, LookupSource};

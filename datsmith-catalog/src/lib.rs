pub mod catalog;
pub mod error;
pub mod key;
pub mod natural;
pub mod stats;

pub use catalog::{Catalog, DedupeMode};
pub use error::CatalogError;
pub use key::{BucketScheme, IdentityScope, derive_key};
pub use natural::natural_cmp;
pub use stats::{Statistics, StatsSnapshot};

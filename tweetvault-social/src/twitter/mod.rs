//! Twitter/X status extraction.
//!
//! [`session`] and [`extractor`] are the two adapters; [`legacy`] is the
//! platform client both of them run on. The remaining modules are the pure
//! pieces they share: locator patterns, JSON traversal, card dispatch,
//! status mapping and manifest parsing.
pub mod card;
pub mod extractor;
pub mod legacy;
pub mod locator;
pub mod manifest;
pub mod mapping;
pub mod record;
pub mod session;
pub mod store;
pub mod traverse;
pub mod types;

pub use extractor::{PatchedExtractor, StockExtractor};
pub use legacy::LegacyApi;
pub use session::{SessionCredentials, TwitterSession};

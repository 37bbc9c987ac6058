//! Carrier lookups: HTTP page fetch plus status text extraction.

mod carrier;
pub mod extract;

pub use carrier::HttpTrackingFetcher;

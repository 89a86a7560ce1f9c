//! Listing extraction for SeLoger search pages: card summaries, optional
//! concurrent enrichment from detail pages, and snapshot deltas.

pub mod config;
pub mod delta;
pub mod models;
pub mod outputs;
pub mod scrapers;

//! Record storage for shopbot.
//!
//! Tenants, catalog entries and intent definitions live in one JSON document
//! (`~/.shopbot/records.json` by default). The store implements
//! [`RecordLookup`](shopbot_core::RecordLookup) for the pipeline and offers
//! a few write operations for seeding and maintenance.

pub mod file_store;

pub use file_store::{IntentLink, RecordSet, RecordStore};

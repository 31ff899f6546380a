//! Jira integration: field-schema discovery, identity resolution, JQL
//! search, and activity aggregation for prep briefings.

pub mod activity;
pub mod client;
pub mod fields;
pub mod types;

//! Data models for the synchronized knowledge base.
//!
//! This module contains the structures used to represent the dataset that is
//! pulled from the remote snapshot and persisted in the local cache:
//!
//! - `Dataset`: the whole payload (thoughts, models, tags, `lastUpdated`)
//! - `Record`: a single thought or model entry, kept as an open JSON object
//! - `DatasetStats`: record counts for status displays

pub mod dataset;

pub use dataset::{Dataset, DatasetStats, Model, Record, Thought};

//! Survey Export API Library
//!
//! This library provides the core functionality for the Survey Export API:
//! fetching campaign, survey and response data from Postgres, aggregating
//! per-question statistics, and rendering multi-slide deck documents.
//!
//! # Modules
//!
//! - `aggregate`: Pure per-question aggregators (boolean, NPS, satisfaction)
//!   and their dimension-grouped variants.
//! - `cache_validator`: Checksum validation for cached questionnaire text.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `deck`: Slide-deck document builder.
//! - `errors`: Error handling types.
//! - `export`: Export orchestrator (phases, progress, filenames).
//! - `fetcher`: `ResponseDataSource` abstraction and Postgres implementation.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `processor`: Response/demographic join into normalized records.
//! - `schema`: Survey questionnaire parsing.
//! - `slides`: Slide builders over aggregate statistics.

pub mod aggregate;
pub mod cache_validator;
pub mod config;
pub mod db;
pub mod deck;
pub mod errors;
pub mod export;
pub mod fetcher;
pub mod handlers;
pub mod models;
pub mod processor;
pub mod schema;
pub mod slides;

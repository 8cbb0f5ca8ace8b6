//! mindscreen
//!
//! Learning-difficulty risk screening: a validated question catalog, the
//! weighted scoring engine, summaries and Markdown reports, and Postgres
//! storage for screenings.

pub mod analytics;
pub mod answers;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod report;
pub mod scoring;
pub mod telemetry;

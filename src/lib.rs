//! Corporatica - image, tabular and text analysis API server.
//!
//! Uploaded images and CSV datasets are kept in an on-disk content store and
//! addressed by integer identifiers. Each API operation loads one artifact (or
//! takes raw text), runs a single transformation or analysis, and responds.

pub mod cli;
pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod services;
pub mod storage;

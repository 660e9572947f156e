//! compactd catalog core
//!
//! Record URIs, access to the replicated library, the lifecycle of catalog
//! rows and the album list view. The terminal front end lives in the binary.

pub mod datasource;
pub mod error;
pub mod item;
pub mod library;
pub mod models;
pub mod store;
pub mod view;

pub use error::{Error, Result};

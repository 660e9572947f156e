//! Terminal album browser

mod interactive;

pub use interactive::{BrowseOptions, run_browser};

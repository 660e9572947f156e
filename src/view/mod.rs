//! Catalog views

pub mod albums;
pub mod navigation;
pub mod notify;
pub mod rows;

pub use albums::{AlbumsListView, ArtistEntry, Click, LayoutMetrics, ListEntry, MouseButton};
pub use navigation::{History, LibraryRoute, Navigator};
pub use notify::{Level, Notice, Notifier, StatusLine};
pub use rows::RowCache;

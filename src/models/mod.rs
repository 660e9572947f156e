//! Library records, metadata candidates and their URIs

pub mod candidates;
pub mod records;
mod slug;
pub mod uri;

pub use candidates::{DsAlbum, DsArtist, DsRecord, DsTrack};
pub use records::{Album, Artist, File, Library, RecordKind, Track, Tracker};
pub use slug::slugify;
pub use uri::{
    AlbumParams, ArtistParams, FileParams, LibraryParams, RecordUri, TrackParams, TrackerParams,
    UriParams, album_params,
};

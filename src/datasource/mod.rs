//! External metadata for records missing from the library

pub mod images;
pub mod lastfm;
pub mod remote;

pub use images::{LAST_FM_SIZES, SizedImage, select_largest_image};
pub use lastfm::LastfmDataSource;
pub use remote::CompactdClient;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::models::{DsAlbum, DsArtist, DsRecord, RecordKind};

/// Albums an artist is known for, used to suggest what the library lacks
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn artist_top_albums(&self, artist: &str) -> Result<Vec<DsAlbum>>;
}

/// Full metadata provider
#[async_trait]
pub trait MetadataSource: CandidateSource {
    /// Search each kind and concatenate the results, kind by kind
    ///
    /// Fails with `UnsupportedSearchType` before any request when a kind is
    /// not artist, album or track.
    async fn search(&self, query: &str, kinds: &[RecordKind]) -> Result<Vec<DsRecord>>;

    async fn artist_by_id(&self, id: &str) -> Result<DsArtist>;

    /// `id` is `"<artist>/<album>"`
    async fn album_by_id(&self, id: &str) -> Result<DsAlbum>;

    async fn artist_artwork(&self, artist: &str) -> Result<Option<Bytes>>;

    async fn album_cover(&self, artist: &str, album: &str) -> Result<Option<Bytes>>;
}

/// Drop candidates that cannot be displayed
pub fn displayable(albums: Vec<DsAlbum>) -> Vec<DsAlbum> {
    albums.into_iter().filter(DsAlbum::is_displayable).collect()
}

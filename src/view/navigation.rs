//! Catalog routes and history

use crate::error::{Error, Result};
use crate::models::{AlbumParams, UriParams};

/// Route changes requested by the views
pub trait Navigator {
    fn push(&mut self, path: &str);
    fn replace(&mut self, path: &str);
}

/// In-memory navigation history
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new(initial: &str) -> Self {
        Self {
            entries: vec![initial.to_string()],
        }
    }

    pub fn current(&self) -> &str {
        self.entries.last().map(String::as_str).unwrap_or("/library")
    }

    /// Go back one entry; false when already at the first one
    pub fn back(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new("/library")
    }
}

impl Navigator for History {
    fn push(&mut self, path: &str) {
        self.entries.push(path.to_string());
    }

    fn replace(&mut self, path: &str) {
        match self.entries.last_mut() {
            Some(last) => *last = path.to_string(),
            None => self.entries.push(path.to_string()),
        }
    }
}

/// A location in the catalog: `/library/{all/}{artist}/{album}`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LibraryRoute {
    /// Include every library rather than the current one
    pub all: bool,
    pub artist: Option<String>,
    pub album: Option<String>,
}

impl LibraryRoute {
    pub fn parse(path: &str) -> Result<Self> {
        let mut segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());
        if segments.next() != Some("library") {
            return Err(Error::malformed(path, "route must start with /library"));
        }

        let mut rest: Vec<&str> = segments.collect();
        let all = rest.first() == Some(&"all");
        if all {
            rest.remove(0);
        }
        if rest.len() > 2 {
            return Err(Error::malformed(path, "too many route segments"));
        }

        Ok(Self {
            all,
            artist: rest.first().map(|s| s.to_string()),
            album: rest.get(1).map(|s| s.to_string()),
        })
    }

    /// Route of an album URI
    pub fn for_album(album_uri: &str, all: bool) -> Result<Self> {
        let params = AlbumParams::decode(album_uri)?;
        Ok(Self {
            all,
            artist: Some(params.artist),
            album: Some(params.name),
        })
    }

    pub fn format(&self) -> String {
        let mut path = String::from("/library");
        if self.all {
            path.push_str("/all");
        }
        if let Some(artist) = &self.artist {
            path.push('/');
            path.push_str(artist);
            if let Some(album) = &self.album {
                path.push('/');
                path.push_str(album);
            }
        }
        path
    }

    /// Same location with the all-libraries prefix flipped
    pub fn toggle_all(&self) -> Self {
        Self {
            all: !self.all,
            ..self.clone()
        }
    }

    /// Artist URI of the scoped artist
    pub fn artist_id(&self) -> Option<String> {
        self.artist.as_ref().map(|a| format!("library/{}", a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_format() {
        for path in [
            "/library",
            "/library/all",
            "/library/radiohead",
            "/library/all/radiohead/ok-computer",
        ] {
            assert_eq!(LibraryRoute::parse(path).unwrap().format(), path);
        }

        let route = LibraryRoute::parse("/library/all/radiohead/kid-a/").unwrap();
        assert!(route.all);
        assert_eq!(route.artist.as_deref(), Some("radiohead"));
        assert_eq!(route.album.as_deref(), Some("kid-a"));
        assert_eq!(route.artist_id().as_deref(), Some("library/radiohead"));
    }

    #[test]
    fn test_parse_rejects_foreign_paths() {
        assert!(LibraryRoute::parse("/settings").is_err());
        assert!(LibraryRoute::parse("/library/a/b/c").is_err());
    }

    #[test]
    fn test_toggle_all() {
        let route = LibraryRoute::parse("/library/muse").unwrap();
        assert_eq!(route.toggle_all().format(), "/library/all/muse");
        assert_eq!(route.toggle_all().toggle_all(), route);
    }

    #[test]
    fn test_for_album() {
        let route = LibraryRoute::for_album("library/radiohead/ok-computer", true).unwrap();
        assert_eq!(route.format(), "/library/all/radiohead/ok-computer");
        assert!(LibraryRoute::for_album("library/radiohead", false).is_err());
    }

    #[test]
    fn test_history() {
        let mut history = History::default();
        history.push("/library/muse");
        history.replace("/library/all/muse");
        assert_eq!(history.current(), "/library/all/muse");
        assert_eq!(history.len(), 2);
        assert!(history.back());
        assert!(!history.back());
        assert_eq!(history.current(), "/library");
    }
}

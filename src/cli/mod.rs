//! CLI module for compactd

use clap::{Parser, Subcommand};
use compactd::item::Layout;
use compactd::models::RecordKind;

pub mod auth;
pub mod commands;

pub use auth::AuthManager;

#[derive(Parser, Debug)]
#[command(name = "compactd", about = "Browse a compactd music library from the terminal")]
#[command(version, author)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to a compactd server and store the session
    Auth {
        /// compactd server URL
        #[arg(long, env = "COMPACTD_URL")]
        url: Option<String>,

        /// Username
        #[arg(short, long, env = "COMPACTD_USER")]
        username: Option<String>,

        /// Password
        #[arg(short, long, env = "COMPACTD_PASS")]
        password: Option<String>,

        /// Log in again even if a session is stored
        #[arg(long)]
        force: bool,
    },

    /// Browse albums interactively
    Browse {
        /// Start scoped to an artist (slug, e.g. radiohead)
        #[arg(long)]
        artist: Option<String>,

        /// Include every library
        #[arg(long)]
        all: bool,

        /// Row layout: minimal, compact, medium or large
        #[arg(long)]
        layout: Option<Layout>,
    },

    /// Encode and decode record URIs
    Uri {
        #[command(subcommand)]
        action: UriAction,
    },

    /// Search the metadata provider
    Search {
        query: String,

        /// Kinds to search, comma separated
        #[arg(long, value_delimiter = ',', default_value = "artist,album,track")]
        kind: Vec<RecordKind>,

        /// Last.fm API key
        #[arg(long, env = "LASTFM_API_KEY")]
        api_key: Option<String>,
    },

    /// Albums of an artist known to the metadata provider
    Candidates {
        /// Artist name as the provider spells it
        artist: String,

        /// Ask Last.fm directly instead of the compactd server
        #[arg(long)]
        lastfm: bool,

        /// Last.fm API key
        #[arg(long, env = "LASTFM_API_KEY")]
        api_key: Option<String>,
    },

    /// Album and track counts of an artist
    Counters {
        /// Artist URI, e.g. library/radiohead
        artist: String,
    },

    /// Download the largest square artwork of an artist or album
    Artwork {
        artist: String,

        /// Album name; artist artwork when omitted
        #[arg(long)]
        album: Option<String>,

        /// Output file
        #[arg(short, long)]
        output: std::path::PathBuf,

        /// Shrink to fit this many pixels and re-encode as JPEG
        #[arg(long)]
        max_size: Option<u32>,

        /// Last.fm API key
        #[arg(long, env = "LASTFM_API_KEY")]
        api_key: Option<String>,
    },

    /// Generate shell completions
    Completion {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum UriAction {
    /// Show the kind and parameters of a URI
    Decode { uri: String },

    /// Derive the URI of a record given as JSON
    Encode {
        /// artist, album, track, file, tracker or library
        kind: RecordKind,

        /// Record document, e.g. '{"name": "Kid A", "artist": "library/radiohead"}'
        record: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_search_kinds() {
        let cli = Cli::parse_from(["compactd", "search", "kid a", "--kind", "album,track"]);
        match cli.command {
            Commands::Search { kind, .. } => {
                assert_eq!(kind, vec![RecordKind::Album, RecordKind::Track])
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_browse_layout() {
        let cli = Cli::parse_from(["compactd", "browse", "--artist", "muse", "--layout", "large"]);
        match cli.command {
            Commands::Browse { artist, layout, all } => {
                assert_eq!(artist.as_deref(), Some("muse"));
                assert_eq!(layout, Some(Layout::Large));
                assert!(!all);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

//! CLI command handlers

use anyhow::{Context, Result};
use clap_complete::generate;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use super::AuthManager;
use crate::browse::{self, BrowseOptions};
use crate::config::AppConfig;
use compactd::datasource::{CandidateSource, LastfmDataSource, MetadataSource, displayable};
use compactd::item::{ItemContext, Layout};
use compactd::library::{BlobRegistry, LibraryProvider};
use compactd::models::{DsRecord, RecordKind, RecordUri};
use compactd::store::CouchStore;
use compactd::view::LibraryRoute;

/// Collections followed while browsing
const WATCHED_COLLECTIONS: [&str; 3] = ["artists", "albums", "tracks"];

fn spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

fn lastfm(api_key: Option<String>, config: &AppConfig) -> Result<LastfmDataSource> {
    let api_key = api_key
        .or_else(|| config.lastfm_api_key.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No Last.fm API key. Pass --api-key or set LASTFM_API_KEY.")
        })?;
    LastfmDataSource::new(&api_key).context("Failed to create Last.fm client")
}

/// Handle the `auth` command
pub async fn auth(
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    force: bool,
) -> Result<()> {
    println!("{}", "Logging in to compactd...".cyan());

    let mut config = AppConfig::load()?;
    let url = url.or_else(|| config.server_url.clone());
    let session = AuthManager::authenticate(url, username, password, force).await?;

    if config.server_url.as_deref() != Some(session.url.as_str()) {
        config.server_url = Some(session.url.clone());
        config.save()?;
    }

    println!();
    println!("{}", "Authentication successful!".green().bold());
    println!("  Server: {}", session.url);
    println!("  User: {}", session.username);
    println!();
    println!("Session stored securely in system keyring.");

    Ok(())
}

/// Handle the `browse` command
pub async fn browse(artist: Option<String>, all: bool, layout: Option<Layout>) -> Result<()> {
    let config = AppConfig::load()?;
    let session = AuthManager::require()?;

    let store = Arc::new(
        CouchStore::new(&session.url, Some(&session.token))
            .context("Failed to create document store")?,
    );
    let watchers = store.watch(&WATCHED_COLLECTIONS);
    let provider = LibraryProvider::new(store, config.counters_ttl());
    let client = Arc::new(session.client()?);

    let ctx = ItemContext {
        provider,
        artwork: client.clone(),
        blobs: BlobRegistry::new(),
    };
    let options = BrowseOptions {
        route: LibraryRoute {
            all,
            artist,
            album: None,
        },
        layout: layout.unwrap_or(config.layout),
        overscan: config.overscan_rows,
    };

    let result = browse::run_browser(ctx, client, options).await;

    for watcher in watchers {
        watcher.abort();
    }
    result
}

#[derive(serde::Serialize)]
struct DecodedUri<P> {
    kind: RecordKind,
    params: P,
}

fn print_decoded(uri: &RecordUri) -> Result<()> {
    let kind = uri.kind();
    let json = match uri {
        RecordUri::Artist(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
        RecordUri::Album(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
        RecordUri::Track(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
        RecordUri::File(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
        RecordUri::Tracker(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
        RecordUri::Library(params) => serde_json::to_string_pretty(&DecodedUri { kind, params }),
    }?;
    println!("{}", json);
    Ok(())
}

/// Handle `uri decode`
pub fn uri_decode(uri: &str) -> Result<()> {
    let decoded = RecordUri::parse(uri).with_context(|| format!("Cannot decode '{}'", uri))?;
    print_decoded(&decoded)
}

/// Handle `uri encode`
pub fn uri_encode(kind: RecordKind, record: &str) -> Result<()> {
    let doc: serde_json::Value =
        serde_json::from_str(record).context("Record is not valid JSON")?;
    let uri = RecordUri::from_document(kind, doc)
        .with_context(|| format!("Cannot derive a {} URI", kind))?;
    println!("{}", uri.encode()?);
    Ok(())
}

/// Handle the `search` command
pub async fn search(query: &str, kinds: &[RecordKind], api_key: Option<String>) -> Result<()> {
    let config = AppConfig::load()?;
    let source = lastfm(api_key, &config)?;

    let progress = spinner(&format!("Searching '{}'...", query))?;
    let result = source.search(query, kinds).await;
    progress.finish_and_clear();
    let records = result?;

    if records.is_empty() {
        println!("{}", "No results.".yellow());
        return Ok(());
    }

    for record in &records {
        match record {
            DsRecord::Artist(artist) => {
                println!("{} {}", "artist".cyan(), artist.name.bold());
            }
            DsRecord::Album(album) => {
                println!(
                    "{}  {} {}",
                    "album".green(),
                    album.name.bold(),
                    format!("by {}", album.artist).dimmed()
                );
            }
            DsRecord::Track(track) => {
                println!(
                    "{}  {} {}",
                    "track".magenta(),
                    track.name.bold(),
                    format!("by {}", track.artist).dimmed()
                );
            }
        }
    }
    println!();
    println!("{} results", records.len());

    Ok(())
}

/// Handle the `candidates` command
pub async fn candidates(artist: &str, use_lastfm: bool, api_key: Option<String>) -> Result<()> {
    let config = AppConfig::load()?;
    let source: Arc<dyn CandidateSource> = if use_lastfm {
        Arc::new(lastfm(api_key, &config)?)
    } else {
        Arc::new(AuthManager::require()?.client()?)
    };

    let progress = spinner(&format!("Fetching albums of {}...", artist))?;
    let result = source.artist_top_albums(artist).await;
    progress.finish_and_clear();
    let albums = displayable(result?);

    if albums.is_empty() {
        println!("{}", "No albums with artwork found.".yellow());
        return Ok(());
    }

    println!("{}", format!("Albums of {}:", artist).green().bold());
    for album in albums {
        println!("  {}", album.name);
    }
    Ok(())
}

/// Handle the `counters` command
pub async fn counters(artist: &str) -> Result<()> {
    let config = AppConfig::load()?;
    let session = AuthManager::require()?;
    let store = Arc::new(
        CouchStore::new(&session.url, Some(&session.token))
            .context("Failed to create document store")?,
    );
    let provider = LibraryProvider::new(store, config.counters_ttl());

    let (albums, tracks) = provider
        .get_artist_counters(artist)
        .await
        .with_context(|| format!("Failed to count records of {}", artist))?;
    println!("{}", artist.bold());
    println!("  {} albums", albums);
    println!("  {} tracks", tracks);
    Ok(())
}

/// Handle the `artwork` command
pub async fn artwork(
    artist: &str,
    album: Option<&str>,
    output: &Path,
    max_size: Option<u32>,
    api_key: Option<String>,
) -> Result<()> {
    let config = AppConfig::load()?;
    let source = lastfm(api_key, &config)?;

    let progress = spinner("Looking for artwork...")?;
    let result = match album {
        Some(album) => source.album_cover(artist, album).await,
        None => source.artist_artwork(artist).await,
    };
    progress.finish_and_clear();

    let Some(data) = result? else {
        println!("{}", "No square artwork found.".yellow());
        return Ok(());
    };

    let data = match max_size {
        Some(max) => compactd::datasource::images::fit_within(&data, max)?,
        None => data.to_vec(),
    };
    tokio::fs::write(output, &data)
        .await
        .with_context(|| format!("Failed to write {:?}", output))?;

    println!(
        "{} {} ({} KB)",
        "Saved".green(),
        output.display(),
        data.len() / 1024
    );
    Ok(())
}

/// Handle the `completion` command
pub fn completion(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    let mut cmd = super::Cli::command();
    generate(shell, &mut cmd, "compactd", &mut io::stdout());
}

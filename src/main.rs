//! compactd - Browse a compactd music library from the terminal

use anyhow::Result;
use clap::Parser;

mod browse;
mod cli;
mod config;
mod logging;

use cli::{Cli, Commands, UriAction};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose);

    match cli.command {
        Commands::Auth {
            url,
            username,
            password,
            force,
        } => {
            cli::commands::auth(url, username, password, force).await?;
        }
        Commands::Browse { artist, all, layout } => {
            cli::commands::browse(artist, all, layout).await?;
        }
        Commands::Uri { action } => match action {
            UriAction::Decode { uri } => cli::commands::uri_decode(&uri)?,
            UriAction::Encode { kind, record } => cli::commands::uri_encode(kind, &record)?,
        },
        Commands::Search {
            query,
            kind,
            api_key,
        } => {
            cli::commands::search(&query, &kind, api_key).await?;
        }
        Commands::Candidates {
            artist,
            lastfm,
            api_key,
        } => {
            cli::commands::candidates(&artist, lastfm, api_key).await?;
        }
        Commands::Counters { artist } => {
            cli::commands::counters(&artist).await?;
        }
        Commands::Artwork {
            artist,
            album,
            output,
            max_size,
            api_key,
        } => {
            cli::commands::artwork(&artist, album.as_deref(), &output, max_size, api_key).await?;
        }
        Commands::Completion { shell } => {
            cli::commands::completion(shell);
        }
    }

    Ok(())
}

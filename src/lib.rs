//! Spotify Discography Export Library
//!
//! This library extracts an artist's complete discography from the Spotify Web
//! API and writes every artist, album and track record as a single-line JSON
//! object into object storage, ready for newline-delimited bulk loading.
//!
//! # Modules
//!
//! - `api` - HTTP handlers for the trigger endpoint
//! - `cli` - Command implementations of the binary
//! - `config` - Configuration management and environment variables
//! - `error` - Error taxonomies for the pipeline, storage and configuration
//! - `management` - Long-lived shared state (the client credential cache)
//! - `pipeline` - The staged fetch, enrich and upload orchestrator
//! - `server` - HTTP server assembly
//! - `spotify` - Throttled Spotify Web API access
//! - `storage` - Object storage backends and the upload fan-out
//! - `types` - Data structures and type definitions
//! - `utils` - Utility functions and helpers
//!
//! # Example
//!
//! ```
//! use discostore::{config, pipeline::Pipeline, storage};
//!
//! #[tokio::main]
//! async fn main() -> discostore::Res<()> {
//!     config::load_env().await;
//!     let settings = config::Settings::from_env()?;
//!     let store = storage::connect(&settings.storage).await?;
//!     let pipeline = Pipeline::new(&settings.spotify, settings.pipeline.clone(), store)?;
//!     let result = pipeline.run("Tove Lo").await?;
//!     println!("{} tracks stored", result.tracks_stored);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod management;
pub mod pipeline;
pub mod server;
pub mod spotify;
pub mod storage;
pub mod types;
pub mod utils;

/// A convenient Result type alias for top-level operations that may fail.
///
/// Used by the binary and the CLI glue where any error simply ends the
/// command. Library stages return the typed errors from [`error`] instead.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// Every line is prefixed with the current UTC time so service logs can be
/// ordered across concurrent requests.
///
/// # Example
///
/// ```
/// info!("Gathering albums for artist {}", artist_id);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!(
      "{} [{}] {}",
      chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true).dimmed(),
      "o".blue().bold(),
      std::format_args!($($arg)*)
    );
  })
}

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Stored {} tracks", count);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!(
      "{} [{}] {}",
      chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true).dimmed(),
      "✓".green().bold(),
      std::format_args!($($arg)*)
    );
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only used for unrecoverable startup failures and in the CLI. Anything on
/// the request path returns a typed error instead.
///
/// # Example
///
/// ```
/// error!("Missing required environment variable: {}", var_name);
/// // Program exits here - code after this will not execute
/// ```
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!(
      "{} [{}] {}",
      chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true).dimmed(),
      "!".red().bold(),
      std::format_args!($($arg)*)
    );
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
///
/// Used for retries, clamped rate-limit hints and aborted pipeline runs.
///
/// # Example
///
/// ```
/// warning!("Rate limited on {}, retrying in {:?}", url, delay);
/// ```
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!(
      "{} [{}] {}",
      chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true).dimmed(),
      "!".yellow().bold(),
      std::format_args!($($arg)*)
    );
  })
}

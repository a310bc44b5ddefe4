//! Spotify Authorization Library
//!
//! OAuth2 authorization code flow and an authenticated Spotify Web API client,
//! meant to be embedded in an axum host.
//!
//! # Modules
//!
//! - `api` - `/auth` and `/callback` handlers and the handshake behind them
//! - `config` - Client credentials, endpoints and environment loading
//! - `error` - The crate wide error type
//! - `management` - Session storage and refresh listener capabilities
//! - `server` - Router assembly and the shared application state
//! - `spotify` - Token endpoint operations and the request executor
//! - `types` - Auth records, responses and request options
//! - `utils` - Token generation, state comparison and header parsing
//!
//! # Example
//!
//! ```
//! use sporlauth::{config::SpotifyConfig, spotify::SpotifyClient};
//!
//! async fn me(record: &sporlauth::types::AuthRecord) -> sporlauth::Res<()> {
//!     let client = SpotifyClient::new(SpotifyConfig::from_env()?);
//!     let response = client.get(record, "/me").await?;
//!     // persist response.auth when response.auth_changed
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod management;
pub mod server;
pub mod spotify;
pub mod types;
pub mod utils;

/// A convenient Result type alias for operations that may fail.
///
/// Every fallible operation in the crate reports a
/// [`error::SpotifyError`], so callers can tell CSRF failures, upstream
/// rejections and protocol errors apart.
pub type Res<T> = std::result::Result<T, error::SpotifyError>;

/// Prints a success message with a green checkmark.
///
/// # Example
///
/// ```
/// success!("Listening on {}", addr);
/// ```
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program.
///
/// Only meant for the binary's startup path, never for request handling.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

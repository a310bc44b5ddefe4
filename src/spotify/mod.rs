//! # Spotify Integration Module
//!
//! Talks to Spotify's accounts service and Web API on behalf of an authorized
//! user.
//!
//! ## Overview
//!
//! ```text
//! Host handlers
//!          ↓
//! Spotify Integration Layer
//!     ├── Authentication (authorize URL, code exchange, refresh)
//!     └── Client (bearer injection, pre-flight refresh, 429 backoff)
//!          ↓
//! HTTP Layer (reqwest)
//!          ↓
//! Spotify Accounts Service / Web API
//! ```
//!
//! ### Authentication Module
//!
//! [`auth`] - Stateless token endpoint operations:
//! - **Authorize URL**: consent page URL with `state`, scope and optional PKCE challenge
//! - **Code Exchange**: turns the callback `code` into an [`crate::types::AuthRecord`]
//! - **Refresh**: replaces access token and expiry, keeps the refresh token unless rotated
//!
//! ### Client Module
//!
//! [`client`] - [`client::SpotifyClient`] issues authenticated calls:
//! - **Proactive Refresh**: tokens expiring within 60 seconds are refreshed first
//! - **Rate Limiting**: 429 responses are retried after `Retry-After` seconds
//! - **Explicit Records**: the refreshed record is returned, never mutated in place
//!
//! ## Error Types
//!
//! Every function returns [`crate::Res`]; see [`crate::error::SpotifyError`].
//!
//! ## Thread Safety
//!
//! - All operations use async/await for non-blocking I/O
//! - The rate limit backoff is a `tokio::time::sleep`, other requests keep running
//! - No global mutable state; the HTTP connection pool is shared read-only

pub mod auth;
pub mod client;

pub use client::SpotifyClient;

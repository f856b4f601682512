//! Monthly top-artist history for a Last.fm user.
//!
//! Fetches the user's top artists, folds them into a month-keyed CSV history
//! and renders a static page whose artist colors stay stable across months.

pub mod config;
pub mod lastfm;
pub mod processor;
pub mod render;
pub mod storage;

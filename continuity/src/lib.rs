//! Color Continuity Library
//!
//! This library provides:
//! - The monthly snapshot model shared by the fetch, storage and render layers
//! - A finite, ordered color palette
//! - A color ledger remembering each artist's last color across runs
//! - The color continuity allocator
//!
//! # Allocation rules
//!
//! - An artist present in consecutive snapshots keeps its color.
//! - A color vacated by a departing artist goes to a free pool and is handed
//!   to the next newcomer before any fresh palette color.
//! - The same history and the same seed ledger always produce the same colors.
//!
//! # Usage
//!
//! ```rust
//! use continuity::{assign_colors, ArtistRecord, ColorLedger, MonthlySnapshot};
//!
//! let feb = MonthlySnapshot::new(
//!     "2024-02",
//!     "February 2024",
//!     "2024-02-15T12:00:00+00:00",
//!     vec![ArtistRecord::new("A", 10, 1), ArtistRecord::new("B", 5, 2)],
//! );
//!
//! let colored = assign_colors(&[feb], &ColorLedger::new());
//! assert_ne!(colored[0].artists[0].color, colored[0].artists[1].color);
//! ```

pub mod allocator;
pub mod ledger;
pub mod palette;
pub mod snapshot;

pub use allocator::{assign_colors, Allocation, ColorAllocator};
pub use ledger::ColorLedger;
pub use palette::{Color, Palette, PaletteError};
pub use snapshot::{
    validate_history, ArtistRecord, ColoredArtist, ColoredSnapshot, MonthlySnapshot,
    SnapshotError,
};

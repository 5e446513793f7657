//! Search, result previews and cross-page highlighting for static blogs.
//!
//! The page is modelled as a single-threaded runtime: an arena [`dom::Dom`],
//! a virtual-clock [`timer::Scheduler`], a [`viewport::Viewport`] and a
//! [`location::Location`]. [`page::Page`] wires the search box, the
//! highlighter and in-page link handling onto one such runtime.

pub mod config;
pub mod controller;
pub mod dom;
pub mod error;
pub mod grouping;
pub mod highlight;
pub mod index;
pub mod links;
pub mod location;
pub mod matcher;
pub mod page;
pub mod preview;
pub mod results;
pub mod timer;
pub mod viewport;

pub use config::Config;
pub use controller::{Navigation, SearchController};
pub use error::{Result, SearchError};
pub use grouping::{group_by_path, GroupedMatches, Match};
pub use index::Document;
pub use matcher::{find_all_matches, Span};
pub use preview::generate_preview;

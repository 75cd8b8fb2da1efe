//! The HTTP-only scrape phase: listing pagination and document downloads.

pub mod download;
pub mod pager;

pub use pager::{scrape, PageCursor, ScrapeReport, ScrapeSettings, StopReason};

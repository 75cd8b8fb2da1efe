//! HTTP-side acquisition for the scrape phase.
//!
//! Once the browser has handed its cookies over, every listing page and
//! document is fetched with plain HTTP and parsed from raw HTML.

pub mod document;
pub mod http_client;

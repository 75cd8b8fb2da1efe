// Copyright 2026 Fatal5 Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Fatal5 harvest library: browser login, cookie handoff, paginated
//! listing scrape and document download for the Fatal5 portal.
//!
//! This library crate exposes the core modules for integration testing.

pub mod acquisition;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod renderer;
pub mod scrape;
pub mod session;
pub mod sink;

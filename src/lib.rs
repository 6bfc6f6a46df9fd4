// Copyright 2026 WebUnlock Contributors
// SPDX-License-Identifier: Apache-2.0

//! WebUnlock library — extract structured content (text, attributes,
//! tabular rows, screenshots) from live web pages rendered through a
//! headless browser.
//!
//! The binary target wires these modules into an HTTP service and CLI.

pub mod error;
pub mod export;
pub mod extraction;
pub mod protocol;
pub mod renderer;
pub mod rest;
pub mod retry;
pub mod stats;
pub mod types;

// SPDX-License-Identifier: MIT
// Copyright (c) 2026 the ci-arbiter authors

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ci-gateway: the public HTTP surface — create-job, get-job, list-jobs,
//! health, and HMAC request-signature verification (§4.3, §6).

pub mod app;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod models;

pub use app::{router, AppState};
pub use error::GatewayError;

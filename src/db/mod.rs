// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key/value storage layer.

pub mod token_store;

pub use token_store::{StorageEvent, TokenStore};

/// Storage keys. Values are always strings; absence means logged out / no cache.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "googleFitToken";
    pub const REFRESH_TOKEN: &str = "googleFitRefreshToken";
    pub const EMAIL: &str = "email";
    pub const DISPLAY_NAME: &str = "name";
    /// Most recent step count, cached for quick display on start-up
    pub const CURRENT_STEPS: &str = "currentSteps";

    pub const ALL: [&str; 5] = [ACCESS_TOKEN, REFRESH_TOKEN, EMAIL, DISPLAY_NAME, CURRENT_STEPS];
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Query cache client.
//!
//! A [`QueryClient`] is created once per app and shared by every view. Views
//! call [`QueryClient::observe`] with a resource key and an `enabled` gate;
//! the client fetches through its [`Fetcher`] when the key is absent or
//! stale, shares one in-flight request between all observers of a key, and
//! notifies observers on every state transition.

pub mod client;
pub mod fetcher;
pub mod key;
pub mod state;

pub use client::{QueryClient, QueryObserver};
pub use fetcher::{FetchError, Fetcher, HttpFetcher};
pub use key::QueryKey;
pub use state::{QueryResult, QueryStatus};

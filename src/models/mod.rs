// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models shared by the relay and the clients.

pub mod group;
pub mod user;

pub use group::PrayerGroupSummary;
pub use user::User;

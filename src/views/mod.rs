// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! View models rendered by the web and mobile clients.
//!
//! Everything here is a pure function of the current user and query state,
//! plus small pieces of local UI state (the active tab).

pub mod groups;
pub mod identity;
pub mod nav;

pub use groups::{GroupRow, GroupsListView, PrayerGroupsList, Swatch};
pub use identity::{display_name, initials, Identity};
pub use nav::{sign_out, NavChrome, NavState, NavVariant, Navigation, Tab, Viewport, ViewportSource};

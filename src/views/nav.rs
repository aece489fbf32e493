// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Navigation chrome: responsive variant, active tab and sign-out.

use super::identity::Identity;
use crate::models::User;
use serde::{Deserialize, Serialize};

/// Widths strictly below this are treated as mobile.
pub const MOBILE_BREAKPOINT: u32 = 768;

/// Full-page navigation target that ends the session.
pub const LOGOUT_PATH: &str = "/api/logout";

/// Viewport class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Mobile,
    Desktop,
}

impl Viewport {
    pub fn from_width(width: u32) -> Self {
        if width < MOBILE_BREAKPOINT {
            Viewport::Mobile
        } else {
            Viewport::Desktop
        }
    }
}

/// Source of the current viewport width, supplied by the host platform.
pub trait ViewportSource {
    fn width(&self) -> u32;

    fn viewport(&self) -> Viewport {
        Viewport::from_width(self.width())
    }
}

/// Which navigation rendering is active. Exactly one is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavVariant {
    BottomTabBar,
    Sidebar,
}

impl From<Viewport> for NavVariant {
    fn from(viewport: Viewport) -> Self {
        match viewport {
            Viewport::Mobile => NavVariant::BottomTabBar,
            Viewport::Desktop => NavVariant::Sidebar,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Home,
    Requests,
    Groups,
    Profile,
}

impl Tab {
    /// Tabs in display order.
    pub const ALL: [Tab; 4] = [Tab::Home, Tab::Requests, Tab::Groups, Tab::Profile];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Requests => "Prayer Requests",
            Tab::Groups => "Groups",
            Tab::Profile => "Profile",
        }
    }
}

/// Browser navigation requested by a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Leave the app and load `path` as a full page.
    FullPage(&'static str),
}

/// Sign out by navigating to the logout endpoint. The navigation itself
/// ends the session; no client state is cleared first.
pub fn sign_out() -> Navigation {
    Navigation::FullPage(LOGOUT_PATH)
}

/// Everything the navigation chrome renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavChrome {
    pub variant: NavVariant,
    pub active_tab: Tab,
    /// `None` while nobody is signed in.
    pub identity: Option<Identity>,
}

/// Local navigation state. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NavState {
    active_tab: Tab,
}

impl NavState {
    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn select(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    /// Render for the given viewport. Both variants read the same active tab.
    pub fn render(&self, user: Option<&User>, viewport: Viewport) -> NavChrome {
        NavChrome {
            variant: viewport.into(),
            active_tab: self.active_tab,
            identity: user.map(Identity::for_user),
        }
    }

    pub fn render_for(&self, user: Option<&User>, source: &dyn ViewportSource) -> NavChrome {
        self.render(user, source.viewport())
    }
}

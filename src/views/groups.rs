// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! "My prayer groups" card, bound to the query cache.

use crate::models::PrayerGroupSummary;
use crate::query::{QueryClient, QueryKey, QueryObserver, QueryResult};
use crate::session::AuthContext;
use validator::Validate;

/// Query key for the signed-in user's group memberships.
pub const MY_GROUPS_PATH: &str = "/api/groups/mine";

/// Groups shown on the card. There is no "load more".
pub const MAX_VISIBLE_GROUPS: usize = 3;

/// Placeholder rows shown while the first load is running.
pub const SKELETON_ROWS: usize = 3;

/// Status colour next to each group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swatch {
    Green,
    Primary,
    Gray,
}

const PALETTE: [Swatch; 3] = [Swatch::Green, Swatch::Primary, Swatch::Gray];

impl Swatch {
    pub fn for_index(index: usize) -> Self {
        PALETTE[index % PALETTE.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRow {
    pub group: PrayerGroupSummary,
    pub swatch: Swatch,
}

/// The three mutually exclusive states of the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupsListView {
    Loading { skeletons: usize },
    /// No groups: shows the join/create call-to-action. `load_failed` is set
    /// when the empty list is the result of a failed request.
    Empty { load_failed: bool },
    Populated(Vec<GroupRow>),
}

/// Build the card from a query snapshot.
///
/// Last-known data is shown even while refreshing or after a failed
/// refresh. Only the first [`MAX_VISIBLE_GROUPS`] in fetch order are
/// considered; an invalid one among them is left out without pulling in a
/// later group, and the others keep the swatch of their position.
pub fn render_groups(result: &QueryResult<Vec<PrayerGroupSummary>>) -> GroupsListView {
    if result.is_loading {
        return GroupsListView::Loading {
            skeletons: SKELETON_ROWS,
        };
    }

    let rows: Vec<GroupRow> = result
        .data_or_default()
        .into_iter()
        .take(MAX_VISIBLE_GROUPS)
        .enumerate()
        .filter_map(|(index, group)| match group.validate() {
            Ok(()) => Some(GroupRow {
                group,
                swatch: Swatch::for_index(index),
            }),
            Err(e) => {
                tracing::warn!(group_id = %group.id, error = %e, "Skipping invalid group");
                None
            }
        })
        .collect();

    if rows.is_empty() {
        GroupsListView::Empty {
            load_failed: result.is_error,
        }
    } else {
        GroupsListView::Populated(rows)
    }
}

/// A mounted groups card. Dropping it unsubscribes.
pub struct PrayerGroupsList {
    observer: QueryObserver<Vec<PrayerGroupSummary>>,
}

impl PrayerGroupsList {
    /// Mount the card. Nothing is fetched unless someone is signed in.
    pub fn mount(client: &QueryClient, auth: &AuthContext) -> Self {
        Self {
            observer: client.observe(QueryKey::new(MY_GROUPS_PATH), auth.is_authenticated()),
        }
    }

    pub fn render(&self) -> GroupsListView {
        render_groups(&self.observer.current())
    }

    /// Wait for the next state transition and render it.
    pub async fn next_render(&mut self) -> Option<GroupsListView> {
        let result = self.observer.changed().await?;
        Some(render_groups(&result))
    }

    /// Wait for the current request, if any, and render the outcome.
    pub async fn settled(&mut self) -> GroupsListView {
        render_groups(&self.observer.settled().await)
    }
}

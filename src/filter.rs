use std::collections::HashSet;

use crate::model::{Booking, ResourceGroup};

/// Active filters. Empty (or whitespace-only) strings mean "off".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search: String,
    pub booking_id: String,
}

impl FilterState {
    pub fn is_active(&self) -> bool {
        !self.search.trim().is_empty() || !self.booking_id.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.search.clear();
        self.booking_id.clear();
    }
}

/// Apply both filters in order: booking id first, then search term.
/// Pure: the input tree is never touched, a filtered copy is returned.
pub fn apply(groups: &[ResourceGroup], bookings: &[Booking], filters: &FilterState) -> Vec<ResourceGroup> {
    let mut out = groups.to_vec();

    // Whitespace only decides whether a filter is on; matching uses the text
    // as typed.
    if !filters.booking_id.trim().is_empty() {
        out = by_booking_id(&out, bookings, &filters.booking_id);
    }

    if !filters.search.trim().is_empty() {
        out = by_search(&out, &filters.search);
    }

    out
}

/// Keep only rooms referenced by a booking whose id contains `needle`.
/// Groups left empty are dropped; survivors are force-expanded so the match
/// is never hidden behind a collapsed header.
pub fn by_booking_id(groups: &[ResourceGroup], bookings: &[Booking], needle: &str) -> Vec<ResourceGroup> {
    let matched: HashSet<&str> = bookings
        .iter()
        .filter(|b| b.id.as_str().contains(needle))
        .map(|b| b.resource_id.as_str())
        .collect();

    groups
        .iter()
        .filter_map(|g| {
            let children: Vec<_> = g
                .children
                .iter()
                .filter(|c| matched.contains(c.id.as_str()))
                .cloned()
                .collect();
            if children.is_empty() {
                return None;
            }
            Some(ResourceGroup {
                id: g.id.clone(),
                name: g.name.clone(),
                expanded: true,
                children,
            })
        })
        .collect()
}

/// Case-insensitive name search.
/// - Group name matches: group kept with all its rooms, expansion unchanged
/// - Otherwise: only matching rooms kept, group expanded to show them
/// - No match at all: group dropped
pub fn by_search(groups: &[ResourceGroup], term: &str) -> Vec<ResourceGroup> {
    let term = term.to_lowercase();

    groups
        .iter()
        .filter_map(|g| {
            if g.name.to_lowercase().contains(&term) {
                return Some(g.clone());
            }
            let children: Vec<_> = g
                .children
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&term))
                .cloned()
                .collect();
            if children.is_empty() {
                return None;
            }
            Some(ResourceGroup {
                id: g.id.clone(),
                name: g.name.clone(),
                expanded: true,
                children,
            })
        })
        .collect()
}

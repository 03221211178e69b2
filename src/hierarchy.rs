use crate::model::{ResourceGroup, VisibleRow};

/// Flatten groups into display rows.
/// - Group header always emitted, in group order
/// - Children follow, in original order, only when the group is expanded
///
/// Never drops a group; removing empty groups is the filter's job.
pub fn flatten(groups: &[ResourceGroup]) -> Vec<VisibleRow> {
    let capacity = groups
        .iter()
        .map(|g| 1 + if g.expanded { g.children.len() } else { 0 })
        .sum();
    let mut rows = Vec::with_capacity(capacity);

    for group in groups {
        rows.push(VisibleRow::Parent {
            id: group.id.clone(),
            name: group.name.clone(),
            expanded: group.expanded,
        });
        if !group.expanded {
            continue;
        }
        for child in &group.children {
            rows.push(VisibleRow::Child {
                id: child.id.clone(),
                name: child.name.clone(),
                parent_id: group.id.clone(),
            });
        }
    }

    rows
}

/// Flip one group's `expanded` flag. Returns the new value, or `None` if no
/// group has that id.
pub fn toggle(groups: &mut [ResourceGroup], group_id: &str) -> Option<bool> {
    let group = groups.iter_mut().find(|g| g.id == group_id)?;
    group.expanded = !group.expanded;
    Some(group.expanded)
}

pub fn set_all_expanded(groups: &mut [ResourceGroup], expanded: bool) {
    for g in groups {
        g.expanded = expanded;
    }
}

/// Row index of a room in a flattened list.
pub fn row_of_resource(rows: &[VisibleRow], resource_id: &str) -> Option<usize> {
    rows.iter()
        .position(|r| r.is_child() && r.id() == resource_id)
}

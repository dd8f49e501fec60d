//! Academic unit hierarchy materialization
//!
//! Converts flat `(id, name, parent_id)` unit rows plus the careers of
//! each unit into a forest. A unit is nested under its parent when the
//! parent id names another unit of the input; otherwise it is a root.
//! Every unit appears exactly once in the output.
//!
//! Sibling order is input order, with a unit's careers ahead of its
//! sub-units.

use std::collections::HashMap;

use nahuel_common::db::AcademicUnitRow;
use serde::Serialize;
use tracing::warn;

/// A unit of the materialized hierarchy. Ids and parent pointers are
/// internal and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcademicUnitNode {
    #[serde(skip)]
    pub id: i64,
    pub name: String,
    pub children: Vec<HierarchyChild>,
}

/// Terminal entry under a unit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CareerLeaf {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HierarchyChild {
    Career(CareerLeaf),
    Unit(AcademicUnitNode),
}

impl AcademicUnitNode {
    /// Sub-units directly under this node
    pub fn units(&self) -> impl Iterator<Item = &AcademicUnitNode> {
        self.children.iter().filter_map(|child| match child {
            HierarchyChild::Unit(unit) => Some(unit),
            HierarchyChild::Career(_) => None,
        })
    }

    /// Career names directly under this node
    pub fn careers(&self) -> impl Iterator<Item = &str> {
        self.children.iter().filter_map(|child| match child {
            HierarchyChild::Career(leaf) => Some(leaf.name.as_str()),
            HierarchyChild::Unit(_) => None,
        })
    }
}

/// Build the unit forest.
///
/// `careers` maps a unit id to its career names; entries for unknown units
/// are ignored. Repeated unit ids keep their first row.
pub fn materialize(
    units: Vec<AcademicUnitRow>,
    mut careers: HashMap<i64, Vec<String>>,
) -> Vec<AcademicUnitNode> {
    let mut index: HashMap<i64, usize> = HashMap::with_capacity(units.len());
    let mut slots: Vec<Option<AcademicUnitNode>> = Vec::with_capacity(units.len());
    let mut parent_ids: Vec<Option<i64>> = Vec::with_capacity(units.len());

    for row in units {
        if index.contains_key(&row.id) {
            warn!(unit_id = row.id, "Duplicate academic unit row ignored");
            continue;
        }

        let children = careers
            .remove(&row.id)
            .unwrap_or_default()
            .into_iter()
            .map(|name| HierarchyChild::Career(CareerLeaf { name }))
            .collect();

        index.insert(row.id, slots.len());
        parent_ids.push(row.parent_id);
        slots.push(Some(AcademicUnitNode {
            id: row.id,
            name: row.name,
            children,
        }));
    }

    let count = slots.len();

    // Parent positions; a self reference does not name "another" unit
    let mut parent_of: Vec<Option<usize>> = parent_ids
        .iter()
        .enumerate()
        .map(|(pos, parent)| {
            parent
                .and_then(|id| index.get(&id).copied())
                .filter(|&p| p != pos)
        })
        .collect();

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (pos, parent) in parent_of.iter().enumerate() {
        if let Some(p) = parent {
            children_of[*p].push(pos);
        }
    }

    let mut roots: Vec<usize> = (0..count).filter(|&pos| parent_of[pos].is_none()).collect();

    let mut visited = vec![false; count];
    let mut order = Vec::with_capacity(count);
    for &root in &roots {
        walk_preorder(root, &children_of, &mut visited, &mut order);
    }

    // Units still unvisited sit on a parent cycle or below one. Cut the
    // cycle at its first unit in input order.
    for pos in 0..count {
        if visited[pos] {
            continue;
        }
        if let Some(parent) = parent_of[pos].take() {
            children_of[parent].retain(|&c| c != pos);
        }
        warn!(
            unit_id = slots[pos].as_ref().map(|n| n.id),
            "Academic unit parent cycle broken; unit promoted to root"
        );
        roots.push(pos);
        walk_preorder(pos, &children_of, &mut visited, &mut order);
    }
    roots.sort_unstable();

    // Reverse pre-order: every child is complete before its parent takes it
    for &pos in order.iter().rev() {
        let sub_units: Vec<HierarchyChild> = std::mem::take(&mut children_of[pos])
            .into_iter()
            .filter_map(|child| slots[child].take())
            .map(HierarchyChild::Unit)
            .collect();

        if let Some(node) = slots[pos].as_mut() {
            node.children.extend(sub_units);
        }
    }

    roots
        .into_iter()
        .filter_map(|pos| slots[pos].take())
        .collect()
}

/// Iterative depth-first pre-order walk that keeps sibling order
fn walk_preorder(
    start: usize,
    children_of: &[Vec<usize>],
    visited: &mut [bool],
    order: &mut Vec<usize>,
) {
    let mut stack = vec![start];
    while let Some(pos) = stack.pop() {
        if visited[pos] {
            continue;
        }
        visited[pos] = true;
        order.push(pos);
        stack.extend(children_of[pos].iter().rev().copied());
    }
}

//! Two-phase reconstruction of self-referential collections.
//!
//! Nodes arrive with source-local ids and parent links expressed as those
//! ids. The builder places every node in an arena first, then links parents
//! by arena index and emits a creation plan in which every parent precedes
//! its descendants. Destination identities are only assigned by the store
//! while walking that plan.
//!
//! # Invariants
//! - Local ids are unique within one batch.
//! - The parent graph is a forest; cycles (including self-parenting) fail.
//! - A parent id that matches no node of the batch makes the node a root.
//! - Sibling order keys are renumbered `1..=n`, ordered by the archived key
//!   and then by archive position.

use crate::archive::error::ArchiveError;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    #[error("duplicate node id `{0}`")]
    DuplicateId(String),
    #[error("node `{0}` is its own ancestor")]
    Cycle(String),
}

impl From<HierarchyError> for ArchiveError {
    fn from(value: HierarchyError) -> Self {
        Self::InvalidHierarchy {
            message: value.to_string(),
        }
    }
}

/// Node as read from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode<T> {
    pub local_id: String,
    pub parent_local_id: Option<String>,
    pub order: i64,
    pub payload: T,
}

/// Node in creation order. `parent_index` points into the same plan and is
/// always lower than the node's own position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedNode<T> {
    pub local_id: String,
    pub parent_index: Option<usize>,
    pub order: i64,
    pub payload: T,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Done,
}

/// Validates `nodes` and returns their parents-first creation plan.
pub fn build<T>(nodes: Vec<TreeNode<T>>) -> Result<Vec<PlannedNode<T>>, HierarchyError> {
    let mut index_by_id: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
    for (index, node) in nodes.iter().enumerate() {
        if index_by_id.insert(node.local_id.as_str(), index).is_some() {
            return Err(HierarchyError::DuplicateId(node.local_id.clone()));
        }
    }

    let parents: Vec<Option<usize>> = nodes
        .iter()
        .map(|node| {
            node.parent_local_id
                .as_deref()
                .and_then(|parent_id| index_by_id.get(parent_id).copied())
        })
        .collect();
    ensure_acyclic(&nodes, &parents)?;

    let mut roots = Vec::new();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (index, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(index),
            None => roots.push(index),
        }
    }

    let mut sibling_order = vec![0_i64; nodes.len()];
    for siblings in std::iter::once(&mut roots).chain(children.iter_mut()) {
        siblings.sort_by_key(|&index| (nodes[index].order, index));
        for (position, &index) in siblings.iter().enumerate() {
            sibling_order[index] = position as i64 + 1;
        }
    }

    let mut visit_order = Vec::with_capacity(nodes.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(index) = stack.pop() {
        visit_order.push(index);
        stack.extend(children[index].iter().rev().copied());
    }

    let mut plan_position = vec![0_usize; nodes.len()];
    for (position, &index) in visit_order.iter().enumerate() {
        plan_position[index] = position;
    }

    let mut slots: Vec<Option<TreeNode<T>>> = nodes.into_iter().map(Some).collect();
    let mut plan = Vec::with_capacity(slots.len());
    for index in visit_order {
        let Some(node) = slots[index].take() else {
            continue;
        };
        plan.push(PlannedNode {
            local_id: node.local_id,
            parent_index: parents[index].map(|parent| plan_position[parent]),
            order: sibling_order[index],
            payload: node.payload,
        });
    }
    Ok(plan)
}

fn ensure_acyclic<T>(nodes: &[TreeNode<T>], parents: &[Option<usize>]) -> Result<(), HierarchyError> {
    let mut state = vec![VisitState::Unvisited; nodes.len()];
    for start in 0..nodes.len() {
        let mut path = Vec::new();
        let mut cursor = Some(start);
        while let Some(index) = cursor {
            match state[index] {
                VisitState::Done => break,
                VisitState::InProgress => {
                    return Err(HierarchyError::Cycle(nodes[index].local_id.clone()));
                }
                VisitState::Unvisited => {
                    state[index] = VisitState::InProgress;
                    path.push(index);
                    cursor = parents[index];
                }
            }
        }
        for index in path {
            state[index] = VisitState::Done;
        }
    }
    Ok(())
}

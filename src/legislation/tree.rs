//! The parameter tree: branches of named children, leaves of dated entries.

use super::ParameterError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step of a time-indexed series. `value: None` repeals the parameter from `start` on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEntry {
    pub start: NaiveDate,
    pub value: Option<f64>,
}

impl ParameterEntry {
    pub fn new(start: NaiveDate, value: f64) -> Self {
        Self { start, value: Some(value) }
    }

    pub fn repeal(start: NaiveDate) -> Self {
        Self { start, value: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterNode {
    Series(Vec<ParameterEntry>),
    Branch(BTreeMap<String, ParameterNode>),
}

impl ParameterNode {
    /// Sorts every series by effective date and rejects empty or ambiguous ones.
    pub(crate) fn validate(&mut self, path: &str) -> Result<(), ParameterError> {
        match self {
            ParameterNode::Series(entries) => {
                if entries.is_empty() {
                    return Err(ParameterError::EmptySeries { path: path.to_string() });
                }
                entries.sort_by_key(|e| e.start);
                if let Some(pair) = entries.windows(2).find(|p| p[0].start == p[1].start) {
                    return Err(ParameterError::DuplicateEffectiveDate { path: path.to_string(), date: pair[0].start });
                }
                Ok(())
            }
            ParameterNode::Branch(children) => {
                for (name, child) in children.iter_mut() {
                    child.validate(&join(path, name))?;
                }
                Ok(())
            }
        }
    }
}

/// Value of a sorted series on `date`: the latest entry effective on or before it.
pub(crate) fn value_at(entries: &[ParameterEntry], path: &str, date: NaiveDate) -> Result<f64, ParameterError> {
    let idx = entries.partition_point(|e| e.start <= date);
    let Some(entry) = idx.checked_sub(1).and_then(|i| entries.get(i)) else {
        let first = entries.first().map_or(date, |e| e.start);
        return Err(ParameterError::NotEffectiveYet { path: path.to_string(), date, first });
    };
    entry.value.ok_or_else(|| ParameterError::NotInForce { path: path.to_string(), date, since: entry.start })
}

/// Walks a dotted path below `children`.
pub(crate) fn lookup<'t>(
    children: &'t BTreeMap<String, ParameterNode>,
    prefix: &str,
    path: &str,
) -> Result<&'t ParameterNode, ParameterError> {
    let full = join(prefix, path);
    let mut segments = path.split('.');
    let mut level = children;
    let mut node = None;
    while let Some(segment) = segments.next() {
        if segment.is_empty() {
            return Err(ParameterError::InvalidPath { path: full });
        }
        let next = level.get(segment).ok_or_else(|| ParameterError::NotFound { path: full.clone() })?;
        match next {
            ParameterNode::Branch(inner) => level = inner,
            // A series is a leaf: any remaining segment points nowhere.
            ParameterNode::Series(_) if segments.clone().next().is_some() => {
                return Err(ParameterError::NotFound { path: full });
            }
            ParameterNode::Series(_) => {}
        }
        node = Some(next);
    }
    node.ok_or(ParameterError::InvalidPath { path: full })
}

pub(crate) fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() { name.to_string() } else { format!("{}.{}", prefix, name) }
}

//! The immutable legislation store and its dated views.

use super::tree::{self, ParameterEntry, ParameterNode};
use super::ParameterError;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// Time-indexed policy parameters, read-only once built and shared by reference across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Legislation {
    root: BTreeMap<String, ParameterNode>,
}

impl Legislation {
    pub fn new() -> Self { Self::default() }

    pub fn builder() -> LegislationBuilder { LegislationBuilder::default() }

    /// Adopts an externally produced tree after validating every series.
    pub fn from_tree(mut root: BTreeMap<String, ParameterNode>) -> Result<Self, ParameterError> {
        for (name, node) in root.iter_mut() {
            node.validate(name)?;
        }
        Ok(Self { root })
    }

    /// Scalar in effect at `date` for the dotted `path`.
    pub fn resolve(&self, path: &str, date: NaiveDate) -> Result<f64, ParameterError> {
        self.at(date).get(path)
    }

    pub fn node(&self, path: &str) -> Result<&ParameterNode, ParameterError> {
        tree::lookup(&self.root, "", path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.node(path).is_ok()
    }

    /// Every parameter as it stood on `date`.
    pub fn at(&self, date: NaiveDate) -> LegislationAt<'_> {
        LegislationAt { children: &self.root, prefix: String::new(), date }
    }
}

/// A view of one branch of the legislation frozen at a date.
#[derive(Debug, Clone)]
pub struct LegislationAt<'a> {
    children: &'a BTreeMap<String, ParameterNode>,
    prefix: String,
    date: NaiveDate,
}

impl<'a> LegislationAt<'a> {
    pub fn date(&self) -> NaiveDate { self.date }

    /// Scalar at a path relative to this view.
    pub fn get(&self, path: &str) -> Result<f64, ParameterError> {
        let full = tree::join(&self.prefix, path);
        match tree::lookup(self.children, &self.prefix, path)? {
            ParameterNode::Series(entries) => {
                let value = tree::value_at(entries, &full, self.date)?;
                tracing::trace!(parameter = %full, date = %self.date, value, "parameter resolved");
                Ok(value)
            }
            ParameterNode::Branch(_) => Err(ParameterError::NotAScalar { path: full }),
        }
    }

    /// Narrows the view to a sub-branch.
    pub fn branch(&self, path: &str) -> Result<LegislationAt<'a>, ParameterError> {
        let full = tree::join(&self.prefix, path);
        match tree::lookup(self.children, &self.prefix, path)? {
            ParameterNode::Branch(children) => Ok(LegislationAt { children, prefix: full, date: self.date }),
            ParameterNode::Series(_) => Err(ParameterError::NotABranch { path: full }),
        }
    }

    /// Every scalar in force below this view, keyed by relative dotted path.
    /// Parameters not yet effective or already repealed on the date are left out.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        collect(self.children, "", self.date, &mut out);
        out
    }
}

fn collect(children: &BTreeMap<String, ParameterNode>, prefix: &str, date: NaiveDate, out: &mut BTreeMap<String, f64>) {
    for (name, node) in children {
        let path = tree::join(prefix, name);
        match node {
            ParameterNode::Series(entries) => {
                if let Ok(value) = tree::value_at(entries, &path, date) {
                    out.insert(path, value);
                }
            }
            ParameterNode::Branch(inner) => collect(inner, &path, date, out),
        }
    }
}

/// Accumulates dated entries by dotted path, validating the whole tree on `build`.
#[derive(Debug, Default)]
pub struct LegislationBuilder {
    root: BTreeMap<String, ParameterNode>,
    error: Option<ParameterError>,
}

impl LegislationBuilder {
    pub fn set(mut self, path: &str, start: NaiveDate, value: f64) -> Self {
        self.push(path, ParameterEntry::new(start, value));
        self
    }

    pub fn repeal(mut self, path: &str, start: NaiveDate) -> Self {
        self.push(path, ParameterEntry::repeal(start));
        self
    }

    fn push(&mut self, path: &str, entry: ParameterEntry) {
        if self.error.is_none() {
            if let Err(e) = self.insert(path, entry) {
                self.error = Some(e);
            }
        }
    }

    fn insert(&mut self, path: &str, entry: ParameterEntry) -> Result<(), ParameterError> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ParameterError::InvalidPath { path: path.to_string() });
        }
        let conflict = || ParameterError::PathConflict { path: path.to_string() };
        let (leaf, branches) = segments.split_last().ok_or_else(conflict)?;

        let mut children = &mut self.root;
        for segment in branches {
            let node = children
                .entry((*segment).to_string())
                .or_insert_with(|| ParameterNode::Branch(BTreeMap::new()));
            children = match node {
                ParameterNode::Branch(inner) => inner,
                ParameterNode::Series(_) => return Err(conflict()),
            };
        }
        match children.entry((*leaf).to_string()).or_insert_with(|| ParameterNode::Series(Vec::new())) {
            ParameterNode::Series(entries) => {
                entries.push(entry);
                Ok(())
            }
            ParameterNode::Branch(_) => Err(conflict()),
        }
    }

    pub fn build(self) -> Result<Legislation, ParameterError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Legislation::from_tree(self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Legislation {
        Legislation::builder()
            .set("benefits.school.base", d(2010, 1, 1), 100.0)
            .set("benefits.school.base", d(2012, 6, 1), 150.0)
            .set("benefits.school.ceiling", d(2011, 1, 1), 20_000.0)
            .set("income_tax.allowance.rate", d(2005, 1, 1), 0.1)
            .repeal("income_tax.allowance.rate", d(2014, 1, 1))
            .build()
            .unwrap()
    }

    #[test]
    fn test_resolve_effective_dating() {
        let leg = sample();
        assert_eq!(leg.resolve("benefits.school.base", d(2011, 1, 1)), Ok(100.0));
        assert_eq!(leg.resolve("benefits.school.base", d(2012, 6, 1)), Ok(150.0));
        assert!(matches!(
            leg.resolve("benefits.school.base", d(2009, 1, 1)),
            Err(ParameterError::NotEffectiveYet { .. })
        ));
    }

    #[test]
    fn test_resolve_missing_and_branch_paths() {
        let leg = sample();
        assert!(matches!(leg.resolve("benefits.housing", d(2012, 1, 1)), Err(ParameterError::NotFound { .. })));
        assert!(matches!(leg.resolve("benefits.school.base.x", d(2012, 1, 1)), Err(ParameterError::NotFound { .. })));
        assert!(matches!(leg.resolve("benefits.school", d(2012, 1, 1)), Err(ParameterError::NotAScalar { .. })));
        assert!(matches!(leg.resolve("benefits..base", d(2012, 1, 1)), Err(ParameterError::InvalidPath { .. })));
    }

    #[test]
    fn test_branch_view_and_snapshot() {
        let leg = sample();
        let school = leg.at(d(2010, 6, 1)).branch("benefits.school").unwrap();
        assert_eq!(school.get("base"), Ok(100.0));
        // Errors report the full path, not the relative one.
        assert_eq!(
            school.get("ceiling"),
            Err(ParameterError::NotEffectiveYet {
                path: "benefits.school.ceiling".into(),
                date: d(2010, 6, 1),
                first: d(2011, 1, 1),
            })
        );

        let snap = leg.at(d(2015, 1, 1)).snapshot();
        assert_eq!(snap.get("benefits.school.base"), Some(&150.0));
        assert!(!snap.contains_key("income_tax.allowance.rate"));
    }

    #[test]
    fn test_builder_rejects_path_conflicts() {
        let err = Legislation::builder()
            .set("a.b", d(2010, 1, 1), 1.0)
            .set("a.b.c", d(2010, 1, 1), 1.0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ParameterError::PathConflict { .. }));
    }
}

//! Time-bounded implementations of a variable.

use crate::compute::{ComputationError, FormulaContext, Value};
use crate::entity::{Aggregation, EntityKind, GroupKind, Role};
use crate::period::Period;
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;

/// The computation rule of one variant.
///
/// Returns the period the value actually covers alongside the value. Most formulas hand
/// back the requested period unchanged.
pub trait Formula: Send + Sync {
    fn compute(&self, ctx: &mut FormulaContext<'_, '_>, period: Period) -> Result<(Period, Value), ComputationError>;
}

impl<F> Formula for F
where
    F: Fn(&mut FormulaContext<'_, '_>, Period) -> Result<(Period, Value), ComputationError> + Send + Sync,
{
    fn compute(&self, ctx: &mut FormulaContext<'_, '_>, period: Period) -> Result<(Period, Value), ComputationError> {
        self(ctx, period)
    }
}

#[derive(Clone)]
pub enum VariantBody {
    Formula(Arc<dyn Formula>),
    /// Copies a group variable onto its members; members without `role` get the default.
    EntityToPerson { source: String, group: GroupKind, role: Option<Role> },
    /// Folds a person variable into each group of `group`.
    PersonToEntity { source: String, group: GroupKind, aggregation: Aggregation, roles: Option<Vec<Role>> },
}

impl VariantBody {
    pub fn entity_to_person(source: impl Into<String>, group: impl Into<GroupKind>, role: Option<Role>) -> VariantBody {
        VariantBody::EntityToPerson { source: source.into(), group: group.into(), role }
    }

    pub fn person_to_entity(
        source: impl Into<String>,
        group: impl Into<GroupKind>,
        aggregation: Aggregation,
        roles: Option<Vec<Role>>,
    ) -> VariantBody {
        VariantBody::PersonToEntity { source: source.into(), group: group.into(), aggregation, roles }
    }

    /// Entity the source of a projection must be defined over. `None` for formulas.
    pub fn source_entity(&self) -> Option<EntityKind> {
        match self {
            VariantBody::Formula(_) => None,
            VariantBody::EntityToPerson { group, .. } => Some(EntityKind::Group(group.clone())),
            VariantBody::PersonToEntity { .. } => Some(EntityKind::Person),
        }
    }

    /// Entity the variable carrying a projection must be defined over. `None` for formulas.
    pub fn target_entity(&self) -> Option<EntityKind> {
        match self {
            VariantBody::Formula(_) => None,
            VariantBody::EntityToPerson { .. } => Some(EntityKind::Person),
            VariantBody::PersonToEntity { group, .. } => Some(EntityKind::Group(group.clone())),
        }
    }
}

impl fmt::Debug for VariantBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariantBody::Formula(_) => f.write_str("Formula(..)"),
            VariantBody::EntityToPerson { source, group, role } => f
                .debug_struct("EntityToPerson")
                .field("source", source)
                .field("group", group)
                .field("role", role)
                .finish(),
            VariantBody::PersonToEntity { source, group, aggregation, roles } => f
                .debug_struct("PersonToEntity")
                .field("source", source)
                .field("group", group)
                .field("aggregation", aggregation)
                .field("roles", roles)
                .finish(),
        }
    }
}

/// One implementation, in force from `start` through `stop` (both inclusive, `None` = open-ended).
#[derive(Debug, Clone)]
pub struct Variant {
    start: NaiveDate,
    stop: Option<NaiveDate>,
    body: VariantBody,
}

impl Variant {
    pub fn new(start: NaiveDate, stop: Option<NaiveDate>, body: VariantBody) -> Self {
        Self { start, stop, body }
    }

    pub fn formula<F>(start: NaiveDate, stop: Option<NaiveDate>, f: F) -> Self
    where
        F: Fn(&mut FormulaContext<'_, '_>, Period) -> Result<(Period, Value), ComputationError> + Send + Sync + 'static,
    {
        Self::new(start, stop, VariantBody::Formula(Arc::new(f)))
    }

    pub fn start(&self) -> NaiveDate { self.start }
    pub fn stop(&self) -> Option<NaiveDate> { self.stop }
    pub fn body(&self) -> &VariantBody { &self.body }

    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start <= date && self.stop.map_or(true, |stop| date <= stop)
    }

    pub fn overlaps(&self, other: &Variant) -> bool {
        let ends_before = |a: &Variant, b: &Variant| a.stop.map_or(false, |stop| stop < b.start);
        !ends_before(self, other) && !ends_before(other, self)
    }
}

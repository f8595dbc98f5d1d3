//! Variable definitions and their builder.

use super::{Scalar, ValueType, Variant, VariantBody, VariableMeta};
use crate::compute::{ComputationError, FormulaContext, Value};
use crate::entity::{Aggregation, EntityKind, GroupKind, Role};
use crate::period::{Period, PeriodUnit};
use chrono::NaiveDate;

/// What the evaluator does for a period no variant covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutsidePolicy {
    /// Fail with `NoApplicableVariant`.
    #[default]
    Fail,
    /// Return the variable's default.
    UseDefault,
}

/// A named quantity over an entity, computed per period of its natural `unit`.
#[derive(Debug, Clone)]
pub struct Variable {
    pub(crate) meta: VariableMeta,
    pub(crate) entity: EntityKind,
    pub(crate) value_type: ValueType,
    pub(crate) unit: PeriodUnit,
    pub(crate) default: Scalar,
    pub(crate) is_input: bool,
    pub(crate) window: Option<(NaiveDate, Option<NaiveDate>)>,
    pub(crate) outside: OutsidePolicy,
    pub(crate) variants: Vec<Variant>,
}

impl Variable {
    fn with_type(name: impl Into<String>, entity: EntityKind, unit: PeriodUnit, value_type: ValueType) -> Self {
        Self {
            meta: VariableMeta { name: name.into(), ..Default::default() },
            entity,
            value_type,
            unit,
            default: Scalar::zero(value_type),
            is_input: false,
            window: None,
            outside: OutsidePolicy::Fail,
            variants: Vec::new(),
        }
    }

    pub fn float(name: impl Into<String>, entity: EntityKind, unit: PeriodUnit) -> Self {
        Self::with_type(name, entity, unit, ValueType::Float)
    }

    pub fn boolean(name: impl Into<String>, entity: EntityKind, unit: PeriodUnit) -> Self {
        Self::with_type(name, entity, unit, ValueType::Bool)
    }

    pub fn default(mut self, value: impl Into<Scalar>) -> Self {
        self.default = value.into();
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.meta.label = Some(label.into());
        self
    }

    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.meta.reference = Some(reference.into());
        self
    }

    /// Marks the variable as supplied by the population rather than computed.
    pub fn input(mut self) -> Self {
        self.is_input = true;
        self
    }

    /// Outside `[start, stop]` the default is returned without consulting variants.
    pub fn active_between(mut self, start: NaiveDate, stop: Option<NaiveDate>) -> Self {
        self.window = Some((start, stop));
        self
    }

    pub fn default_outside_variants(mut self) -> Self {
        self.outside = OutsidePolicy::UseDefault;
        self
    }

    pub fn variant<F>(self, start: NaiveDate, stop: Option<NaiveDate>, formula: F) -> Self
    where
        F: Fn(&mut FormulaContext<'_, '_>, Period) -> Result<(Period, Value), ComputationError> + Send + Sync + 'static,
    {
        self.with_variant(Variant::formula(start, stop, formula))
    }

    /// Broadcasts `source`, a variable of `group`, to its members (only the holder of `role` if given).
    pub fn entity_to_person(self, start: NaiveDate, source: &str, group: impl Into<GroupKind>, role: Option<Role>) -> Self {
        self.with_variant(Variant::new(start, None, VariantBody::entity_to_person(source, group, role)))
    }

    /// Aggregates `source`, a person variable, over each group of `group`.
    pub fn person_to_entity(
        self,
        start: NaiveDate,
        source: &str,
        group: impl Into<GroupKind>,
        aggregation: Aggregation,
        roles: Option<Vec<Role>>,
    ) -> Self {
        self.with_variant(Variant::new(start, None, VariantBody::person_to_entity(source, group, aggregation, roles)))
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn name(&self) -> &str { &self.meta.name }
    pub fn meta(&self) -> &VariableMeta { &self.meta }
    pub fn entity(&self) -> &EntityKind { &self.entity }
    pub fn value_type(&self) -> ValueType { self.value_type }
    pub fn unit(&self) -> PeriodUnit { self.unit }
    pub fn default_value(&self) -> Scalar { self.default }
    pub fn is_input(&self) -> bool { self.is_input }
    pub fn outside_policy(&self) -> OutsidePolicy { self.outside }
    pub fn variants(&self) -> &[Variant] { &self.variants }

    /// Whether `date` falls inside the variable-level window (always true without one).
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.window
            .map_or(true, |(start, stop)| start <= date && stop.map_or(true, |stop| date <= stop))
    }

    pub fn variant_at(&self, date: NaiveDate) -> Option<&Variant> {
        self.variants.iter().find(|v| v.covers(date))
    }
}

//! Reshaping values between a group entity and the persons holding roles in it.
//!
//! Person-level arrays have one slot per person; group-level arrays one slot per group.
//! No operation here changes the population; a member without the requested role
//! contributes the neutral element of the reduction (0 for sums, false for `Any`, true for `All`).

use super::{GroupKind, GroupStructure, PopulationError, Role};
use crate::compute::Value;
use std::collections::BTreeMap;
use std::fmt;

/// How person-level values fold into their group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Sum of floats.
    Sum,
    /// Logical or of booleans.
    Any,
    /// Logical and of booleans.
    All,
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Aggregation::Sum => "sum",
            Aggregation::Any => "any",
            Aggregation::All => "all",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Projection<'p> {
    kind: &'p GroupKind,
    structure: &'p GroupStructure,
}

impl<'p> Projection<'p> {
    pub(crate) fn new(kind: &'p GroupKind, structure: &'p GroupStructure) -> Self {
        Self { kind, structure }
    }

    pub fn kind(&self) -> &'p GroupKind { self.kind }
    pub fn structure(&self) -> &'p GroupStructure { self.structure }

    fn check_len(&self, actual: usize, expected: usize) -> Result<(), PopulationError> {
        if actual == expected {
            Ok(())
        } else {
            Err(PopulationError::LengthMismatch { kind: self.kind.clone(), expected, actual })
        }
    }

    fn check_persons<T>(&self, values: &[T]) -> Result<(), PopulationError> {
        self.check_len(values.len(), self.structure.person_count())
    }

    #[inline(always)]
    fn selected(&self, person: usize, roles: Option<&[Role]>) -> bool {
        roles.map_or(true, |roles| roles.contains(&self.structure.role_of(person)))
    }

    /// Folds person-level values into `init` per group, visiting only members with one of `roles`.
    fn fold<T: Copy, A: Copy>(
        &self,
        values: &[T],
        roles: Option<&[Role]>,
        init: A,
        step: impl Fn(A, T) -> A,
    ) -> Result<Vec<A>, PopulationError> {
        self.check_persons(values)?;
        let mut out = vec![init; self.structure.group_count()];
        for (person, &value) in values.iter().enumerate() {
            if self.selected(person, roles) {
                let slot = &mut out[self.structure.group_of(person)];
                *slot = step(*slot, value);
            }
        }
        Ok(out)
    }

    /// Sums member values into their group, optionally only over members holding `roles`.
    pub fn sum_by_entity(&self, values: &[f64], roles: Option<&[Role]>) -> Result<Vec<f64>, PopulationError> {
        self.fold(values, roles, 0.0, |acc, v| acc + v)
    }

    /// Per group, the value of the member holding `role`, or `default` when nobody does.
    pub fn filter_role<T: Copy>(&self, values: &[T], role: Role, default: T) -> Result<Vec<T>, PopulationError> {
        self.fold(values, Some(&[role]), default, |_, v| v)
    }

    /// [`filter_role`](Self::filter_role) for each of `roles`; `None` means every role present.
    pub fn split_by_role<T: Copy>(
        &self,
        values: &[T],
        roles: Option<&[Role]>,
        default: T,
    ) -> Result<BTreeMap<Role, Vec<T>>, PopulationError> {
        let roles = roles.map_or_else(|| self.structure.roles_present(), <[Role]>::to_vec);
        roles
            .into_iter()
            .map(|role| Ok((role, self.filter_role(values, role, default)?)))
            .collect()
    }

    /// True for groups where at least one selected member's value is true.
    pub fn any_by_roles(&self, values: &[bool], roles: Option<&[Role]>) -> Result<Vec<bool>, PopulationError> {
        self.fold(values, roles, false, |acc, v| acc || v)
    }

    /// Number of selected members per group whose mask is true.
    pub fn count_by_entity(&self, mask: &[bool], roles: Option<&[Role]>) -> Result<Vec<f64>, PopulationError> {
        self.fold(mask, roles, 0.0, |acc, v| if v { acc + 1.0 } else { acc })
    }

    /// Broadcasts group values down to members. With `Some(role)` only the member holding
    /// that role receives the group value; everyone else gets `neutral`.
    pub fn project_entity_to_person<T: Copy>(
        &self,
        values: &[T],
        role: Option<Role>,
        neutral: T,
    ) -> Result<Vec<T>, PopulationError> {
        self.check_len(values.len(), self.structure.group_count())?;
        let out = (0..self.structure.person_count())
            .map(|person| {
                if role.map_or(true, |r| r == self.structure.role_of(person)) {
                    values[self.structure.group_of(person)]
                } else {
                    neutral
                }
            })
            .collect();
        Ok(out)
    }

    /// Aggregates member values up to the group with `aggregation`.
    pub fn project_person_to_entity(
        &self,
        values: &Value,
        aggregation: Aggregation,
        roles: Option<&[Role]>,
    ) -> Result<Value, PopulationError> {
        match (values, aggregation) {
            (Value::Float(v), Aggregation::Sum) => Ok(self.sum_by_entity(v, roles)?.into()),
            (Value::Bool(v), Aggregation::Any) => Ok(self.any_by_roles(v, roles)?.into()),
            (Value::Bool(v), Aggregation::All) => Ok(self.fold(v, roles, true, |acc, x| acc && x)?.into()),
            (other, aggregation) => Err(PopulationError::UnsupportedAggregation {
                aggregation: aggregation.to_string(),
                value_type: other.value_type(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Population;

    /// Household 0: primary 10, partner 20, dependent 5. Household 1: a single primary 7.
    fn population() -> Population {
        Population::builder(4)
            .group("household", [(0, Role::Primary), (1, Role::Partner), (2, Role::Dependent(1))])
            .group("household", [(3, Role::Primary)])
            .build()
            .unwrap()
    }

    const INCOME: [f64; 4] = [10.0, 20.0, 5.0, 7.0];

    #[test]
    fn test_sum_by_entity() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        assert_eq!(proj.sum_by_entity(&INCOME, None).unwrap(), vec![35.0, 7.0]);
        assert_eq!(proj.sum_by_entity(&INCOME, Some(&Role::adults())).unwrap(), vec![30.0, 7.0]);
    }

    #[test]
    fn test_filter_role_missing_member_yields_default() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        assert_eq!(proj.filter_role(&INCOME, Role::Dependent(1), 0.0).unwrap(), vec![5.0, 0.0]);
        assert_eq!(proj.filter_role(&INCOME, Role::Partner, 0.0).unwrap(), vec![20.0, 0.0]);
    }

    #[test]
    fn test_split_by_role() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        let split = proj.split_by_role(&INCOME, None, -1.0).unwrap();
        assert_eq!(split.keys().copied().collect::<Vec<_>>(), vec![Role::Primary, Role::Partner, Role::Dependent(1)]);
        assert_eq!(split[&Role::Primary], vec![10.0, 7.0]);
        assert_eq!(split[&Role::Dependent(1)], vec![5.0, -1.0]);

        let kids = proj.split_by_role(&INCOME, Some(Role::dependents(2).as_slice()), 0.0).unwrap();
        assert_eq!(kids[&Role::Dependent(2)], vec![0.0, 0.0]);
    }

    #[test]
    fn test_boolean_aggregations() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        let flags = Value::from(vec![false, true, false, false]);
        assert_eq!(proj.project_person_to_entity(&flags, Aggregation::Any, None).unwrap(), Value::from(vec![true, false]));
        assert_eq!(proj.project_person_to_entity(&flags, Aggregation::All, None).unwrap(), Value::from(vec![false, false]));
        // No dependent in household 1: `All` over nobody is vacuously true.
        let deps = [Role::Dependent(1)];
        assert_eq!(
            proj.project_person_to_entity(&Value::from(vec![true; 4]), Aggregation::All, Some(&deps)).unwrap(),
            Value::from(vec![true, true])
        );
        assert!(matches!(
            proj.project_person_to_entity(&flags, Aggregation::Sum, None),
            Err(PopulationError::UnsupportedAggregation { .. })
        ));
        assert_eq!(proj.count_by_entity(&[true, true, false, true], None).unwrap(), vec![2.0, 1.0]);
    }

    #[test]
    fn test_entity_to_person() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        let rent = [900.0, 400.0];
        assert_eq!(proj.project_entity_to_person(&rent, Some(Role::Primary), 0.0).unwrap(), vec![900.0, 0.0, 0.0, 400.0]);
        assert_eq!(proj.project_entity_to_person(&rent, None, 0.0).unwrap(), vec![900.0, 900.0, 900.0, 400.0]);
    }

    #[test]
    fn test_length_is_checked() {
        let pop = population();
        let kind = GroupKind::from("household");
        let proj = pop.projection(&kind).unwrap();
        assert!(matches!(
            proj.sum_by_entity(&[1.0, 2.0], None),
            Err(PopulationError::LengthMismatch { expected: 4, actual: 2, .. })
        ));
    }
}

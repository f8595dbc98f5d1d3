//! Persons, the groups they belong to, and the role each holds.

use super::{EntityKind, GroupKind, PopulationError, Projection, Role};
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// Membership of every person in the groups of one kind.
#[derive(Debug, Clone, Default)]
pub struct GroupStructure {
    group_of: Vec<u32>,
    role_of: Vec<Role>,
    members: Vec<SmallVec<[u32; 4]>>,
}

impl GroupStructure {
    pub fn group_count(&self) -> usize { self.members.len() }
    pub fn person_count(&self) -> usize { self.group_of.len() }

    #[inline(always)]
    pub fn group_of(&self, person: usize) -> usize { self.group_of[person] as usize }

    #[inline(always)]
    pub fn role_of(&self, person: usize) -> Role { self.role_of[person] }

    /// Members of `group` in the order they were declared.
    pub fn members(&self, group: usize) -> impl Iterator<Item = usize> + '_ {
        self.members[group].iter().map(|&p| p as usize)
    }

    pub fn member_with_role(&self, group: usize, role: Role) -> Option<usize> {
        self.members(group).find(|&p| self.role_of(p) == role)
    }

    /// Every role held by at least one member, in role order.
    pub fn roles_present(&self) -> Vec<Role> {
        let mut roles = self.role_of.clone();
        roles.sort();
        roles.dedup();
        roles
    }
}

/// The entities of one simulation run. Structure is fixed once built; runs only borrow it.
#[derive(Debug, Clone)]
pub struct Population {
    persons: usize,
    groups: BTreeMap<GroupKind, GroupStructure>,
}

impl Population {
    pub fn builder(persons: usize) -> PopulationBuilder {
        PopulationBuilder { persons, pending: BTreeMap::new() }
    }

    pub fn persons(&self) -> usize { self.persons }

    pub fn group(&self, kind: &GroupKind) -> Option<&GroupStructure> {
        self.groups.get(kind)
    }

    pub fn group_kinds(&self) -> impl Iterator<Item = &GroupKind> {
        self.groups.keys()
    }

    /// Number of slots a variable over `entity` has in this population.
    pub fn count(&self, entity: &EntityKind) -> Option<usize> {
        match entity {
            EntityKind::Person => Some(self.persons),
            EntityKind::Group(kind) => self.group(kind).map(GroupStructure::group_count),
        }
    }

    pub fn projection(&self, kind: &GroupKind) -> Result<Projection<'_>, PopulationError> {
        self.groups
            .get_key_value(kind)
            .map(|(kind, structure)| Projection::new(kind, structure))
            .ok_or_else(|| PopulationError::UnknownGroupKind { kind: kind.clone() })
    }
}

#[derive(Debug, Clone)]
pub struct PopulationBuilder {
    persons: usize,
    pending: BTreeMap<GroupKind, Vec<Vec<(usize, Role)>>>,
}

impl PopulationBuilder {
    /// Declares one group of `kind` with its `(person, role)` members.
    pub fn group(mut self, kind: impl Into<GroupKind>, members: impl IntoIterator<Item = (usize, Role)>) -> Self {
        self.pending.entry(kind.into()).or_default().push(members.into_iter().collect());
        self
    }

    pub fn build(self) -> Result<Population, PopulationError> {
        let persons = self.persons;
        let mut groups = BTreeMap::new();
        for (kind, declared) in self.pending {
            let structure = Self::build_structure(&kind, persons, declared)?;
            groups.insert(kind, structure);
        }
        Ok(Population { persons, groups })
    }

    fn build_structure(
        kind: &GroupKind,
        persons: usize,
        declared: Vec<Vec<(usize, Role)>>,
    ) -> Result<GroupStructure, PopulationError> {
        let mut group_of: Vec<Option<u32>> = vec![None; persons];
        let mut role_of = vec![Role::Primary; persons];
        let mut members = Vec::with_capacity(declared.len());

        for (group, list) in declared.into_iter().enumerate() {
            if list.is_empty() {
                return Err(PopulationError::EmptyGroup { kind: kind.clone(), group });
            }
            let mut seen: SmallVec<[Role; 4]> = SmallVec::new();
            let mut ids: SmallVec<[u32; 4]> = SmallVec::new();
            for (person, role) in list {
                let slot = group_of
                    .get_mut(person)
                    .ok_or(PopulationError::UnknownPerson { person, persons })?;
                if slot.is_some() {
                    return Err(PopulationError::AlreadyAssigned { person, kind: kind.clone() });
                }
                if role == Role::Dependent(0) {
                    return Err(PopulationError::InvalidRole { kind: kind.clone(), group, role });
                }
                if seen.contains(&role) {
                    return Err(PopulationError::DuplicateRole { kind: kind.clone(), group, role });
                }
                *slot = Some(group as u32);
                role_of[person] = role;
                seen.push(role);
                ids.push(person as u32);
            }
            members.push(ids);
        }

        let group_of = group_of
            .into_iter()
            .enumerate()
            .map(|(person, g)| g.ok_or_else(|| PopulationError::Unassigned { person, kind: kind.clone() }))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(GroupStructure { group_of, role_of, members })
    }
}

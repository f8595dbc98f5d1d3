use super::error::RegistryError;
use super::types::*;
use super::{OutsidePolicy, Variable, Variant};
use crate::period::Period;
use std::collections::HashMap;
use tracing::debug;

/// The set of variables a simulation can compute. Built once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    variables: Vec<Variable>,
    by_name: HashMap<String, VariableId>,
}

/// How a request for a variable over a period is served.
#[derive(Debug, Clone, Copy)]
pub enum Dispatch<'r> {
    /// Read the supplied value, or the default when none was supplied.
    Input,
    Variant(&'r Variant),
    /// Outside the variable's window, or outside every variant under `UseDefault`.
    Default,
    /// No variant applies and the variable has no fallback.
    Missing,
}

impl Registry {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.variables.len() }
    pub fn is_empty(&self) -> bool { self.variables.is_empty() }

    pub fn register(&mut self, mut variable: Variable) -> Result<VariableId, RegistryError> {
        let name = variable.name().to_string();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateVariable { name });
        }
        if variable.default.value_type() != variable.value_type {
            return Err(RegistryError::DefaultTypeMismatch {
                name,
                expected: variable.value_type,
                actual: variable.default.value_type(),
            });
        }
        if let Some((start, Some(stop))) = variable.window {
            if stop < start {
                return Err(RegistryError::InvalidWindow { name, start, stop });
            }
        }
        if variable.variants.is_empty() && !variable.is_input {
            return Err(RegistryError::NoVariants { name });
        }

        variable.variants.sort_by_key(Variant::start);
        for v in &variable.variants {
            if let Some(stop) = v.stop().filter(|stop| *stop < v.start()) {
                return Err(RegistryError::InvertedVariant { name, start: v.start(), stop });
            }
        }
        // Sorted by start, so any overlap shows up between neighbours.
        for pair in variable.variants.windows(2) {
            if pair[0].overlaps(&pair[1]) {
                return Err(RegistryError::OverlappingVariant {
                    name,
                    first: pair[0].start(),
                    second: pair[1].start(),
                });
            }
        }

        for v in &variable.variants {
            if let Some(expected) = v.body().target_entity().filter(|e| e != variable.entity()) {
                return Err(RegistryError::ProjectionEntityMismatch {
                    name,
                    expected,
                    actual: variable.entity().clone(),
                });
            }
        }

        let id = VariableId::new(self.variables.len());
        debug!(variable = %name, id = id.0, variants = variable.variants.len(), "registered variable");
        self.by_name.insert(name, id);
        self.variables.push(variable);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Option<VariableId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(id.index())
    }

    /// Resolves a name or token to the variable it designates.
    pub fn lookup<R: VariableRef + ?Sized>(&self, variable: &R) -> Result<(VariableId, &Variable), RegistryError> {
        let id = variable.resolve(self)?;
        let var = self.get(id).ok_or_else(|| RegistryError::UnknownVariable { name: format!("#{}", id.0) })?;
        Ok((id, var))
    }

    /// The variant whose interval contains the start of `period`.
    pub fn select_variant<R: VariableRef + ?Sized>(&self, variable: &R, period: Period) -> Result<&Variant, RegistryError> {
        let (_, var) = self.lookup(variable)?;
        var.variant_at(period.start()).ok_or_else(|| RegistryError::NoApplicableVariant {
            name: var.name().to_string(),
            period,
        })
    }

    pub fn default_value<R: VariableRef + ?Sized>(&self, variable: &R) -> Result<Scalar, RegistryError> {
        Ok(self.lookup(variable)?.1.default_value())
    }

    pub fn dispatch(&self, id: VariableId, period: Period) -> Dispatch<'_> {
        let Some(var) = self.get(id) else { return Dispatch::Missing };
        let date = period.start();
        if var.is_input() {
            Dispatch::Input
        } else if !var.is_active(date) {
            Dispatch::Default
        } else if let Some(variant) = var.variant_at(date) {
            Dispatch::Variant(variant)
        } else if var.outside_policy() == OutsidePolicy::UseDefault {
            Dispatch::Default
        } else {
            Dispatch::Missing
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(Variable::name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &Variable)> {
        self.variables.iter().enumerate().map(|(i, v)| (VariableId::new(i), v))
    }
}

/// Anything that designates a registered variable: its name or its token.
pub trait VariableRef {
    fn resolve(&self, registry: &Registry) -> Result<VariableId, RegistryError>;
}

impl VariableRef for VariableId {
    fn resolve(&self, registry: &Registry) -> Result<VariableId, RegistryError> {
        if self.index() < registry.len() {
            Ok(*self)
        } else {
            Err(RegistryError::UnknownVariable { name: format!("#{}", self.0) })
        }
    }
}

impl VariableRef for str {
    fn resolve(&self, registry: &Registry) -> Result<VariableId, RegistryError> {
        registry.id(self).ok_or_else(|| RegistryError::UnknownVariable { name: self.to_string() })
    }
}

impl VariableRef for String {
    fn resolve(&self, registry: &Registry) -> Result<VariableId, RegistryError> {
        self.as_str().resolve(registry)
    }
}

impl<T: VariableRef + ?Sized> VariableRef for &T {
    fn resolve(&self, registry: &Registry) -> Result<VariableId, RegistryError> {
        (**self).resolve(registry)
    }
}

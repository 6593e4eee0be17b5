//! Component identifier registry.
//!
//! Assigns every composite type a stable textual id, unique across the
//! registry. The base id is the type's simple name, or for generic
//! instantiations `Outer«A,B»` built recursively from the arguments' base
//! ids in declaration order. When two distinct types want the same base id
//! the later one gets `{base}_dup{N}`, taking the smallest free `N` from 1.
//!
//! The registry is shared by concurrent generation calls: lookups take a
//! read lock, claims and releases take the write lock for the whole
//! check-then-insert sequence.

use crate::diagnostics::{DiagnosticCode, DiagnosticEvent, DiagnosticSink, Severity};
use crate::error::GenerationError;
use crate::types::{TypeHandle, TypeIdentity, TypeIntrospector};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

const DUP_SEPARATOR: &str = "_dup";

/// Base id for `ty` before collision handling
pub fn base_id(types: &dyn TypeIntrospector, ty: TypeHandle) -> Result<String, GenerationError> {
    let desc = types.describe(ty).ok_or(GenerationError::UnknownType(ty))?;
    if desc.generic_args.is_empty() {
        return Ok(desc.name.clone());
    }
    let args = desc
        .generic_args
        .iter()
        .map(|arg| base_id(types, *arg))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("{}«{}»", desc.name, args.join(",")))
}

#[derive(Debug, Clone)]
struct Assignment {
    base: String,
    id: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    by_type: HashMap<TypeIdentity, Assignment>,
    owners: BTreeMap<String, TypeIdentity>,
    /// Claimants of each base id, in claim order
    claimants: BTreeMap<String, Vec<TypeIdentity>>,
}

/// One base id and the types that claimed it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistryEntry {
    pub base: String,
    /// `(identity, assigned id)` in claim order
    pub claimants: Vec<(TypeIdentity, String)>,
}

pub struct IdentifierRegistry {
    state: RwLock<RegistryState>,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for IdentifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentifierRegistry")
            .field("len", &self.len())
            .finish()
    }
}

impl IdentifierRegistry {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        IdentifierRegistry {
            state: RwLock::new(RegistryState::default()),
            sink,
        }
    }

    /// Id for `ty`, assigning one on first sight
    pub fn assign(
        &self,
        types: &dyn TypeIntrospector,
        ty: TypeHandle,
    ) -> Result<String, GenerationError> {
        let desc = types.describe(ty).ok_or(GenerationError::UnknownType(ty))?;
        if let Some(id) = self.lookup(&desc.identity) {
            return Ok(id);
        }
        let base = base_id(types, ty)?;
        Ok(self.claim(&desc.identity, &base))
    }

    /// Claim `base` on behalf of `identity`. Idempotent per identity.
    pub fn claim(&self, identity: &TypeIdentity, base: &str) -> String {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(existing) = state.by_type.get(identity) {
            return existing.id.clone();
        }

        let id = if state.owners.contains_key(base) {
            let mut counter = 1u64;
            let candidate = loop {
                let candidate = format!("{base}{DUP_SEPARATOR}{counter}");
                match state.owners.get(&candidate) {
                    None => break candidate,
                    Some(owner) if owner == identity => break candidate,
                    Some(_) => counter += 1,
                }
            };
            let previous = state.owners.get(base).map(|o| o.to_string());
            self.sink.emit(
                DiagnosticEvent::new(
                    Severity::Info,
                    DiagnosticCode::IdCollision,
                    format!("id '{base}' already taken; '{identity}' registered as '{candidate}'"),
                )
                .with_context(json!({
                    "base": base,
                    "assigned": candidate,
                    "identity": identity.as_str(),
                    "owner": previous,
                })),
            );
            candidate
        } else {
            base.to_string()
        };

        state.owners.insert(id.clone(), identity.clone());
        state
            .claimants
            .entry(base.to_string())
            .or_default()
            .push(identity.clone());
        state.by_type.insert(
            identity.clone(),
            Assignment {
                base: base.to_string(),
                id: id.clone(),
            },
        );
        id
    }

    pub fn lookup(&self, identity: &TypeIdentity) -> Option<String> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.by_type.get(identity).map(|a| a.id.clone())
    }

    /// Release the id held by `identity`; returns the freed id.
    ///
    /// The slot becomes available to the next claimant of the same base.
    pub fn deregister(&self, identity: &TypeIdentity) -> Option<String> {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let assignment = state.by_type.remove(identity)?;
        state.owners.remove(&assignment.id);
        if let Some(list) = state.claimants.get_mut(&assignment.base) {
            list.retain(|claimant| claimant != identity);
            if list.is_empty() {
                state.claimants.remove(&assignment.base);
            }
        }
        Some(assignment.id)
    }

    /// Every claimed base id in lexical order
    pub fn entries(&self) -> Vec<RegistryEntry> {
        let state = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state
            .claimants
            .iter()
            .map(|(base, identities)| RegistryEntry {
                base: base.clone(),
                claimants: identities
                    .iter()
                    .filter_map(|identity| {
                        state
                            .by_type
                            .get(identity)
                            .map(|a| (identity.clone(), a.id.clone()))
                    })
                    .collect(),
            })
            .collect()
    }

    /// Assigned id to identity, in lexical id order
    pub fn assigned(&self) -> BTreeMap<String, TypeIdentity> {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .owners
            .clone()
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .by_type
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Structure tree: the region hierarchy of the reference ontology.
//!
//! Uses BTreeMap for deterministic iteration order.

use std::collections::{BTreeMap, HashMap};

use crate::error::{AdapterError, AdapterResult};
use crate::types::{RegionRef, Structure, StructureId};

/// Rooted hierarchy over structures, indexed by id and acronym.
#[derive(Debug, Clone, Default)]
pub struct StructureTree {
    by_id: BTreeMap<StructureId, Structure>,
    by_acronym: HashMap<String, StructureId>,
}

impl StructureTree {
    /// Build a tree from a flat list of structures.
    ///
    /// Structures that only carry a parent id get their `structure_id_path`
    /// rebuilt by walking the parents.
    pub fn new(structures: Vec<Structure>) -> Self {
        let mut by_id: BTreeMap<StructureId, Structure> =
            structures.into_iter().map(|s| (s.id, s)).collect();

        let rebuilt: Vec<(StructureId, Vec<StructureId>)> = by_id
            .values()
            .filter(|s| s.structure_id_path.len() <= 1 && s.parent_structure_id.is_some())
            .map(|s| (s.id, Self::walk_path(&by_id, s)))
            .collect();
        for (id, path) in rebuilt {
            if let Some(s) = by_id.get_mut(&id) {
                s.structure_id_path = path;
            }
        }

        let by_acronym = by_id.values().map(|s| (s.acronym.clone(), s.id)).collect();
        Self { by_id, by_acronym }
    }

    fn walk_path(by_id: &BTreeMap<StructureId, Structure>, s: &Structure) -> Vec<StructureId> {
        let mut path = vec![s.id];
        let mut current = s.parent_structure_id;
        // bounded by the tree size so a cyclic parent chain cannot loop forever
        while let Some(pid) = current {
            if path.len() > by_id.len() || path.contains(&pid) {
                break;
            }
            path.push(pid);
            current = by_id.get(&pid).and_then(|p| p.parent_structure_id);
        }
        path.reverse();
        path
    }

    /// Number of structures.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// True if the tree is empty.
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All structures, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.by_id.values()
    }

    /// Look up by id.
    pub fn get_by_id(&self, id: StructureId) -> Option<&Structure> {
        self.by_id.get(&id)
    }

    /// Look up by acronym (exact match).
    pub fn get_by_acronym(&self, acronym: &str) -> Option<&Structure> {
        self.by_acronym.get(acronym).and_then(|id| self.by_id.get(id))
    }

    /// Resolve a region reference, failing with `UnknownRegion`.
    pub fn resolve(&self, region: &RegionRef) -> AdapterResult<&Structure> {
        let found = match region {
            RegionRef::Id(id) => self.get_by_id(*id),
            RegionRef::Acronym(a) => self.get_by_acronym(a),
        };
        found.ok_or_else(|| AdapterError::UnknownRegion(region.to_string()))
    }

    /// Direct parent.
    pub fn parent(&self, id: StructureId) -> Option<&Structure> {
        self.by_id
            .get(&id)
            .and_then(|s| s.parent_structure_id)
            .and_then(|pid| self.by_id.get(&pid))
    }

    /// Ancestors from the root down, excluding the structure itself.
    pub fn ancestors(&self, id: StructureId) -> Vec<&Structure> {
        let Some(s) = self.by_id.get(&id) else {
            return Vec::new();
        };
        s.structure_id_path
            .iter()
            .filter(|&&aid| aid != id)
            .filter_map(|aid| self.by_id.get(aid))
            .collect()
    }

    /// All descendants, ordered by depth then id.
    pub fn descendants(&self, id: StructureId) -> Vec<&Structure> {
        let mut out: Vec<&Structure> = self
            .by_id
            .values()
            .filter(|s| s.id != id && s.structure_id_path.contains(&id))
            .collect();
        out.sort_by_key(|s| (s.structure_id_path.len(), s.id));
        out
    }
}

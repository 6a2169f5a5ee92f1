//! Read-only module graph.
//!
//! Modules live in an arena and are addressed by [`ModuleId`]; edges are kept
//! in a flat list with a per-module adjacency index. Once built, the graph is
//! never mutated, so it can be shared as `&ModuleGraph` across threads.

use std::collections::HashMap;

use apex_schema::{LinkKind, Module, ModuleId, Target};

/// A directed edge between two modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub from: ModuleId,
    pub to: ModuleId,
    pub link: LinkKind,
    /// The build graph places `to` outside of `from`'s container.
    pub crosses_boundary: bool,
}

#[derive(Debug, Default)]
pub struct ModuleGraph {
    modules: Vec<Module>,
    edges: Vec<Edge>,
    outgoing: Vec<Vec<usize>>,
    by_name: HashMap<String, Vec<ModuleId>>,
}

impl ModuleGraph {
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ModuleId> + '_ {
        (0..self.modules.len()).map(|i| ModuleId(i as u32))
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &Module)> {
        self.modules
            .iter()
            .enumerate()
            .map(|(i, m)| (ModuleId(i as u32), m))
    }

    /// Outgoing edges of `id`, in insertion order.
    pub fn edges_from(&self, id: ModuleId) -> impl Iterator<Item = &Edge> {
        self.outgoing
            .get(id.index())
            .into_iter()
            .flatten()
            .map(|&e| &self.edges[e])
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Every variant registered under `name`.
    pub fn variants(&self, name: &str) -> &[ModuleId] {
        self.by_name.get(name).map_or(&[], Vec::as_slice)
    }

    /// Find the variant of `name` built for `target`, falling back to the
    /// common (target-less) variant.
    ///
    /// With `source_only`, prebuilt variants are never returned.
    pub fn find_variant(
        &self,
        name: &str,
        target: Option<&Target>,
        source_only: bool,
    ) -> Option<ModuleId> {
        let candidates: Vec<ModuleId> = self
            .variants(name)
            .iter()
            .copied()
            .filter(|&id| !source_only || !self.module(id).caps.prebuilt)
            .collect();

        if let Some(target) = target {
            if let Some(&id) = candidates
                .iter()
                .find(|&&id| self.module(id).target.as_ref() == Some(target))
            {
                return Some(id);
            }
        }
        candidates
            .iter()
            .copied()
            .find(|&id| self.module(id).target.is_none())
    }
}

/// Incremental construction of a [`ModuleGraph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    modules: Vec<Module>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(module);
        id
    }

    pub fn add_edge(&mut self, from: ModuleId, to: ModuleId, link: LinkKind) -> &mut Self {
        self.add_edge_with(from, to, link, false)
    }

    pub fn add_edge_with(
        &mut self,
        from: ModuleId,
        to: ModuleId,
        link: LinkKind,
        crosses_boundary: bool,
    ) -> &mut Self {
        self.edges.push(Edge {
            from,
            to,
            link,
            crosses_boundary,
        });
        self
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.index()]
    }

    pub fn build(self) -> ModuleGraph {
        let mut outgoing = vec![Vec::new(); self.modules.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            outgoing[edge.from.index()].push(i);
        }
        let mut by_name: HashMap<String, Vec<ModuleId>> = HashMap::new();
        for (i, m) in self.modules.iter().enumerate() {
            by_name
                .entry(m.name.clone())
                .or_default()
                .push(ModuleId(i as u32));
        }
        ModuleGraph {
            modules: self.modules,
            edges: self.edges,
            outgoing,
            by_name,
        }
    }
}

/// Decides whether an edge leaves the container it starts in.
pub trait ContainerBoundary: Sync {
    /// `true` if `edge.to` is outside the container `edge.from` belongs to.
    fn is_external(&self, graph: &ModuleGraph, edge: &Edge) -> bool;
}

/// The default boundary: shared and runtime links into a stub-providing
/// library are external, everything else follows the edge's flag.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeBoundary;

impl ContainerBoundary for EdgeBoundary {
    fn is_external(&self, graph: &ModuleGraph, edge: &Edge) -> bool {
        let to = graph.module(edge.to);
        if edge.link.is_shared() && (to.caps.has_stubs_variants || to.caps.is_stubs) {
            return true;
        }
        edge.crosses_boundary
    }
}

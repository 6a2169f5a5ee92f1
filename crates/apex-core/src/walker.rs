//! Depth-first closure walk over the module graph.
//!
//! The walk starts at a container's direct dependencies and asks a visitor,
//! edge by edge, whether to expand the module it reached. Excluded links and
//! disabled modules are never shown to the visitor. A module is expanded at
//! most once per walk, so cycles terminate.

use std::collections::HashSet;

use apex_schema::{EdgeTag, ModuleId};

use crate::graph::{Edge, ModuleGraph};
use crate::variants::DirectDep;

/// What to do after visiting an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Do not look at the child's edges.
    Stop,
    /// Expand the child's outgoing edges.
    Descend,
    /// The edge leaves the container; note it and do not expand.
    BoundaryOnly,
}

/// One hop on the path from the container to the current module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathHop {
    pub module: ModuleId,
    pub tag: EdgeTag,
}

/// An edge presented to the visitor.
#[derive(Debug, Clone, Copy)]
pub struct WalkStep<'a> {
    /// `None` for the container's direct edges.
    pub parent: Option<ModuleId>,
    pub child: ModuleId,
    pub tag: EdgeTag,
    /// The container's declaration of a direct edge.
    pub root: Option<&'a DirectDep>,
    /// The module-to-module edge, absent for direct edges.
    pub edge: Option<&'a Edge>,
    /// Hops from the container down to `child`, inclusive.
    pub path: &'a [PathHop],
}

impl WalkStep<'_> {
    pub fn is_direct(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    /// Modules whose edges were expanded, in expansion order.
    pub expanded: Vec<ModuleId>,
    /// Edges the visitor reported as leaving the container.
    pub boundary_hits: usize,
}

/// Walk the closure of `roots`, calling `visit` for every reachable edge.
pub fn walk<F>(graph: &ModuleGraph, roots: &[DirectDep], mut visit: F) -> WalkSummary
where
    F: FnMut(&WalkStep<'_>) -> Visit,
{
    let mut state = WalkState {
        graph,
        expanded: HashSet::new(),
        summary: WalkSummary::default(),
        path: Vec::new(),
    };

    for dep in roots {
        if !graph.module(dep.module).caps.enabled {
            continue;
        }
        let tag = EdgeTag::Container(dep.role);
        state.path.push(PathHop {
            module: dep.module,
            tag,
        });
        let step = WalkStep {
            parent: None,
            child: dep.module,
            tag,
            root: Some(dep),
            edge: None,
            path: &state.path,
        };
        let decision = visit(&step);
        state.apply(dep.module, decision, &mut visit);
        state.path.pop();
    }
    state.summary
}

struct WalkState<'g> {
    graph: &'g ModuleGraph,
    expanded: HashSet<ModuleId>,
    summary: WalkSummary,
    path: Vec<PathHop>,
}

impl<'g> WalkState<'g> {
    fn apply<F>(&mut self, module: ModuleId, decision: Visit, visit: &mut F)
    where
        F: FnMut(&WalkStep<'_>) -> Visit,
    {
        match decision {
            Visit::Stop => {}
            Visit::BoundaryOnly => self.summary.boundary_hits += 1,
            Visit::Descend => self.expand(module, visit),
        }
    }

    fn expand<F>(&mut self, module: ModuleId, visit: &mut F)
    where
        F: FnMut(&WalkStep<'_>) -> Visit,
    {
        if !self.expanded.insert(module) {
            return;
        }
        self.summary.expanded.push(module);

        let graph: &'g ModuleGraph = self.graph;
        for edge in graph.edges_from(module) {
            if edge.link.is_excluded() || !graph.module(edge.to).caps.enabled {
                continue;
            }
            let tag = EdgeTag::Module(edge.link);
            self.path.push(PathHop { module: edge.to, tag });
            let step = WalkStep {
                parent: Some(module),
                child: edge.to,
                tag,
                root: None,
                edge: Some(edge),
                path: &self.path,
            };
            let decision = visit(&step);
            self.apply(edge.to, decision, visit);
            self.path.pop();
        }
    }
}

/// Render a dependency path for diagnostics, e.g.
/// `com.android.foo -> bin1 (apex.executable) -> libbar (Static)`.
pub fn render_path(graph: &ModuleGraph, container: &str, path: &[PathHop]) -> String {
    let mut out = container.to_string();
    for hop in path {
        out.push_str(&format!(" -> {} ({})", graph.module(hop.module).name, hop.tag));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use apex_schema::{DepRole, LinkKind, Module, ModuleKind};

    fn lib(name: &str) -> Module {
        Module::new(name, ModuleKind::NativeLibrary {
            implementation_name: None,
        })
    }

    fn root(module: ModuleId) -> DirectDep {
        DirectDep {
            role: DepRole::SharedLib,
            property: "native_shared_libs",
            module,
        }
    }

    #[test]
    fn test_cycle_terminates_and_expands_once() {
        let mut b = GraphBuilder::new();
        let a = b.add_module(lib("liba"));
        let c = b.add_module(lib("libc"));
        b.add_edge(a, c, LinkKind::Shared);
        b.add_edge(c, a, LinkKind::Shared);
        let g = b.build();

        let mut visited = Vec::new();
        let summary = walk(&g, &[root(a)], |step| {
            visited.push(step.child);
            Visit::Descend
        });
        assert_eq!(summary.expanded, vec![a, c]);
        assert_eq!(visited, vec![a, c, a]);
    }

    #[test]
    fn test_excluded_links_and_disabled_modules_are_skipped() {
        let mut b = GraphBuilder::new();
        let a = b.add_module(lib("liba"));
        let req = b.add_module(lib("libreq"));
        let mut off = lib("liboff");
        off.caps.enabled = false;
        let off = b.add_module(off);
        let ok = b.add_module(lib("libok"));
        b.add_edge(a, req, LinkKind::Required);
        b.add_edge(a, req, LinkKind::ExcludeFromContents);
        b.add_edge(a, off, LinkKind::Shared);
        b.add_edge(a, ok, LinkKind::Shared);
        let g = b.build();

        let mut seen = Vec::new();
        walk(&g, &[root(a)], |step| {
            seen.push(g.module(step.child).name.clone());
            Visit::Descend
        });
        assert_eq!(seen, vec!["liba", "libok"]);
    }

    #[test]
    fn test_boundary_only_does_not_expand() {
        let mut b = GraphBuilder::new();
        let a = b.add_module(lib("liba"));
        let ext = b.add_module(lib("libext"));
        let deep = b.add_module(lib("libdeep"));
        b.add_edge(a, ext, LinkKind::Shared);
        b.add_edge(ext, deep, LinkKind::Shared);
        let g = b.build();

        let summary = walk(&g, &[root(a)], |step| {
            if step.child == ext {
                Visit::BoundaryOnly
            } else {
                Visit::Descend
            }
        });
        assert_eq!(summary.boundary_hits, 1);
        assert_eq!(summary.expanded, vec![a]);
    }

    #[test]
    fn test_path_rendering() {
        let mut b = GraphBuilder::new();
        let a = b.add_module(lib("liba"));
        let c = b.add_module(lib("libc"));
        b.add_edge(a, c, LinkKind::Static);
        let g = b.build();

        let mut rendered = Vec::new();
        walk(&g, &[root(a)], |step| {
            rendered.push(render_path(&g, "com.android.foo", step.path));
            Visit::Descend
        });
        assert_eq!(
            rendered[1],
            "com.android.foo -> liba (apex.sharedLib) -> libc (Static)"
        );
    }
}

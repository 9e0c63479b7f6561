//! Dependency and inheritance ordering over canonical names.
//!
//! ## Design
//!
//! Adjacency is harvested from the session once all declarations are in.
//! Both orders come from the same walk: a breadth-first traversal that
//! re-enqueues already-seen nodes (so a shared dependency sinks below its
//! last dependent), then a dedupe keeping each node's last occurrence,
//! then a reversal. The result lists every reachable node after everything
//! it depends on. Re-enqueueing is bounded by the node count, which makes
//! diamonds terminate exactly and breaks cycles deterministically; cycles
//! are additionally reported through a depth-first check.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::session::Session;

#[derive(Debug, Default)]
pub struct TypeGraph {
    deps: HashMap<String, Vec<String>>,
    extends: HashMap<String, Vec<String>>,
    extends_seeds: Vec<String>,
}

impl TypeGraph {
    pub fn from_session(session: &Session) -> Self {
        let mut graph = TypeGraph::default();
        for decl in session.declarations() {
            graph
                .deps
                .entry(decl.canonical.clone())
                .or_default()
                .extend(decl.dependencies.iter().cloned());
            if !decl.extends.is_empty() {
                graph
                    .extends
                    .insert(decl.canonical.clone(), decl.extends.clone());
                graph.extends_seeds.push(decl.canonical.clone());
            }
        }
        graph
    }

    /// Record a dependency edge after construction. The splicer uses this
    /// to carry a merged base's dependencies over to the derived interface.
    pub fn add_dependency(&mut self, owner: &str, dep: &str) {
        let edges = self.deps.entry(owner.to_string()).or_default();
        if !edges.iter().any(|e| e == dep) {
            edges.push(dep.to_string());
        }
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.deps.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Order in which declarations are rendered into the type block:
    /// every declaration after the declarations it references.
    pub fn emission_order(&self, roots: &[String]) -> Vec<String> {
        if let Some(cycle) = find_cycle(&self.deps) {
            warn!(cycle = %cycle.join(" -> "), "dependency cycle, order is best-effort");
        }
        ordered_walk(&self.deps, roots)
    }

    /// Order in which inheritance bases are folded into derived bodies:
    /// deepest base first, so a chain merges transitively.
    pub fn merge_order(&self) -> Vec<String> {
        if let Some(cycle) = find_cycle(&self.extends) {
            warn!(cycle = %cycle.join(" -> "), "inheritance cycle, merging is best-effort");
        }
        ordered_walk(&self.extends, &self.extends_seeds)
    }
}

/// Bounded re-enqueue BFS, then keep-last-occurrence, then reverse.
fn ordered_walk(adj: &HashMap<String, Vec<String>>, seeds: &[String]) -> Vec<String> {
    let mut universe: HashSet<&str> = adj.keys().map(String::as_str).collect();
    for targets in adj.values() {
        universe.extend(targets.iter().map(String::as_str));
    }
    universe.extend(seeds.iter().map(String::as_str));
    let bound = universe.len().max(1);

    let mut enqueued: HashMap<&str, usize> = HashMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for seed in seeds {
        *enqueued.entry(seed.as_str()).or_insert(0) += 1;
        queue.push_back(seed.as_str());
    }

    let mut visits: Vec<&str> = Vec::new();
    while let Some(node) = queue.pop_front() {
        visits.push(node);
        if let Some(targets) = adj.get(node) {
            for target in targets {
                let count = enqueued.entry(target.as_str()).or_insert(0);
                if *count < bound {
                    *count += 1;
                    queue.push_back(target.as_str());
                }
            }
        }
    }

    // Keep each node's last visit, then reverse: dependencies come first.
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for node in visits.iter().rev() {
        if seen.insert(node) {
            out.push((*node).to_string());
        }
    }
    out
}

/// Depth-first cycle search, returned as the node path around the loop.
fn find_cycle(adj: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Visiting,
        Done,
    }

    fn dfs<'a>(
        node: &'a str,
        adj: &'a HashMap<String, Vec<String>>,
        state: &mut HashMap<&'a str, State>,
        path: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        state.insert(node, State::Visiting);
        path.push(node);
        for target in adj.get(node).map(Vec::as_slice).unwrap_or(&[]) {
            match state.get(target.as_str()) {
                Some(State::Visiting) => {
                    let start = path
                        .iter()
                        .position(|n| *n == target.as_str())
                        .unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(target.clone());
                    return Some(cycle);
                }
                Some(State::Done) => {}
                None => {
                    if let Some(cycle) = dfs(target.as_str(), adj, state, path) {
                        return Some(cycle);
                    }
                }
            }
        }
        path.pop();
        state.insert(node, State::Done);
        None
    }

    let mut state = HashMap::new();
    let mut keys: Vec<&String> = adj.keys().collect();
    keys.sort();
    for key in keys {
        if !state.contains_key(key.as_str()) {
            let mut path = Vec::new();
            if let Some(cycle) = dfs(key.as_str(), adj, &mut state, &mut path) {
                return Some(cycle);
            }
        }
    }
    None
}

use crate::compute::CacheKey;
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::{HashSet, VecDeque};

/// Dependencies observed during one run. An edge `a -> b` means `a` requested `b`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<CacheKey, ()>,
}

impl DependencyGraph {
    pub fn new() -> Self { Self::default() }

    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn contains(&self, key: CacheKey) -> bool { self.graph.contains_node(key) }

    pub fn add_key(&mut self, key: CacheKey) {
        self.graph.add_node(key);
    }

    pub fn record(&mut self, consumer: CacheKey, dependency: CacheKey) {
        self.graph.add_edge(consumer, dependency, ());
    }

    /// Direct dependencies of `key`, in the order they were first requested.
    pub fn dependencies(&self, key: CacheKey) -> Vec<CacheKey> {
        self.graph.neighbors_directed(key, Direction::Outgoing).collect()
    }

    pub fn consumers(&self, key: CacheKey) -> Vec<CacheKey> {
        self.graph.neighbors_directed(key, Direction::Incoming).collect()
    }

    /// Everything the given keys transitively depend on, themselves included.
    pub fn upstream_from(&self, start: &[CacheKey]) -> HashSet<CacheKey> {
        self.walk(start, Direction::Outgoing)
    }

    /// Everything that transitively depends on the given keys, themselves included.
    pub fn downstream_from(&self, start: &[CacheKey]) -> HashSet<CacheKey> {
        self.walk(start, Direction::Incoming)
    }

    fn walk(&self, start: &[CacheKey], direction: Direction) -> HashSet<CacheKey> {
        let mut visited = HashSet::new();
        let mut queue: VecDeque<CacheKey> = start.iter().copied().filter(|k| self.contains(*k)).collect();
        while let Some(key) = queue.pop_front() {
            if visited.insert(key) {
                queue.extend(self.graph.neighbors_directed(key, direction));
            }
        }
        visited
    }

    /// Every recorded key with dependencies before their consumers.
    ///
    /// Fails with a key on a cycle; the evaluator refuses cyclic requests, so a recorded
    /// graph never has one.
    pub fn evaluation_order(&self) -> Result<Vec<CacheKey>, CacheKey> {
        let mut order = petgraph::algo::toposort(&self.graph, None).map_err(|cycle| cycle.node_id())?;
        order.reverse();
        Ok(order)
    }
}

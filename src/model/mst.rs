//! # Minimum Spanning Tree
//!
//! Kruskal's algorithm over an adjacency-map graph. Determinism matters:
//! edges are collected in key order, the sort is stable, and union-find
//! does not use path compression, so equal-weight edges always resolve
//! the same way.

use std::collections::BTreeMap;

/// Adjacency map: node id to (neighbor, weight) list
pub type Graph = BTreeMap<usize, Vec<(usize, usize)>>;

/// Union-find with union by height and no path compression
struct UnionFind {
    parents: BTreeMap<usize, usize>,
    heights: BTreeMap<usize, usize>,
}

impl UnionFind {
    fn new(nodes: &[usize]) -> Self {
        let parents = nodes.iter().map(|&v| (v, v)).collect();
        let heights = nodes.iter().map(|&v| (v, 1)).collect();
        Self { parents, heights }
    }

    fn root(&self, v0: usize) -> usize {
        let mut v = v0;
        loop {
            let parent = self.parents[&v];
            if parent == v {
                return v;
            }
            v = parent;
        }
    }

    fn join(&mut self, v1: usize, v2: usize) {
        let r1 = self.root(v1);
        let r2 = self.root(v2);
        let h1 = self.heights[&r1];
        let h2 = self.heights[&r2];
        if h1 <= h2 {
            self.parents.insert(r1, r2);
            self.heights.insert(r2, h2.max(h1 + 1));
        } else {
            self.parents.insert(r2, r1);
            self.heights.insert(r1, h1.max(h2 + 1));
        }
    }
}

/// Minimum spanning tree of `graph`, returned as an undirected adjacency
/// map (each selected edge appears in both endpoints' lists).
pub fn minimum_spanning_tree(graph: &Graph) -> Graph {
    let nodes: Vec<usize> = graph.keys().copied().collect();
    let mut tree = UnionFind::new(&nodes);

    // (v1 < v2) deduplicates the undirected input edges
    let mut edges: Vec<(usize, usize, usize)> = Vec::new();
    for (&v1, neighbors) in graph {
        for &(v2, w) in neighbors {
            if v1 < v2 {
                edges.push((v1, v2, w));
            }
        }
    }
    edges.sort_by_key(|&(_, _, w)| w);

    let mut new_graph = Graph::new();
    let mut counter = 0usize;
    for (v1, v2, w) in edges {
        if tree.root(v1) != tree.root(v2) {
            tree.join(v1, v2);
            new_graph.entry(v1).or_default().push((v2, w));
            new_graph.entry(v2).or_default().push((v1, w));
            counter += 1;
            if counter == nodes.len().saturating_sub(1) {
                break;
            }
        }
    }

    new_graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(usize, usize, usize)]) -> Graph {
        let mut g = Graph::new();
        for &(v1, v2, w) in edges {
            g.entry(v1).or_default().push((v2, w));
            g.entry(v2).or_default().push((v1, w));
        }
        g
    }

    fn edge_count(g: &Graph) -> usize {
        g.values().map(Vec::len).sum::<usize>() / 2
    }

    fn total_weight(g: &Graph) -> usize {
        g.values().flatten().map(|&(_, w)| w).sum::<usize>() / 2
    }

    #[test]
    fn test_triangle_tie_break() {
        // all weights equal: insertion order selects (1,2) then (1,3)
        let g = graph(&[(1, 2, 1), (1, 3, 1), (2, 3, 1)]);
        let mst = minimum_spanning_tree(&g);
        assert_eq!(edge_count(&mst), 2);
        assert!(mst[&1].contains(&(2, 1)));
        assert!(mst[&1].contains(&(3, 1)));
        assert!(!mst[&2].iter().any(|&(v, _)| v == 3));
    }

    #[test]
    fn test_spanning_tree_size_and_weight() {
        let g = graph(&[
            (0, 1, 4),
            (0, 2, 1),
            (1, 2, 2),
            (1, 3, 5),
            (2, 3, 8),
            (3, 4, 3),
            (2, 4, 9),
        ]);
        let mst = minimum_spanning_tree(&g);
        assert_eq!(edge_count(&mst), 4);
        // 0-2 (1), 1-2 (2), 3-4 (3), 1-3 (5)
        assert_eq!(total_weight(&mst), 11);
        for node in 0..5 {
            assert!(mst.contains_key(&node));
        }
    }

    #[test]
    fn test_output_is_undirected() {
        let g = graph(&[(0, 1, 2), (1, 2, 3)]);
        let mst = minimum_spanning_tree(&g);
        for (&v1, neighbors) in &mst {
            for &(v2, w) in neighbors {
                assert!(mst[&v2].contains(&(v1, w)));
            }
        }
    }

    #[test]
    fn test_single_node() {
        let mut g = Graph::new();
        g.insert(7, Vec::new());
        let mst = minimum_spanning_tree(&g);
        assert!(mst.is_empty());
    }
}

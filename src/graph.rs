//! Implementation of a simple, undirected graph data structure with basic static and dynamic
//! functions. Nodes are identified by ids `1..=n`, slot `0` is never used.

use fxhash::FxHashSet;
use std::io::BufRead;
use crate::cust_error::{ImportError, ProcessingError};
use rand::Rng;
use rand::seq::SliceRandom;

/// A simple undirected graph datastructure that supports dynamic behaviour.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct DyUGraph {
    adj_list: Vec<Option<FxHashSet<usize>>>,
}

// Static functions
impl DyUGraph {

    /// Creates a graph with the nodes `1..=n` and no edges.
    pub fn new(n: usize) -> Self {
        let mut adj_list = vec![Some(FxHashSet::default()); n + 1];
        adj_list[0] = None;
        DyUGraph {
            adj_list,
        }
    }

    /// Creates a graph with the nodes `1..=n` and the given edges. Edges with an endpoint outside
    /// of `1..=n` are ignored.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Self {
        let mut graph = DyUGraph::new(n);
        for (src, trg) in edges {
            graph.add_edge(*src, *trg);
        }
        graph
    }

    /// Returns an `Iterator` over all nodes that have not yet been deleted.
    pub fn nodes(&self) -> impl Iterator<Item=usize> + '_ {
        self.adj_list
            .iter()
            .enumerate()
            .filter_map(|(i,adj)| {
                if adj.is_some() {
                    Some(i)
                } else {
                    None
                }
            })
    }

    /// Returns the number of nodes of `self`.
    pub fn num_nodes(&self) -> usize {
        self.nodes().count()
    }

    /// Returns the amount of reserved slots of `self`, deleted or not, including the unused slot
    /// `0`. Every node id is smaller than this.
    pub fn num_reserved(&self) -> usize {
        self.adj_list.len()
    }

    /// Checks if `node` exists.
    pub fn has_node(&self, node: usize) -> bool {
        matches!(self.adj_list.get(node), Some(Some(_)))
    }

    /// Returns the neighborhood of `node`, or `None` if `node` was deleted.
    pub fn neighbors(&self, node: usize) -> &Option<FxHashSet<usize>> {
        &self.adj_list[node]
    }

    /// Returns the closed neighborhood of `node`, or `None` if `node` was deleted.
    pub fn closed_neighbors(&self, node: usize) -> Option<FxHashSet<usize>> {
        self.adj_list[node].as_ref().map(|neighs| {
            let mut closed = neighs.clone();
            closed.insert(node);
            closed
        })
    }

    /// Returns some neighbor of `node`.
    pub fn any_neighbor(&self, node: usize) -> Result<usize, ProcessingError> {
        match self.neighbors(node) {
            Some(neighs) => neighs.iter()
                .next()
                .copied()
                .ok_or(ProcessingError::EmptyNeighborhood(node)),
            None => Err(ProcessingError::GraphError(format!("node {} was deleted", node))),
        }
    }

    /// Returns the degree of `node`, or `None` if `node` was deleted.
    pub fn degree(&self, node: usize) -> Option<usize> {
        self.adj_list[node].as_ref().map(|neighbors| neighbors.len())
    }

    /// Returns the node with the highest degree.
    pub fn max_degree_node(&self) -> Option<usize> {
        self.nodes().max_by_key(|node| self.degree(*node).expect("`node` exists"))
    }

    /// Returns an iterator over all edges.
    pub fn edges(&self) -> impl Iterator<Item=(usize, usize)> + '_ {
        self.adj_list
            .iter()
            .enumerate()
            .filter(|(_,adj)| adj.is_some())
            .flat_map(|(i,adj)| {
                adj.as_ref().expect("`adj` is some")
                    .iter()
                    .filter_map(|neigh| {
                    if i < *neigh {
                        Some((i, *neigh))
                    } else {
                        None
                    }
                }).collect::<Vec<(usize, usize)>>()
            })
    }

    /// Returns the number of edges of `self`.
    pub fn num_edges(&self) -> usize {
        self.adj_list
            .iter()
            .flatten()
            .map(|neighs| neighs.len())
            .sum::<usize>() / 2
    }

    /// Checks if at least one edge remains.
    pub fn has_edges(&self) -> bool {
        self.adj_list.iter().flatten().any(|neighs| !neighs.is_empty())
    }

    /// Returns an edge chosen uniformly at random, or `None` if `self` has no edges.
    pub fn random_edge<R: Rng>(&self, rng: &mut R) -> Option<(usize, usize)> {
        let edges: Vec<(usize, usize)> = self.edges().collect();
        edges.choose(rng).copied()
    }

    /// Checks if `edge` exists.
    pub fn edge_exists(&self, edge: (usize, usize)) -> bool {
        if let Some(Some(neighs)) = self.adj_list.get(edge.0) {
            return neighs.contains(&edge.1)
        }
        false
    }

    /// Checks if `self` is empty (holds no undeleted nodes).
    pub fn is_empty(&self) -> bool {
        self.num_nodes() == 0
    }

}

// Dynamic functions
impl DyUGraph {

    /// Adds a new isolated node and returns its id. The id is larger than every existing id.
    pub fn add_node(&mut self) -> usize {
        self.adj_list.push(Some(FxHashSet::default()));
        self.adj_list.len() - 1
    }

    /// Adds the edge `{src, trg}`. Self-loops are dropped, since they never change which nodes
    /// are dominated.
    /// Returns `true` if a new edge was inserted.
    pub fn add_edge(&mut self, src: usize, trg: usize) -> bool {
        if src == trg || !self.has_node(src) || !self.has_node(trg) {
            return false
        }
        let fresh = self.adj_list[src].as_mut().expect("`src` exists").insert(trg);
        self.adj_list[trg].as_mut().expect("`trg` exists").insert(src);
        fresh
    }

    /// Removes the edge `{src, trg}`.
    /// Returns `true` if the edge existed.
    pub fn remove_edge(&mut self, src: usize, trg: usize) -> bool {
        if !self.edge_exists((src, trg)) {
            return false
        }
        self.adj_list[src].as_mut().expect("`src` exists").remove(&trg);
        self.adj_list[trg].as_mut().expect("`trg` exists").remove(&src);
        true
    }

    /// Tries to delete `node`.
    /// Returns the old neighborhood of `node` or `None` if nothing was deleted.
    pub fn delete_node(&mut self, node: usize) -> Option<FxHashSet<usize>> {
        let opt_neighbors = self.adj_list.get_mut(node)?.take();
        if let Some(neighborhood) = opt_neighbors.as_ref() {
            for neighbor in neighborhood.iter() {
                if let Some(ref mut nn) = self.adj_list[*neighbor] {
                    nn.remove(&node);
                }
            }
        }
        opt_neighbors
    }

    /// Removes all nodes in `node_set` from the graph.
    pub fn delete_nodes(&mut self, node_set: &FxHashSet<usize>) {
        for node in node_set {
            let opt_neighbors = self.adj_list[*node].take();
            if let Some(neighborhood) = opt_neighbors.as_ref() {
                for neighbor in neighborhood.difference(node_set) {
                    if let Some(ref mut nn) = self.adj_list[*neighbor] {
                        nn.remove(node);
                    }
                }
            }
        }
    }

}

impl DyUGraph {

    /// Reads a `.gr` input and creates a `DyUGraph`.
    ///
    /// The first non-comment line is `p <problem> <n> <m>`, followed by `m` lines `<src> <trg>`
    /// with ids in `1..=n`. Lines starting with `c` are comments.
    pub fn read_gr<R: BufRead>(gr: R) -> Result<Self, ImportError> {
        let (lines, _): (Vec<_>, Vec<_>) = gr.lines()
            .partition(|l| {
                if let Ok(line) = l {
                    // ignore empty lines and comment lines
                    !line.starts_with('c') && !line.trim().is_empty()
                } else {
                    true
                }
            });
        let mut lines = lines.into_iter();
        // p <problem> <n> <m>
        let (n, m) = {
            let line = lines.next().ok_or(ImportError::InputMalformedError)??;
            let mut s = line.split_whitespace();
            if let Some("p") = s.next() {} else { return Err(ImportError::InputMalformedError); }
            s.next().ok_or(ImportError::InputMalformedError)?;
            let n: usize = s.next().ok_or(ImportError::InputMalformedError)?.parse()?;
            let m: usize = s.next().ok_or(ImportError::InputMalformedError)?.parse()?;
            if s.next().is_some() { return Err(ImportError::InputMalformedError); }
            (n, m)
        };
        let mut graph = DyUGraph::new(n);
        let mut num_edges = 0;
        for line in lines {
            // <src> <trg>
            let line = line?;
            let mut s = line.split_whitespace();
            let src = s.next().ok_or(ImportError::InputMalformedError)?.parse::<usize>()?;
            let trg = s.next().ok_or(ImportError::InputMalformedError)?.parse::<usize>()?;
            if s.next().is_some() { return Err(ImportError::InputMalformedError); }
            if src == 0 || trg == 0 || src > n || trg > n {
                return Err(ImportError::InputMalformedError);
            }
            graph.add_edge(src, trg);
            num_edges += 1;
        }
        if num_edges != m { return Err(ImportError::InputMalformedError); }
        Ok(graph)
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_gr_test() {
        let gr = Cursor::new("c two triangles\np ds 7 9\n1 2\n1 3\n2 3\n4 5\n4 6\n4 7\n5 6\n5 7\n6 7\n");
        let graph = DyUGraph::read_gr(gr);
        assert!(graph.is_ok());
        let graph = graph.unwrap();
        assert_eq!(graph.num_nodes(), 7);
        assert_eq!(graph.num_edges(), 9);
        assert!(!graph.has_node(0));
        assert!(graph.edge_exists((7, 4)));
    }

    #[test]
    fn read_gr_malformed_test() {
        assert!(DyUGraph::read_gr(Cursor::new("p ds 3 2\n1 2\n")).is_err());
        assert!(DyUGraph::read_gr(Cursor::new("p ds 3 1\n1 4\n")).is_err());
        assert!(DyUGraph::read_gr(Cursor::new("1 2\n")).is_err());
    }

    #[test]
    fn self_loop_test() {
        let gr = Cursor::new("p ds 3 3\n1 1\n1 2\n2 3\n");
        let graph = DyUGraph::read_gr(gr).unwrap();
        assert_eq!(graph.num_edges(), 2);
        assert_eq!(graph.degree(1), Some(1));
    }

    #[test]
    fn dynamic_test() {
        let mut graph = DyUGraph::from_edges(4, &[(1, 2), (2, 3), (3, 4)]);
        let z = graph.add_node();
        assert_eq!(z, 5);
        assert!(graph.add_edge(4, z));
        assert!(!graph.add_edge(z, 4));
        assert_eq!(graph.delete_node(3), Some(vec![2, 4].into_iter().collect()));
        assert_eq!(graph.degree(2), Some(1));
        assert!(graph.remove_edge(1, 2));
        assert!(graph.edge_exists((4, 5)));
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.any_neighbor(1), Err(ProcessingError::EmptyNeighborhood(1)));
    }

}

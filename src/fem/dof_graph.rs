use super::{DofGroup, FeElement};
use crate::StrError;
use std::collections::HashMap;

/// Holds the connectivity graph of DofGroups (used for numbering only)
///
/// Vertices follow the group insertion order; two groups are adjacent when at
/// least one FeElement connects both. The numberer consumes this graph; it is
/// never used for solving.
pub struct DofGroupGraph {
    /// Group tags, in insertion order
    pub vertices: Vec<usize>,

    /// Adjacency lists (by vertex index, sorted, no duplicates)
    pub adjacency: Vec<Vec<usize>>,
}

impl DofGroupGraph {
    /// Builds the graph from the model's groups and elements
    pub fn new(dof_groups: &[DofGroup], fes: &[FeElement], tag_to_index: &HashMap<usize, usize>) -> Self {
        let vertices: Vec<_> = dof_groups.iter().map(|g| g.tag).collect();
        let mut adjacency = vec![Vec::new(); vertices.len()];
        for fe in fes {
            let tags = fe.actual.dof_group_tags();
            for a in tags {
                for b in tags {
                    if a == b {
                        continue;
                    }
                    if let (Some(ia), Some(ib)) = (tag_to_index.get(a), tag_to_index.get(b)) {
                        adjacency[*ia].push(*ib);
                    }
                }
            }
        }
        for list in adjacency.iter_mut() {
            list.sort();
            list.dedup();
        }
        DofGroupGraph { vertices, adjacency }
    }

    /// Returns the number of vertices
    pub fn n_vertex(&self) -> usize {
        self.vertices.len()
    }
}

/// Holds the equation-level connectivity graph (for renumbering collaborators)
///
/// Vertices are the global equation numbers; two equations are adjacent when
/// at least one FeElement addresses both. Only available after numbering.
pub struct DofGraph {
    /// Adjacency lists (by equation number, sorted, no duplicates)
    pub adjacency: Vec<Vec<usize>>,
}

impl DofGraph {
    /// Builds the graph from the finalized FeElement IDs
    pub fn new(fes: &[FeElement], n_equation: usize) -> Result<Self, StrError> {
        if n_equation < 1 {
            return Err("cannot build DofGraph before numbering completes");
        }
        let mut adjacency = vec![Vec::new(); n_equation];
        for fe in fes {
            for eq_i in fe.id.iter().flatten() {
                for eq_j in fe.id.iter().flatten() {
                    if eq_i != eq_j {
                        if *eq_i >= n_equation || *eq_j >= n_equation {
                            return Err("FeElement ID references an equation out of range");
                        }
                        adjacency[*eq_i].push(*eq_j);
                    }
                }
            }
        }
        for list in adjacency.iter_mut() {
            list.sort();
            list.dedup();
        }
        Ok(DofGraph { adjacency })
    }

    /// Returns the number of vertices (equations)
    pub fn n_vertex(&self) -> usize {
        self.adjacency.len()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{DofGraph, DofGroupGraph};
    use crate::base::Samples;
    use crate::fem::{DofGroup, FeElement, FePlain};
    use std::collections::HashMap;

    fn chain_model() -> (Vec<DofGroup>, Vec<FeElement>, HashMap<usize, usize>) {
        let domain = Samples::three_node_chain();
        let groups: Vec<_> = domain
            .nodes
            .iter()
            .map(|node| DofGroup::new_physical(node.id, node))
            .collect();
        let fe0 = FePlain::new(&domain, &domain.elements[0], vec![0, 1]).unwrap();
        let fe1 = FePlain::new(&domain, &domain.elements[1], vec![1, 2]).unwrap();
        let fes = vec![FeElement::new(0, Box::new(fe0)), FeElement::new(1, Box::new(fe1))];
        let map = HashMap::from([(0, 0), (1, 1), (2, 2)]);
        (groups, fes, map)
    }

    #[test]
    fn group_graph_works() {
        let (groups, fes, map) = chain_model();
        let graph = DofGroupGraph::new(&groups, &fes, &map);
        assert_eq!(graph.n_vertex(), 3);
        assert_eq!(graph.vertices, &[0, 1, 2]);
        assert_eq!(graph.adjacency[0], &[1]);
        assert_eq!(graph.adjacency[1], &[0, 2]);
        assert_eq!(graph.adjacency[2], &[1]);
    }

    #[test]
    fn dof_graph_works_and_captures_errors() {
        let (mut groups, mut fes, map) = chain_model();
        assert_eq!(DofGraph::new(&fes, 0).err(), Some("cannot build DofGraph before numbering completes"));

        // number the 6 equations and finalize the IDs
        let mut n = 0;
        for group in groups.iter_mut() {
            for eq in group.eqs.iter_mut() {
                *eq = Some(n);
                n += 1;
            }
        }
        for fe in fes.iter_mut() {
            fe.done_numbering(&groups, &map).unwrap();
        }
        let graph = DofGraph::new(&fes, 6).unwrap();
        assert_eq!(graph.n_vertex(), 6);
        assert_eq!(graph.adjacency[0], &[1, 2, 3]);
        assert_eq!(graph.adjacency[2], &[0, 1, 3, 4, 5]);

        assert_eq!(
            DofGraph::new(&fes, 3).err(),
            Some("FeElement ID references an equation out of range")
        );
    }
}

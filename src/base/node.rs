use super::Dof;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds a structural node: coordinates, DOF set, and analysis back-reference
///
/// The node is a purely physical object. The analysis layer attaches one
/// DofGroup to it; the node only keeps the group's tag as a non-owning
/// back-reference (lookup only, cleared when the analysis model is reset).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Node {
    /// Identification number (also the index in the domain's array of nodes)
    pub id: usize,

    /// Coordinates (ndim)
    pub coords: Vec<f64>,

    /// DOF types carried by this node, in local slot order
    pub dofs: Vec<Dof>,

    /// Tag of the DofGroup representing this node in the analysis model
    #[serde(skip)]
    dof_group: Option<usize>,
}

impl Node {
    /// Allocates a new instance
    pub fn new(id: usize, coords: &[f64], dofs: &[Dof]) -> Result<Self, StrError> {
        if coords.len() < 1 || coords.len() > 3 {
            return Err("number of coordinates must be 1, 2, or 3");
        }
        if dofs.len() < 1 {
            return Err("node must have at least one DOF");
        }
        for i in 1..dofs.len() {
            if dofs[..i].contains(&dofs[i]) {
                return Err("node cannot have duplicate DOFs");
            }
        }
        Ok(Node {
            id,
            coords: coords.to_vec(),
            dofs: dofs.to_vec(),
            dof_group: None,
        })
    }

    /// Returns the number of DOFs carried by this node
    pub fn ndof(&self) -> usize {
        self.dofs.len()
    }

    /// Returns the local slot (position) of a DOF within this node
    pub fn local_dof(&self, dof: Dof) -> Result<usize, StrError> {
        self.dofs
            .iter()
            .position(|d| *d == dof)
            .ok_or("cannot find DOF in node")
    }

    /// Sets the non-owning back-reference to the node's DofGroup
    pub fn set_dof_group(&mut self, tag: usize) {
        self.dof_group = Some(tag);
    }

    /// Returns the tag of the node's DofGroup, if attached
    pub fn dof_group(&self) -> Option<usize> {
        self.dof_group
    }

    /// Clears the back-reference to the node's DofGroup
    pub fn clear_dof_group(&mut self) {
        self.dof_group = None;
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Node;
    use crate::base::Dof;

    #[test]
    fn new_captures_errors() {
        assert_eq!(
            Node::new(0, &[], &[Dof::Ux]).err(),
            Some("number of coordinates must be 1, 2, or 3")
        );
        assert_eq!(
            Node::new(0, &[0.0, 0.0, 0.0, 0.0], &[Dof::Ux]).err(),
            Some("number of coordinates must be 1, 2, or 3")
        );
        assert_eq!(Node::new(0, &[0.0, 0.0], &[]).err(), Some("node must have at least one DOF"));
        assert_eq!(
            Node::new(0, &[0.0, 0.0], &[Dof::Ux, Dof::Uy, Dof::Ux]).err(),
            Some("node cannot have duplicate DOFs")
        );
    }

    #[test]
    fn new_and_accessors_work() {
        let mut node = Node::new(3, &[1.0, 2.0], &[Dof::Ux, Dof::Uy, Dof::Rz]).unwrap();
        assert_eq!(node.id, 3);
        assert_eq!(node.ndof(), 3);
        assert_eq!(node.local_dof(Dof::Rz), Ok(2));
        assert_eq!(node.local_dof(Dof::Uz).err(), Some("cannot find DOF in node"));
        assert_eq!(node.dof_group(), None);
        node.set_dof_group(7);
        assert_eq!(node.dof_group(), Some(7));
        node.clear_dof_group();
        assert_eq!(node.dof_group(), None);
    }

    #[test]
    fn serde_skips_dof_group() {
        let mut node = Node::new(0, &[0.0], &[Dof::Ux]).unwrap();
        node.set_dof_group(5);
        let json = serde_json::to_string(&node).unwrap();
        let back: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dof_group(), None);
        assert_eq!(back.coords, &[0.0]);
    }
}

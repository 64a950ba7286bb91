use crate::base::{Dof, Domain, Node};
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Identifies the constraint enforced by a Lagrange DofGroup
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConstraintRef {
    /// Tag of a single-point constraint
    Sp(usize),

    /// Tag of a multi-point constraint
    Mp(usize),

    /// Tag of a multi-retained-node constraint
    Mrmp(usize),
}

/// Defines the kind of a DofGroup and its kind-specific data
pub enum DofGroupKind {
    /// Represents the physical DOFs of one node
    Physical {
        /// The represented node
        node_id: usize,
    },

    /// Represents the multiplier unknowns of one constraint
    Lagrange {
        /// The enforced constraint
        constraint: ConstraintRef,
    },

    /// Represents one node whose DOFs are mapped to a reduced free set
    ///
    /// The reduced set concatenates the node's own free slots with "borrowed"
    /// (retained) DOFs belonging to other nodes; the matrix `tt` maps reduced
    /// values back to the full DOF set and `offset` adds the prescribed part:
    ///
    /// ```text
    /// u_full = tt · u_reduced + g(t),  g_i(t) = offset[i].0 + offset[i].1 · t
    /// ```
    Transformed {
        /// The represented node
        node_id: usize,

        /// Transformation matrix (ndof × n_reduced)
        tt: Matrix,

        /// Per-slot prescribed offset as (constant, proportional) coefficients
        offset: Vec<(f64, f64)>,

        /// Local slots of the node that keep their own equation
        free_slots: Vec<usize>,

        /// Retained (node, DOF) pairs filling the remaining reduced slots
        borrowed: Vec<(usize, Dof)>,
    },
}

/// Holds the equation numbers owned by one node or one constraint
///
/// This is the analysis-side representation of the unknowns: the numberer
/// assigns the equation numbers, the FeElements read them back when building
/// their local-to-global maps, and the external (nodal) loads are cached here
/// before being scattered to the global unbalance vector.
pub struct DofGroup {
    /// Identification tag (unique among DofGroups in the analysis model)
    pub tag: usize,

    /// Kind and kind-specific data
    pub kind: DofGroupKind,

    /// Equation numbers, one per reduced slot (None = not numbered)
    pub eqs: Vec<Option<usize>>,

    /// Indicates which slots receive an equation from the numberer
    ///
    /// Borrowed slots of a transformed group are not numberable: they are
    /// filled from the retained node's group after numbering completes.
    pub numberable: Vec<bool>,

    /// Cached external load contributions in the full DOF space of the node
    pub unbalance: Vector,
}

impl DofGroup {
    /// Allocates a group representing the physical DOFs of a node
    pub fn new_physical(tag: usize, node: &Node) -> Self {
        let ndof = node.ndof();
        DofGroup {
            tag,
            kind: DofGroupKind::Physical { node_id: node.id },
            eqs: vec![None; ndof],
            numberable: vec![true; ndof],
            unbalance: Vector::new(ndof),
        }
    }

    /// Allocates a group holding the multiplier unknowns of a constraint
    pub fn new_lagrange(tag: usize, constraint: ConstraintRef, n_multiplier: usize) -> Self {
        DofGroup {
            tag,
            kind: DofGroupKind::Lagrange { constraint },
            eqs: vec![None; n_multiplier],
            numberable: vec![true; n_multiplier],
            unbalance: Vector::new(0),
        }
    }

    /// Allocates a group mapping a constrained node to a reduced free set
    pub fn new_transformed(
        tag: usize,
        node: &Node,
        tt: Matrix,
        offset: Vec<(f64, f64)>,
        free_slots: Vec<usize>,
        borrowed: Vec<(usize, Dof)>,
    ) -> Result<Self, StrError> {
        let ndof = node.ndof();
        let n_reduced = free_slots.len() + borrowed.len();
        if tt.dims() != (ndof, n_reduced) {
            return Err("transformation matrix dimensions do not match the reduced set");
        }
        if offset.len() != ndof {
            return Err("offset length does not match the number of DOFs");
        }
        let mut numberable = vec![true; n_reduced];
        for i in free_slots.len()..n_reduced {
            numberable[i] = false;
        }
        Ok(DofGroup {
            tag,
            kind: DofGroupKind::Transformed {
                node_id: node.id,
                tt,
                offset,
                free_slots,
                borrowed,
            },
            eqs: vec![None; n_reduced],
            numberable,
            unbalance: Vector::new(ndof),
        })
    }

    /// Returns the number of (reduced) equations owned by this group
    pub fn n_eq(&self) -> usize {
        self.eqs.len()
    }

    /// Returns the represented node id, if any
    pub fn node_id(&self) -> Option<usize> {
        match &self.kind {
            DofGroupKind::Physical { node_id } => Some(*node_id),
            DofGroupKind::Lagrange { .. } => None,
            DofGroupKind::Transformed { node_id, .. } => Some(*node_id),
        }
    }

    /// Returns whether this group holds multiplier unknowns or not
    pub fn is_lagrange(&self) -> bool {
        match self.kind {
            DofGroupKind::Lagrange { .. } => true,
            _ => false,
        }
    }

    /// Clears all equation numbers (before renumbering)
    pub fn reset_numbering(&mut self) {
        self.eqs.iter_mut().for_each(|eq| *eq = None);
    }

    /// Returns the equation number of a DOF of the represented node
    ///
    /// Fails for eliminated DOFs (transformed slots without an own equation)
    /// and for DOFs that have not been numbered yet.
    pub fn eq_for_dof(&self, node: &Node, dof: Dof) -> Result<usize, StrError> {
        let slot = node.local_dof(dof)?;
        match &self.kind {
            DofGroupKind::Physical { .. } => self.eqs[slot].ok_or("DOF has not been numbered yet"),
            DofGroupKind::Lagrange { .. } => Err("Lagrange group does not own node DOFs"),
            DofGroupKind::Transformed { free_slots, .. } => match free_slots.iter().position(|s| *s == slot) {
                Some(reduced) => self.eqs[reduced].ok_or("DOF has not been numbered yet"),
                None => Err("DOF has been eliminated by the transformation"),
            },
        }
    }

    /// Caches the external (nodal) load contributions at the given pseudo-time
    pub fn calc_unbalance(&mut self, domain: &Domain, t: f64) -> Result<(), StrError> {
        self.unbalance.fill(0.0);
        let node_id = match self.node_id() {
            Some(id) => id,
            None => return Ok(()), // multiplier groups carry no external load
        };
        let node = &domain.nodes[node_id];
        for load in &domain.nodal_loads {
            if load.node_id == node_id {
                let slot = node.local_dof(load.dof)?;
                self.unbalance[slot] += load.value_at(t);
            }
        }
        Ok(())
    }

    /// Scatters the cached external loads into the global unbalance vector
    ///
    /// **Note:** The unbalance convention is `r = f_int − f_ext`, so the
    /// external loads are subtracted here. Transformed groups scatter `ttᵀ·f`.
    pub fn assemble_unbalance(&self, rr: &mut Vector) {
        match &self.kind {
            DofGroupKind::Physical { .. } => {
                for (slot, eq) in self.eqs.iter().enumerate() {
                    if let Some(i) = eq {
                        rr[*i] -= self.unbalance[slot];
                    }
                }
            }
            DofGroupKind::Lagrange { .. } => (),
            DofGroupKind::Transformed { tt, .. } => {
                let (ndof, n_reduced) = tt.dims();
                for j in 0..n_reduced {
                    if let Some(i) = self.eqs[j] {
                        let mut value = 0.0;
                        for slot in 0..ndof {
                            value += tt.get(slot, j) * self.unbalance[slot];
                        }
                        rr[i] -= value;
                    }
                }
            }
        }
    }

    /// Returns the full-space prescribed offset vector at the given pseudo-time
    pub fn offset_vector(&self, t: f64) -> Vector {
        match &self.kind {
            DofGroupKind::Transformed { offset, .. } => {
                let mut g = Vector::new(offset.len());
                for (i, (c0, c1)) in offset.iter().enumerate() {
                    g[i] = c0 + c1 * t;
                }
                g
            }
            _ => Vector::new(self.eqs.len()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{ConstraintRef, DofGroup, DofGroupKind};
    use crate::base::{Dof, Domain, Node};
    use russell_lab::{Matrix, Vector};

    fn sample_node() -> Node {
        Node::new(0, &[0.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap()
    }

    #[test]
    fn new_physical_works() {
        let node = sample_node();
        let mut group = DofGroup::new_physical(7, &node);
        assert_eq!(group.tag, 7);
        assert_eq!(group.n_eq(), 2);
        assert_eq!(group.node_id(), Some(0));
        assert!(!group.is_lagrange());
        assert_eq!(group.eq_for_dof(&node, Dof::Ux).err(), Some("DOF has not been numbered yet"));
        group.eqs[0] = Some(4);
        group.eqs[1] = Some(5);
        assert_eq!(group.eq_for_dof(&node, Dof::Uy), Ok(5));
        group.reset_numbering();
        assert_eq!(group.eqs, &[None, None]);
    }

    #[test]
    fn new_lagrange_works() {
        let group = DofGroup::new_lagrange(3, ConstraintRef::Sp(0), 1);
        assert_eq!(group.n_eq(), 1);
        assert_eq!(group.node_id(), None);
        assert!(group.is_lagrange());
        let node = sample_node();
        assert_eq!(
            group.eq_for_dof(&node, Dof::Ux).err(),
            Some("Lagrange group does not own node DOFs")
        );
    }

    #[test]
    fn new_transformed_captures_errors() {
        let node = sample_node();
        assert_eq!(
            DofGroup::new_transformed(0, &node, Matrix::new(1, 1), vec![(0.0, 0.0); 2], vec![0], vec![]).err(),
            Some("transformation matrix dimensions do not match the reduced set")
        );
        assert_eq!(
            DofGroup::new_transformed(0, &node, Matrix::new(2, 1), vec![(0.0, 0.0); 1], vec![0], vec![]).err(),
            Some("offset length does not match the number of DOFs")
        );
    }

    #[test]
    fn transformed_group_works() {
        // node with Uy prescribed as 0.5·t; Ux stays free
        let node = sample_node();
        let tt = Matrix::from(&[[1.0], [0.0]]);
        let offset = vec![(0.0, 0.0), (0.0, 0.5)];
        let mut group = DofGroup::new_transformed(1, &node, tt, offset, vec![0], vec![]).unwrap();
        assert_eq!(group.numberable, &[true]);
        group.eqs[0] = Some(0);
        assert_eq!(group.eq_for_dof(&node, Dof::Ux), Ok(0));
        assert_eq!(
            group.eq_for_dof(&node, Dof::Uy).err(),
            Some("DOF has been eliminated by the transformation")
        );
        let g = group.offset_vector(2.0);
        assert_eq!(g.as_data(), &[0.0, 1.0]);
    }

    #[test]
    fn unbalance_works() {
        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[0.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        domain.add_nodal_load(a, Dof::Uy, -10.0).unwrap();
        let mut group = DofGroup::new_physical(0, &domain.nodes[a]);
        group.eqs[0] = Some(0);
        group.eqs[1] = Some(1);
        group.calc_unbalance(&domain, 1.0).unwrap();
        assert_eq!(group.unbalance.as_data(), &[0.0, -10.0]);
        let mut rr = Vector::new(2);
        group.assemble_unbalance(&mut rr);
        assert_eq!(rr.as_data(), &[0.0, 10.0]);
    }

    #[test]
    fn transformed_unbalance_is_scattered_through_tt() {
        // both DOFs of the node borrowed from elsewhere (rigid tie): f_red = ttᵀ f
        let node = sample_node();
        let tt = Matrix::from(&[[1.0, 0.0], [0.0, 1.0]]);
        let offset = vec![(0.0, 0.0); 2];
        let mut group =
            DofGroup::new_transformed(0, &node, tt, offset, vec![], vec![(1, Dof::Ux), (1, Dof::Uy)]).unwrap();
        assert_eq!(group.numberable, &[false, false]);
        group.eqs[0] = Some(3);
        group.eqs[1] = Some(4);
        group.unbalance[0] = 2.0;
        group.unbalance[1] = 6.0;
        let mut rr = Vector::new(5);
        group.assemble_unbalance(&mut rr);
        assert_eq!(rr.as_data(), &[0.0, 0.0, 0.0, -2.0, -6.0]);
        match &group.kind {
            DofGroupKind::Transformed { borrowed, .. } => assert_eq!(borrowed.len(), 2),
            _ => panic!("expected Transformed"),
        }
    }
}

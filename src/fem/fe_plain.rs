use super::{ElementRod, ElementSpring, ElementTrait, FeContext, FeEquations, Integrator};
use crate::base::{Domain, Elem, Element};
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Allocates the "actual" formulation behind an element record
pub fn new_element_trait(domain: &Domain, element: &Element) -> Result<Box<dyn ElementTrait>, StrError> {
    match &element.param {
        Elem::Rod(p) => Ok(Box::new(ElementRod::new(domain, element, p)?)),
        Elem::Spring(p) => Ok(Box::new(ElementSpring::new(domain, element, p)?)),
    }
}

/// Implements the plain (unconstrained) analysis-side element
///
/// Wraps one physical element whose nodes are all represented by ordinary
/// (physical) DofGroups. The local system spans the full DOF sets of the
/// connected groups; the element stiffness is scattered into that space
/// through an expansion map, so formulations touching only a subset of the
/// node DOFs (e.g., a scalar spring) still line up with the group equations.
pub struct FePlain {
    /// The wrapped element id in the domain
    pub element_id: usize,

    /// Connects to the physical formulation
    actual: Box<dyn ElementTrait>,

    /// Tags of the connected DofGroups (one per element node)
    dof_group_tags: Vec<usize>,

    /// Maps element-local slots to local slots of the group concatenation
    expand: Vec<usize>,

    /// Dimension of the local system (sum of the nodes' DOF counts)
    n_local: usize,

    /// Element stiffness buffer
    kk_elem: Matrix,

    /// Element displacement buffer
    uu_elem: Vector,

    /// Element force buffer
    ff_elem: Vector,
}

impl FePlain {
    /// Allocates a new instance
    ///
    /// `dof_group_tags` must list the groups of the element's nodes, in the
    /// element connectivity order.
    pub fn new(domain: &Domain, element: &Element, dof_group_tags: Vec<usize>) -> Result<Self, StrError> {
        let actual = new_element_trait(domain, element)?;
        if dof_group_tags.len() != actual.nodes().len() {
            return Err("number of DofGroups must match the element connectivity");
        }
        let mut offsets = Vec::with_capacity(actual.nodes().len());
        let mut n_local = 0;
        for node_id in actual.nodes() {
            offsets.push(n_local);
            n_local += domain.nodes[*node_id].ndof();
        }
        let mut expand = Vec::with_capacity(actual.n_local_eq());
        for (m, node_id) in actual.nodes().iter().enumerate() {
            let node = &domain.nodes[*node_id];
            for dof in &actual.dofs()[m] {
                expand.push(offsets[m] + node.local_dof(*dof)?);
            }
        }
        let n_elem = actual.n_local_eq();
        Ok(FePlain {
            element_id: element.id,
            actual,
            dof_group_tags,
            expand,
            n_local,
            kk_elem: Matrix::new(n_elem, n_elem),
            uu_elem: Vector::new(n_elem),
            ff_elem: Vector::new(n_elem),
        })
    }

}

impl FeEquations for FePlain {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.n_local
    }

    /// Returns whether the local tangent matrix is symmetric or not
    fn symmetric_tangent(&self) -> bool {
        self.actual.symmetric_stiffness()
    }

    /// Calculates the local tangent matrix
    fn calc_tangent(&mut self, kk: &mut Matrix, integrator: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        self.actual.calc_stiffness(&mut self.kk_elem)?;
        let coefficient = integrator.kk_coefficient();
        kk.fill(0.0);
        for (i, full_i) in self.expand.iter().enumerate() {
            for (j, full_j) in self.expand.iter().enumerate() {
                kk.set(*full_i, *full_j, coefficient * self.kk_elem.get(i, j));
            }
        }
        Ok(())
    }

    /// Calculates the local unbalance vector (internal forces)
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        for (i, full) in self.expand.iter().enumerate() {
            self.uu_elem[i] = uu_local[*full];
        }
        self.actual.calc_internal_forces(&mut self.ff_elem, &self.uu_elem)?;
        ff.fill(0.0);
        for (i, full) in self.expand.iter().enumerate() {
            ff[*full] += self.ff_elem[i];
        }
        Ok(())
    }

    /// Returns the stiffness diagonal (spanning the full group DOF sets)
    fn diagonal_stiffness(&mut self) -> Result<Option<Vector>, StrError> {
        self.actual.calc_stiffness(&mut self.kk_elem)?;
        let mut diag = Vector::new(self.n_local);
        for (i, full) in self.expand.iter().enumerate() {
            diag[*full] = self.kk_elem.get(i, i);
        }
        Ok(Some(diag))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use super::{new_element_trait, DofGroup, DofGroupKind, ElementTrait, FeContext, FeEquations, Integrator};
use crate::base::{Domain, Element};
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Implements the transformed analysis-side element
///
/// Wraps one physical element touching at least one transformed node and
/// condenses the eliminated DOFs out of the local system:
///
/// ```text
/// K' = Tᵀ K T
/// f' = Tᵀ K (T·u_reduced + g(t))    (internal forces)
/// ```
///
/// `T` is the block-diagonal concatenation of the nodes' transformation
/// matrices (identity blocks for unconstrained nodes) and `g(t)` collects the
/// prescribed offsets. No extra unknowns and no approximation error.
pub struct FeTransform {
    /// The wrapped element id in the domain
    pub element_id: usize,

    /// Connects to the physical formulation
    actual: Box<dyn ElementTrait>,

    /// Tags of the connected DofGroups (one per element node)
    dof_group_tags: Vec<usize>,

    /// Block-diagonal transformation matrix (n_full × n_reduced)
    tt: Matrix,

    /// Per full slot prescribed offset as (constant, proportional) coefficients
    offset: Vec<(f64, f64)>,

    /// Maps element-local slots to local slots of the full concatenation
    expand: Vec<usize>,

    /// Dimension of the full local system (sum of the nodes' DOF counts)
    n_full: usize,

    /// Dimension of the reduced local system (sum of the groups' equations)
    n_reduced: usize,

    /// Element stiffness buffer
    kk_elem: Matrix,

    /// Full displacement buffer
    uu_full: Vector,

    /// Element displacement buffer
    uu_elem: Vector,

    /// Element force buffer
    ff_elem: Vector,

    /// Full force buffer
    ff_full: Vector,

    /// Full stiffness buffer
    kk_full: Matrix,
}

impl FeTransform {
    /// Allocates a new instance
    ///
    /// `groups` must be aligned with `dof_group_tags` and hold the groups of
    /// the element's nodes, in the element connectivity order.
    pub fn new(
        domain: &Domain,
        element: &Element,
        dof_group_tags: Vec<usize>,
        groups: &[&DofGroup],
    ) -> Result<Self, StrError> {
        let actual = new_element_trait(domain, element)?;
        if dof_group_tags.len() != actual.nodes().len() || groups.len() != actual.nodes().len() {
            return Err("number of DofGroups must match the element connectivity");
        }

        // sizes of the full and reduced local systems
        let mut n_full = 0;
        let mut n_reduced = 0;
        let mut full_offsets = Vec::with_capacity(groups.len());
        let mut reduced_offsets = Vec::with_capacity(groups.len());
        for (m, node_id) in actual.nodes().iter().enumerate() {
            full_offsets.push(n_full);
            reduced_offsets.push(n_reduced);
            n_full += domain.nodes[*node_id].ndof();
            n_reduced += groups[m].n_eq();
        }

        // block-diagonal transformation and offsets
        let mut tt = Matrix::new(n_full, n_reduced);
        let mut offset = vec![(0.0, 0.0); n_full];
        for (m, group) in groups.iter().enumerate() {
            let ndof = domain.nodes[actual.nodes()[m]].ndof();
            match &group.kind {
                DofGroupKind::Physical { .. } => {
                    for i in 0..ndof {
                        tt.set(full_offsets[m] + i, reduced_offsets[m] + i, 1.0);
                    }
                }
                DofGroupKind::Transformed {
                    tt: tt_node,
                    offset: offset_node,
                    ..
                } => {
                    let (nrow, ncol) = tt_node.dims();
                    for i in 0..nrow {
                        for j in 0..ncol {
                            tt.set(full_offsets[m] + i, reduced_offsets[m] + j, tt_node.get(i, j));
                        }
                        offset[full_offsets[m] + i] = offset_node[i];
                    }
                }
                DofGroupKind::Lagrange { .. } => {
                    return Err("cannot wrap an element connected to a Lagrange group");
                }
            }
        }

        // expansion map of the element-local subset
        let mut expand = Vec::with_capacity(actual.n_local_eq());
        for (m, node_id) in actual.nodes().iter().enumerate() {
            let node = &domain.nodes[*node_id];
            for dof in &actual.dofs()[m] {
                expand.push(full_offsets[m] + node.local_dof(*dof)?);
            }
        }

        let n_elem = actual.n_local_eq();
        Ok(FeTransform {
            element_id: element.id,
            actual,
            dof_group_tags,
            tt,
            offset,
            expand,
            n_full,
            n_reduced,
            kk_elem: Matrix::new(n_elem, n_elem),
            uu_full: Vector::new(n_full),
            uu_elem: Vector::new(n_elem),
            ff_elem: Vector::new(n_elem),
            ff_full: Vector::new(n_full),
            kk_full: Matrix::new(n_full, n_full),
        })
    }

    /// Fills the full stiffness buffer from the element stiffness
    fn expand_stiffness(&mut self) -> Result<(), StrError> {
        self.actual.calc_stiffness(&mut self.kk_elem)?;
        self.kk_full.fill(0.0);
        for (i, full_i) in self.expand.iter().enumerate() {
            for (j, full_j) in self.expand.iter().enumerate() {
                self.kk_full.set(*full_i, *full_j, self.kk_elem.get(i, j));
            }
        }
        Ok(())
    }

    /// Returns the prescribed offsets at the given pseudo-time
    fn offsets_at(&self, t: f64) -> Vector {
        let mut g = Vector::new(self.n_full);
        for (i, (c0, c1)) in self.offset.iter().enumerate() {
            g[i] = c0 + c1 * t;
        }
        g
    }
}

impl FeEquations for FeTransform {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the (reduced) local system of equations
    fn n_local_eq(&self) -> usize {
        self.n_reduced
    }

    /// Returns whether the local tangent matrix is symmetric or not
    ///
    /// The congruence transformation preserves the symmetry of the element.
    fn symmetric_tangent(&self) -> bool {
        self.actual.symmetric_stiffness()
    }

    /// Calculates the reduced local tangent matrix `Tᵀ K T`
    fn calc_tangent(&mut self, kk: &mut Matrix, integrator: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        self.expand_stiffness()?;
        let coefficient = integrator.kk_coefficient();
        for a in 0..self.n_reduced {
            for b in 0..self.n_reduced {
                let mut value = 0.0;
                for i in 0..self.n_full {
                    let ti = self.tt.get(i, a);
                    if ti == 0.0 {
                        continue;
                    }
                    for j in 0..self.n_full {
                        value += ti * self.kk_full.get(i, j) * self.tt.get(j, b);
                    }
                }
                kk.set(a, b, coefficient * value);
            }
        }
        Ok(())
    }

    /// Calculates the reduced local unbalance vector `Tᵀ K (T·u + g)`
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        ctx: &FeContext,
    ) -> Result<(), StrError> {
        // full displacements: u_full = T·u_reduced + g(t)
        let g = self.offsets_at(ctx.domain.t);
        for i in 0..self.n_full {
            let mut value = g[i];
            for j in 0..self.n_reduced {
                value += self.tt.get(i, j) * uu_local[j];
            }
            self.uu_full[i] = value;
        }

        // internal forces of the wrapped element
        for (i, full) in self.expand.iter().enumerate() {
            self.uu_elem[i] = self.uu_full[*full];
        }
        self.actual.calc_internal_forces(&mut self.ff_elem, &self.uu_elem)?;
        self.ff_full.fill(0.0);
        for (i, full) in self.expand.iter().enumerate() {
            self.ff_full[*full] += self.ff_elem[i];
        }

        // reduced forces: f' = Tᵀ f_full
        for a in 0..self.n_reduced {
            let mut value = 0.0;
            for i in 0..self.n_full {
                value += self.tt.get(i, a) * self.ff_full[i];
            }
            ff[a] = value;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use super::{DofGroup, FemState, Integrator};
use crate::base::Domain;
use crate::StrError;
use russell_lab::{Matrix, Vector};
use russell_sparse::CooMatrix;
use std::collections::HashMap;

/// Holds the context seen by an FeElement while computing local contributions
pub struct FeContext<'a> {
    /// The physical domain (read-only during assembly)
    pub domain: &'a Domain,
}

/// Defines the contract implemented by all analysis-side element variants
///
/// A variant produces a local tangent matrix and a local unbalance vector
/// over the (reduced) equations of the DofGroups it connects. The local slot
/// order is the concatenation of the groups' equation slots, in the order
/// given by `dof_group_tags`.
pub trait FeEquations {
    /// Returns the tags of the connected DofGroups, in local slot order
    fn dof_group_tags(&self) -> &[usize];

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize;

    /// Returns whether the local tangent matrix is symmetric or not
    fn symmetric_tangent(&self) -> bool {
        true
    }

    /// Calculates the local tangent matrix
    fn calc_tangent(&mut self, kk: &mut Matrix, integrator: &dyn Integrator, ctx: &FeContext)
        -> Result<(), StrError>;

    /// Calculates the local unbalance vector (internal minus external forces)
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        integrator: &dyn Integrator,
        ctx: &FeContext,
    ) -> Result<(), StrError>;

    /// Refreshes per-iteration data (e.g., transformation offsets)
    fn update(&mut self, _ctx: &FeContext) -> Result<(), StrError> {
        Ok(())
    }

    /// Returns the diagonal stiffness per local slot, if the variant has one
    ///
    /// Plain elements report their stiffness diagonal here so that the
    /// auto-penalty survey can scale its penalties; pseudo-elements return None.
    fn diagonal_stiffness(&mut self) -> Result<Option<Vector>, StrError> {
        Ok(None)
    }

    /// Applies load-dependent constraint terms at the given pseudo-time
    fn apply_load(&mut self, _t: f64) -> Result<(), StrError> {
        Ok(())
    }
}

/// Wraps an element variant and owns its local-to-global equation map
///
/// The `id` array is the local→global map finalized after DOF numbering; a
/// `None` entry marks an eliminated/unused slot and is skipped by assembly.
pub struct FeElement {
    /// Identification tag (unique among FeElements in the analysis model)
    pub tag: usize,

    /// Connects to the "actual" implementation of the local equations
    pub actual: Box<dyn FeEquations>,

    /// Local-to-global equation map (empty until numbering completes)
    pub id: Vec<Option<usize>>,

    /// Local tangent matrix buffer
    pub tangent: Matrix,

    /// Local unbalance vector buffer
    pub unbalance: Vector,

    /// Local primary unknowns buffer
    uu_local: Vector,
}

impl FeElement {
    /// Allocates a new instance
    pub fn new(tag: usize, actual: Box<dyn FeEquations>) -> Self {
        let neq = actual.n_local_eq();
        FeElement {
            tag,
            actual,
            id: Vec::new(),
            tangent: Matrix::new(neq, neq),
            unbalance: Vector::new(neq),
            uu_local: Vector::new(neq),
        }
    }

    /// Finalizes the local-to-global map from the connected groups' equations
    pub fn done_numbering(
        &mut self,
        groups: &[DofGroup],
        tag_to_index: &HashMap<usize, usize>,
    ) -> Result<(), StrError> {
        let mut id = Vec::with_capacity(self.actual.n_local_eq());
        for group_tag in self.actual.dof_group_tags() {
            let index = tag_to_index
                .get(group_tag)
                .ok_or("cannot find DofGroup connected by FeElement")?;
            id.extend(groups[*index].eqs.iter().copied());
        }
        if id.len() != self.actual.n_local_eq() {
            return Err("local-to-global map size does not match the local equations");
        }
        self.id = id;
        Ok(())
    }

    /// Computes the local tangent matrix into the internal buffer
    pub fn calc_tangent(&mut self, integrator: &dyn Integrator, ctx: &FeContext) -> Result<(), StrError> {
        self.actual.calc_tangent(&mut self.tangent, integrator, ctx)
    }

    /// Computes the local unbalance vector into the internal buffer
    ///
    /// The local primary unknowns are gathered from the global state through
    /// the finalized `id` map (eliminated slots contribute zero).
    pub fn calc_unbalance(
        &mut self,
        state: &FemState,
        integrator: &dyn Integrator,
        ctx: &FeContext,
    ) -> Result<(), StrError> {
        if self.id.len() != self.actual.n_local_eq() {
            return Err("cannot compute unbalance because the IDs have not been finalized");
        }
        for (local, eq) in self.id.iter().enumerate() {
            self.uu_local[local] = match eq {
                Some(i) => state.uu[*i],
                None => 0.0,
            };
        }
        self.actual.calc_unbalance(&mut self.unbalance, &self.uu_local, integrator, ctx)
    }

    /// Scatters the local tangent matrix into the global (triplet) matrix
    ///
    /// **Note:** With `triangular` enabled, only the lower triangle of the
    /// global matrix is filled (symmetric storage).
    pub fn assemble_tangent(&self, kk: &mut CooMatrix, triangular: bool) -> Result<(), StrError> {
        for (local_i, eq_i) in self.id.iter().enumerate() {
            let i = match eq_i {
                Some(i) => *i,
                None => continue,
            };
            for (local_j, eq_j) in self.id.iter().enumerate() {
                let j = match eq_j {
                    Some(j) => *j,
                    None => continue,
                };
                if triangular && j > i {
                    continue;
                }
                kk.put(i, j, self.tangent.get(local_i, local_j))
                    .map_err(|_| "cannot put tangent entry into the global matrix")?;
            }
        }
        Ok(())
    }

    /// Scatters the local unbalance vector into the global unbalance vector
    pub fn assemble_unbalance(&self, rr: &mut Vector) {
        for (local, eq) in self.id.iter().enumerate() {
            if let Some(i) = eq {
                rr[*i] += self.unbalance[local];
            }
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

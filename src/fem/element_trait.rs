use crate::base::Dof;
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Defines the contract implemented by all (physical) element formulations
///
/// Element formulations are external collaborators of the constraint and
/// assembly machinery: the analysis layer only needs the connectivity, the
/// local DOF layout, and the local matrices.
pub trait ElementTrait {
    /// Returns the connected node ids
    fn nodes(&self) -> &[usize];

    /// Returns the DOF layout: one list of DOFs per connected node
    fn dofs(&self) -> &Vec<Vec<Dof>>;

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize;

    /// Returns whether the local stiffness matrix is symmetric or not
    fn symmetric_stiffness(&self) -> bool {
        true
    }

    /// Calculates the local stiffness matrix
    fn calc_stiffness(&mut self, kk: &mut Matrix) -> Result<(), StrError>;

    /// Calculates the local internal forces for the given local displacements
    fn calc_internal_forces(&mut self, ff: &mut Vector, uu_local: &Vector) -> Result<(), StrError>;
}

use super::Dof;
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Holds a multi-point constraint relating two nodes linearly
///
/// The relation reads:
///
/// ```text
/// u_constrained = C · u_retained + g
/// ```
///
/// where `u_constrained` collects the constrained DOFs of the constrained
/// node, `u_retained` collects the retained DOFs of the retained node, `C` is
/// the coefficient matrix (n_constrained × n_retained), and `g` is a constant
/// offset vector (n_constrained).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MpConstraint {
    /// Identification tag (unique among multi-point constraints)
    pub tag: usize,

    /// Constrained node
    pub constrained_node: usize,

    /// Constrained DOFs at the constrained node
    pub constrained_dofs: Vec<Dof>,

    /// Retained node
    pub retained_node: usize,

    /// Retained DOFs at the retained node
    pub retained_dofs: Vec<Dof>,

    /// Coefficient matrix C (n_constrained × n_retained)
    pub cc: Matrix,

    /// Constant offset g (n_constrained)
    pub gg: Vector,
}

impl MpConstraint {
    /// Allocates a new instance
    pub fn new(
        tag: usize,
        constrained_node: usize,
        constrained_dofs: &[Dof],
        retained_node: usize,
        retained_dofs: &[Dof],
        cc: Matrix,
        gg: Vector,
    ) -> Result<Self, StrError> {
        if constrained_node == retained_node {
            return Err("constrained and retained nodes must differ");
        }
        if constrained_dofs.len() < 1 || retained_dofs.len() < 1 {
            return Err("constrained and retained DOF sets must be non-empty");
        }
        let (nrow, ncol) = cc.dims();
        if nrow != constrained_dofs.len() || ncol != retained_dofs.len() {
            return Err("coefficient matrix dimensions do not match the DOF sets");
        }
        if gg.dim() != constrained_dofs.len() {
            return Err("offset vector dimension does not match the constrained DOF set");
        }
        Ok(MpConstraint {
            tag,
            constrained_node,
            constrained_dofs: constrained_dofs.to_vec(),
            retained_node,
            retained_dofs: retained_dofs.to_vec(),
            cc,
            gg,
        })
    }

    /// Returns the number of scalar constraint equations
    pub fn n_constrained(&self) -> usize {
        self.constrained_dofs.len()
    }

    /// Returns the number of retained DOFs
    pub fn n_retained(&self) -> usize {
        self.retained_dofs.len()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use super::Dof;
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Holds a multi-point constraint with multiple retained nodes
///
/// Generalizes [crate::base::MpConstraint] to several retained nodes:
///
/// ```text
/// u_constrained = C · [u_retained_1, u_retained_2, …]ᵀ + g
/// ```
///
/// The columns of `C` span the concatenation of the retained DOF lists in the
/// order given by `retained`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MrmpConstraint {
    /// Identification tag (unique among multi-retained-node constraints)
    pub tag: usize,

    /// Constrained node
    pub constrained_node: usize,

    /// Constrained DOFs at the constrained node
    pub constrained_dofs: Vec<Dof>,

    /// Retained (node, DOFs) pairs
    pub retained: Vec<(usize, Vec<Dof>)>,

    /// Coefficient matrix C (n_constrained × total number of retained DOFs)
    pub cc: Matrix,

    /// Constant offset g (n_constrained)
    pub gg: Vector,
}

impl MrmpConstraint {
    /// Allocates a new instance
    pub fn new(
        tag: usize,
        constrained_node: usize,
        constrained_dofs: &[Dof],
        retained: &[(usize, Vec<Dof>)],
        cc: Matrix,
        gg: Vector,
    ) -> Result<Self, StrError> {
        if constrained_dofs.len() < 1 {
            return Err("constrained DOF set must be non-empty");
        }
        if retained.len() < 1 {
            return Err("there must be at least one retained node");
        }
        let mut n_retained_total = 0;
        for (node_id, dofs) in retained {
            if *node_id == constrained_node {
                return Err("a retained node cannot be the constrained node");
            }
            if dofs.len() < 1 {
                return Err("each retained node must retain at least one DOF");
            }
            n_retained_total += dofs.len();
        }
        let (nrow, ncol) = cc.dims();
        if nrow != constrained_dofs.len() || ncol != n_retained_total {
            return Err("coefficient matrix dimensions do not match the DOF sets");
        }
        if gg.dim() != constrained_dofs.len() {
            return Err("offset vector dimension does not match the constrained DOF set");
        }
        Ok(MrmpConstraint {
            tag,
            constrained_node,
            constrained_dofs: constrained_dofs.to_vec(),
            retained: retained.to_vec(),
            cc,
            gg,
        })
    }

    /// Returns the number of scalar constraint equations
    pub fn n_constrained(&self) -> usize {
        self.constrained_dofs.len()
    }

    /// Returns the total number of retained DOFs across all retained nodes
    pub fn n_retained_total(&self) -> usize {
        self.retained.iter().map(|(_, dofs)| dofs.len()).sum()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

/// Defines degrees-of-freedom (DOF) types
///
/// **Note:** The fixed numbering also gives the display order of DOFs at a node.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Dof {
    /// Displacement along the first dimension
    Ux = 0,

    /// Displacement along the second dimension
    Uy = 1,

    /// Displacement along the third dimension
    Uz = 2,

    /// Rotation around the first axis
    Rx = 3,

    /// Rotation around the second axis
    Ry = 4,

    /// Rotation around the third axis
    Rz = 5,
}

/// Defines the strategy used to enforce constraints
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum HandlerKind {
    /// Exact enforcement via extra multiplier unknowns (indefinite system)
    Lagrange,

    /// Approximate enforcement via a fixed large added stiffness
    Penalty,

    /// Approximate enforcement with a penalty scaled from neighboring stiffness
    AutoPenalty,

    /// Exact enforcement by eliminating constrained DOFs through a basis change
    Transformation,
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

use super::Dof;
use serde::{Deserialize, Serialize};

/// Holds a single-point (Dirichlet) constraint pinning one DOF of one node
///
/// The prescribed value may grow proportionally with the pseudo-time, which is
/// how load-factor-driven prescribed displacements are represented.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct SpConstraint {
    /// Identification tag (unique among single-point constraints)
    pub tag: usize,

    /// Constrained node
    pub node_id: usize,

    /// Constrained DOF
    pub dof: Dof,

    /// Prescribed value (or proportionality coefficient)
    pub value: f64,

    /// Scales the prescribed value with the pseudo-time
    pub proportional: bool,
}

impl SpConstraint {
    /// Allocates a new instance with a constant prescribed value
    pub fn new(tag: usize, node_id: usize, dof: Dof, value: f64) -> Self {
        SpConstraint {
            tag,
            node_id,
            dof,
            value,
            proportional: false,
        }
    }

    /// Returns the prescribed value at the given pseudo-time
    pub fn value_at(&self, t: f64) -> f64 {
        if self.proportional {
            self.value * t
        } else {
            self.value
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::SpConstraint;
    use crate::base::Dof;

    #[test]
    fn value_at_works() {
        let mut sp = SpConstraint::new(0, 2, Dof::Uy, 0.5);
        assert_eq!(sp.value_at(0.0), 0.5);
        assert_eq!(sp.value_at(10.0), 0.5);
        sp.proportional = true;
        assert_eq!(sp.value_at(0.0), 0.0);
        assert_eq!(sp.value_at(2.0), 1.0);
    }

    #[test]
    fn derive_works() {
        let sp = SpConstraint::new(1, 0, Dof::Ux, -1.5);
        let json = serde_json::to_string(&sp).unwrap();
        let back: SpConstraint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tag, 1);
        assert_eq!(back.value, -1.5);
        assert_eq!(back.dof, Dof::Ux);
    }
}

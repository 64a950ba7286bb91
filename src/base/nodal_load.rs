use super::Dof;
use serde::{Deserialize, Serialize};

/// Holds a concentrated load applied to one DOF of one node
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct NodalLoad {
    /// Identification tag (unique among nodal loads)
    pub tag: usize,

    /// Loaded node
    pub node_id: usize,

    /// Loaded DOF
    pub dof: Dof,

    /// Load value (or proportionality coefficient)
    pub value: f64,

    /// Scales the load with the pseudo-time
    pub proportional: bool,
}

impl NodalLoad {
    /// Allocates a new instance with a constant load value
    pub fn new(tag: usize, node_id: usize, dof: Dof, value: f64) -> Self {
        NodalLoad {
            tag,
            node_id,
            dof,
            value,
            proportional: false,
        }
    }

    /// Returns the load value at the given pseudo-time
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
    use super::NodalLoad;
    use crate::base::Dof;

    #[test]
    fn value_at_works() {
        let mut load = NodalLoad::new(0, 1, Dof::Uy, -10.0);
        assert_eq!(load.value_at(100.0), -10.0);
        load.proportional = true;
        assert_eq!(load.value_at(0.5), -5.0);
    }
}

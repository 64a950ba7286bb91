use super::Dof;
use crate::StrError;
use serde::{Deserialize, Serialize};

/// Holds parameters for the rod (truss bar) element
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamRod {
    /// Young's modulus
    pub young: f64,

    /// Cross-sectional area
    pub area: f64,
}

/// Holds parameters for the scalar spring element
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ParamSpring {
    /// Spring stiffness
    pub stiffness: f64,

    /// DOF coupled by the spring at both nodes
    pub dof: Dof,
}

/// Defines the element formulation and its parameters
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub enum Elem {
    Rod(ParamRod),
    Spring(ParamSpring),
}

/// Holds one element record of the domain: formulation, connectivity, status
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Element {
    /// Identification number (also the index in the domain's array of elements)
    pub id: usize,

    /// Formulation and parameters
    pub param: Elem,

    /// Connected node ids
    pub nodes: Vec<usize>,

    /// Participates in the analysis (killed elements are skipped by handle)
    pub active: bool,
}

impl Element {
    /// Allocates a new instance
    pub fn new(id: usize, param: Elem, nodes: &[usize]) -> Result<Self, StrError> {
        if nodes.len() != 2 {
            return Err("number of nodes for Rod or Spring must be 2");
        }
        if nodes[0] == nodes[1] {
            return Err("element cannot connect a node to itself");
        }
        Ok(Element {
            id,
            param,
            nodes: nodes.to_vec(),
            active: true,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{Elem, Element, ParamRod};

    #[test]
    fn new_captures_errors() {
        let p = ParamRod { young: 1.0, area: 1.0 };
        assert_eq!(
            Element::new(0, Elem::Rod(p), &[0]).err(),
            Some("number of nodes for Rod or Spring must be 2")
        );
        assert_eq!(
            Element::new(0, Elem::Rod(p), &[1, 1]).err(),
            Some("element cannot connect a node to itself")
        );
    }

    #[test]
    fn new_works() {
        let p = ParamRod { young: 1000.0, area: 2.0 };
        let element = Element::new(4, Elem::Rod(p), &[1, 2]).unwrap();
        assert_eq!(element.id, 4);
        assert_eq!(element.nodes, &[1, 2]);
        assert!(element.active);
        let json = serde_json::to_string(&element).unwrap();
        let back: Element = serde_json::from_str(&json).unwrap();
        assert_eq!(back.nodes, element.nodes);
    }
}

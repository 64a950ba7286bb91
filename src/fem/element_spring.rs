use super::ElementTrait;
use crate::base::{Dof, Domain, Element, ParamSpring};
use crate::StrError;
use russell_lab::{mat_vec_mul, Matrix, Vector};

/// Implements a scalar spring coupling one DOF of two nodes
pub struct ElementSpring {
    /// Connected node ids
    nodes: Vec<usize>,

    /// DOF layout (one DOF per node)
    dofs: Vec<Vec<Dof>>,

    /// Pre-computed stiffness matrix (2 × 2)
    pub stiffness: Matrix,
}

impl ElementSpring {
    /// Allocates a new instance
    pub fn new(domain: &Domain, element: &Element, param: &ParamSpring) -> Result<Self, StrError> {
        if param.stiffness <= 0.0 {
            return Err("Spring stiffness must be greater than zero");
        }
        let pp = &element.nodes;
        for node_id in pp {
            if domain.nodes[*node_id].local_dof(param.dof).is_err() {
                return Err("Spring requires its DOF at both nodes");
            }
        }
        let k = param.stiffness;
        Ok(ElementSpring {
            nodes: pp.clone(),
            dofs: vec![vec![param.dof], vec![param.dof]],
            stiffness: Matrix::from(&[[k, -k], [-k, k]]),
        })
    }
}

impl ElementTrait for ElementSpring {
    /// Returns the connected node ids
    fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Returns the DOF layout
    fn dofs(&self) -> &Vec<Vec<Dof>> {
        &self.dofs
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        2
    }

    /// Calculates the local stiffness matrix
    fn calc_stiffness(&mut self, kk: &mut Matrix) -> Result<(), StrError> {
        if kk.dims() != (2, 2) {
            return Err("local stiffness matrix has incorrect dimensions");
        }
        for i in 0..2 {
            for j in 0..2 {
                kk.set(i, j, self.stiffness.get(i, j));
            }
        }
        Ok(())
    }

    /// Calculates the local internal forces for the given local displacements
    fn calc_internal_forces(&mut self, ff: &mut Vector, uu_local: &Vector) -> Result<(), StrError> {
        mat_vec_mul(ff, 1.0, &self.stiffness, uu_local).map_err(|_| "cannot compute internal forces for Spring")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ElementSpring;
    use crate::base::{Dof, Domain, Elem, ParamSpring, Samples};
    use crate::fem::ElementTrait;
    use russell_lab::{Matrix, Vector};

    #[test]
    fn new_captures_errors() {
        let mut domain = Domain::new(1).unwrap();
        let a = domain.add_node(&[0.0], &[Dof::Ux]).unwrap();
        let b = domain.add_node(&[1.0], &[Dof::Ux]).unwrap();
        let bad = ParamSpring {
            stiffness: 0.0,
            dof: Dof::Ux,
        };
        let e = domain.add_element(Elem::Spring(bad), &[a, b]).unwrap();
        assert_eq!(
            ElementSpring::new(&domain, &domain.elements[e], &bad).err(),
            Some("Spring stiffness must be greater than zero")
        );
        let wrong_dof = ParamSpring {
            stiffness: 1.0,
            dof: Dof::Uy,
        };
        assert_eq!(
            ElementSpring::new(&domain, &domain.elements[e], &wrong_dof).err(),
            Some("Spring requires its DOF at both nodes")
        );
    }

    #[test]
    fn stiffness_and_forces_work() {
        let domain = Samples::mp_tied_chain();
        let p = ParamSpring {
            stiffness: 100.0,
            dof: Dof::Ux,
        };
        let mut spring = ElementSpring::new(&domain, &domain.elements[0], &p).unwrap();
        assert_eq!(spring.n_local_eq(), 2);
        assert_eq!(spring.dofs()[0], &[Dof::Ux]);
        let mut kk = Matrix::new(2, 2);
        spring.calc_stiffness(&mut kk).unwrap();
        assert_eq!(kk.get(0, 0), 100.0);
        assert_eq!(kk.get(0, 1), -100.0);
        let uu = Vector::from(&[0.0, 0.25]);
        let mut ff = Vector::new(2);
        spring.calc_internal_forces(&mut ff, &uu).unwrap();
        assert_eq!(ff.as_data(), &[-25.0, 25.0]);
    }
}

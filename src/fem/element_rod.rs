use super::ElementTrait;
use crate::base::{Dof, Domain, Element, ParamRod};
use crate::StrError;
use russell_lab::{mat_vec_mul, Matrix, Vector};

/// Implements a linear-elastic rod (truss bar) element
///
/// # References
///
/// * Felippa C., Chapter 20: Implementation of One-Dimensional Elements (IFEM.Ch20.pdf)
pub struct ElementRod {
    /// Connected node ids
    nodes: Vec<usize>,

    /// DOF layout (per node)
    dofs: Vec<Vec<Dof>>,

    /// Pre-computed stiffness matrix
    pub stiffness: Matrix,
}

impl ElementRod {
    /// Allocates a new instance
    #[rustfmt::skip]
    pub fn new(domain: &Domain, element: &Element, param: &ParamRod) -> Result<Self, StrError> {
        let ndim = domain.ndim;
        if ndim < 2 {
            return Err("Rod requires ndim = 2 or 3");
        }
        let pp = &element.nodes;
        let na = &domain.nodes[pp[0]];
        let nb = &domain.nodes[pp[1]];
        let dofs: Vec<Vec<Dof>> = if ndim == 2 {
            vec![vec![Dof::Ux, Dof::Uy], vec![Dof::Ux, Dof::Uy]]
        } else {
            vec![vec![Dof::Ux, Dof::Uy, Dof::Uz], vec![Dof::Ux, Dof::Uy, Dof::Uz]]
        };
        for (node, layout) in [(na, &dofs[0]), (nb, &dofs[1])] {
            for dof in layout {
                if node.local_dof(*dof).is_err() {
                    return Err("Rod requires translation DOFs at both nodes");
                }
            }
        }
        let dx = nb.coords[0] - na.coords[0];
        let dy = nb.coords[1] - na.coords[1];
        let stiffness = if ndim == 2 {
            let l = f64::sqrt(dx * dx + dy * dy);
            if l <= 0.0 {
                return Err("Rod length must be greater than zero");
            }
            let m = param.young * param.area / (l * l * l);
            Matrix::from(&[
                [ dx*dx*m,  dx*dy*m, -dx*dx*m, -dx*dy*m],
                [ dy*dx*m,  dy*dy*m, -dy*dx*m, -dy*dy*m],
                [-dx*dx*m, -dx*dy*m,  dx*dx*m,  dx*dy*m],
                [-dy*dx*m, -dy*dy*m,  dy*dx*m,  dy*dy*m],
            ])
        } else {
            let dz = nb.coords[2] - na.coords[2];
            let l = f64::sqrt(dx * dx + dy * dy + dz * dz);
            if l <= 0.0 {
                return Err("Rod length must be greater than zero");
            }
            let m = param.young * param.area / (l * l * l);
            Matrix::from(&[
                [ dx*dx*m,  dx*dy*m,  dx*dz*m, -dx*dx*m, -dx*dy*m, -dx*dz*m],
                [ dy*dx*m,  dy*dy*m,  dy*dz*m, -dy*dx*m, -dy*dy*m, -dy*dz*m],
                [ dz*dx*m,  dz*dy*m,  dz*dz*m, -dz*dx*m, -dz*dy*m, -dz*dz*m],
                [-dx*dx*m, -dx*dy*m, -dx*dz*m,  dx*dx*m,  dx*dy*m,  dx*dz*m],
                [-dy*dx*m, -dy*dy*m, -dy*dz*m,  dy*dx*m,  dy*dy*m,  dy*dz*m],
                [-dz*dx*m, -dz*dy*m, -dz*dz*m,  dz*dx*m,  dz*dy*m,  dz*dz*m],
            ])
        };
        Ok(ElementRod {
            nodes: pp.clone(),
            dofs,
            stiffness,
        })
    }
}

impl ElementTrait for ElementRod {
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
        self.stiffness.dims().0
    }

    /// Calculates the local stiffness matrix
    fn calc_stiffness(&mut self, kk: &mut Matrix) -> Result<(), StrError> {
        let (m, n) = kk.dims();
        if m != self.stiffness.dims().0 || n != m {
            return Err("local stiffness matrix has incorrect dimensions");
        }
        for i in 0..m {
            for j in 0..n {
                kk.set(i, j, self.stiffness.get(i, j));
            }
        }
        Ok(())
    }

    /// Calculates the local internal forces for the given local displacements
    fn calc_internal_forces(&mut self, ff: &mut Vector, uu_local: &Vector) -> Result<(), StrError> {
        mat_vec_mul(ff, 1.0, &self.stiffness, uu_local).map_err(|_| "cannot compute internal forces for Rod")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::ElementRod;
    use crate::base::{Dof, Domain, Elem, ParamRod, Samples};
    use crate::fem::ElementTrait;
    use russell_lab::{mat_approx_eq, Matrix, Vector};

    #[test]
    fn new_captures_errors() {
        let mut domain = Domain::new(1).unwrap();
        let a = domain.add_node(&[0.0], &[Dof::Ux]).unwrap();
        let b = domain.add_node(&[1.0], &[Dof::Ux]).unwrap();
        let p = ParamRod { young: 100.0, area: 1.0 };
        let e = domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        assert_eq!(
            ElementRod::new(&domain, &domain.elements[e], &p).err(),
            Some("Rod requires ndim = 2 or 3")
        );

        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[0.0, 0.0], &[Dof::Ux]).unwrap(); // missing Uy
        let b = domain.add_node(&[1.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let e = domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        assert_eq!(
            ElementRod::new(&domain, &domain.elements[e], &p).err(),
            Some("Rod requires translation DOFs at both nodes")
        );

        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[1.0, 1.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let b = domain.add_node(&[1.0, 1.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let e = domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        assert_eq!(
            ElementRod::new(&domain, &domain.elements[e], &p).err(),
            Some("Rod length must be greater than zero")
        );
    }

    #[test]
    fn stiffness_is_correct_2d() {
        let domain = Samples::two_node_bar();
        let p = match domain.elements[0].param {
            Elem::Rod(p) => p,
            _ => panic!("expected Rod"),
        };
        let mut rod = ElementRod::new(&domain, &domain.elements[0], &p).unwrap();
        assert_eq!(rod.n_local_eq(), 4);
        assert_eq!(rod.nodes(), &[0, 1]);
        let mut kk = Matrix::new(4, 4);
        rod.calc_stiffness(&mut kk).unwrap();
        // horizontal bar with EA/L = 100: only Ux-Ux coupling
        let correct = Matrix::from(&[
            [100.0, 0.0, -100.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
            [-100.0, 0.0, 100.0, 0.0],
            [0.0, 0.0, 0.0, 0.0],
        ]);
        mat_approx_eq(&kk, &correct, 1e-13);
    }

    #[test]
    fn internal_forces_work() {
        let domain = Samples::two_node_bar();
        let p = ParamRod { young: 100.0, area: 1.0 };
        let mut rod = ElementRod::new(&domain, &domain.elements[0], &p).unwrap();
        let uu = Vector::from(&[0.0, 0.0, 0.25, 0.0]);
        let mut ff = Vector::new(4);
        rod.calc_internal_forces(&mut ff, &uu).unwrap();
        assert_eq!(ff.as_data(), &[-25.0, 0.0, 25.0, 0.0]);
    }
}

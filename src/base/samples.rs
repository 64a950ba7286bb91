use super::{Dof, Domain, Elem, ParamRod, ParamSpring};
use russell_lab::{Matrix, Vector};

/// Holds sample domains for testing and documentation
pub struct Samples;

impl Samples {
    /// Returns a two-node bar with the first node fully fixed
    ///
    /// ```text
    ///           EA = 100
    /// {fixed} 0─────────────1 (free)
    ///       (0,0)         (1,0)
    /// ```
    ///
    /// * 2D, both nodes carry (Ux, Uy)
    /// * two SP constraints pin Ux and Uy of node 0
    pub fn two_node_bar() -> Domain {
        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[0.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let b = domain.add_node(&[1.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let p = ParamRod { young: 100.0, area: 1.0 };
        domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        domain.add_sp_constraint(a, Dof::Ux, 0.0).unwrap();
        domain.add_sp_constraint(a, Dof::Uy, 0.0).unwrap();
        domain
    }

    /// Returns a three-node chain of two rods along the x-axis
    ///
    /// ```text
    ///        EA = 100     EA = 100
    /// {fix} 0──────────1──────────2
    ///     (0,0)      (1,0)      (2,0)
    /// ```
    ///
    /// * 2D, all nodes carry (Ux, Uy)
    /// * node 0 is fully fixed; Uy is fixed at nodes 1 and 2
    /// * each rod has axial stiffness EA/L = 100
    pub fn three_node_chain() -> Domain {
        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[0.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let b = domain.add_node(&[1.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let c = domain.add_node(&[2.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let p = ParamRod { young: 100.0, area: 1.0 };
        domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        domain.add_element(Elem::Rod(p), &[b, c]).unwrap();
        domain.add_sp_constraint(a, Dof::Ux, 0.0).unwrap();
        domain.add_sp_constraint(a, Dof::Uy, 0.0).unwrap();
        domain.add_sp_constraint(b, Dof::Uy, 0.0).unwrap();
        domain.add_sp_constraint(c, Dof::Uy, 0.0).unwrap();
        domain
    }

    /// Returns two disjoint spring segments tied by a multi-point constraint
    ///
    /// ```text
    ///        k = 100          k = 100
    /// {fix} 0────────1   2────────3
    ///      x=0      x=1 x=1      x=2
    ///                └─MP─┘  u₂ = u₁
    /// ```
    ///
    /// * 1D, all nodes carry Ux only
    /// * node 0 is fixed; the MP ties Ux of node 2 to Ux of node 1
    pub fn mp_tied_chain() -> Domain {
        let mut domain = Domain::new(1).unwrap();
        let a = domain.add_node(&[0.0], &[Dof::Ux]).unwrap();
        let b = domain.add_node(&[1.0], &[Dof::Ux]).unwrap();
        let c = domain.add_node(&[1.0], &[Dof::Ux]).unwrap();
        let d = domain.add_node(&[2.0], &[Dof::Ux]).unwrap();
        let p = ParamSpring {
            stiffness: 100.0,
            dof: Dof::Ux,
        };
        domain.add_element(Elem::Spring(p), &[a, b]).unwrap();
        domain.add_element(Elem::Spring(p), &[c, d]).unwrap();
        domain.add_sp_constraint(a, Dof::Ux, 0.0).unwrap();
        let cc = Matrix::from(&[[1.0]]);
        let gg = Vector::new(1);
        domain.add_mp_constraint(c, &[Dof::Ux], b, &[Dof::Ux], cc, gg).unwrap();
        domain
    }

    /// Returns two loaded springs plus a node hanging at their average
    ///
    /// ```text
    ///         k = 100
    ///  ┌──────────────────1 → F = 10
    ///  0 {fix}                         3 = (1 + 2)/2  (MRMP)
    ///  └──────────────────2 → F = 30
    ///         k = 200
    /// ```
    ///
    /// * 1D, all nodes carry Ux only
    /// * the MRMP pins Ux of node 3 to the average of Ux at nodes 1 and 2
    /// * expected solution: u₁ = 0.1, u₂ = 0.15, u₃ = 0.125
    pub fn mrmp_average() -> Domain {
        let mut domain = Domain::new(1).unwrap();
        let g = domain.add_node(&[0.0], &[Dof::Ux]).unwrap();
        let a = domain.add_node(&[1.0], &[Dof::Ux]).unwrap();
        let b = domain.add_node(&[2.0], &[Dof::Ux]).unwrap();
        let c = domain.add_node(&[1.5], &[Dof::Ux]).unwrap();
        let p1 = ParamSpring {
            stiffness: 100.0,
            dof: Dof::Ux,
        };
        let p2 = ParamSpring {
            stiffness: 200.0,
            dof: Dof::Ux,
        };
        domain.add_element(Elem::Spring(p1), &[g, a]).unwrap();
        domain.add_element(Elem::Spring(p2), &[g, b]).unwrap();
        domain.add_sp_constraint(g, Dof::Ux, 0.0).unwrap();
        let cc = Matrix::from(&[[0.5, 0.5]]);
        let gg = Vector::new(1);
        domain
            .add_mrmp_constraint(c, &[Dof::Ux], &[(a, vec![Dof::Ux]), (b, vec![Dof::Ux])], cc, gg)
            .unwrap();
        domain.add_nodal_load(a, Dof::Ux, 10.0).unwrap();
        domain.add_nodal_load(b, Dof::Ux, 30.0).unwrap();
        domain
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::Samples;

    #[test]
    fn two_node_bar_works() {
        let domain = Samples::two_node_bar();
        assert_eq!(domain.nodes.len(), 2);
        assert_eq!(domain.elements.len(), 1);
        assert_eq!(domain.sp_constraints.len(), 2);
    }

    #[test]
    fn three_node_chain_works() {
        let domain = Samples::three_node_chain();
        assert_eq!(domain.nodes.len(), 3);
        assert_eq!(domain.elements.len(), 2);
        assert_eq!(domain.sp_constraints.len(), 4);
    }

    #[test]
    fn mp_tied_chain_works() {
        let domain = Samples::mp_tied_chain();
        assert_eq!(domain.nodes.len(), 4);
        assert_eq!(domain.mp_constraints.len(), 1);
    }

    #[test]
    fn mrmp_average_works() {
        let domain = Samples::mrmp_average();
        assert_eq!(domain.nodes.len(), 4);
        assert_eq!(domain.mrmp_constraints.len(), 1);
        assert_eq!(domain.nodal_loads.len(), 2);
    }
}

use super::{FeContext, FeEquations, Integrator};
use crate::base::{Domain, MpConstraint, MrmpConstraint, SpConstraint};
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Implements the penalty stiffness of a single-point constraint
///
/// Injects `alpha` on the diagonal of the constrained DOF and the matching
/// load term `alpha · g(t)`. Enforcement is approximate: the residual
/// violation is proportional to `1/alpha`, while an exaggerated `alpha`
/// ill-conditions the global matrix.
pub struct FePenaltySp {
    /// Tag of the enforced single-point constraint
    pub sp_tag: usize,

    /// Penalty value in use (derived or user-given)
    pub alpha: f64,

    /// Connected group: the constrained node's group
    dof_group_tags: Vec<usize>,

    /// Local slot of the constrained DOF within the node
    slot: usize,

    /// Number of DOFs of the constrained node
    ndof: usize,

    /// Prescribed value and proportionality flag
    value: (f64, bool),

    /// Prescribed value at the pseudo-time of the last apply_load call
    g_current: f64,
}

impl FePenaltySp {
    /// Allocates a new instance
    pub fn new(domain: &Domain, sp: &SpConstraint, node_group: usize, alpha: f64) -> Result<Self, StrError> {
        let node = &domain.nodes[sp.node_id];
        Ok(FePenaltySp {
            sp_tag: sp.tag,
            alpha,
            dof_group_tags: vec![node_group],
            slot: node.local_dof(sp.dof)?,
            ndof: node.ndof(),
            value: (sp.value, sp.proportional),
            g_current: sp.value_at(0.0),
        })
    }
}

impl FeEquations for FePenaltySp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.ndof
    }

    /// Calculates the local tangent matrix (penalty diagonal)
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        kk.fill(0.0);
        kk.set(self.slot, self.slot, self.alpha);
        Ok(())
    }

    /// Calculates the local unbalance vector (penalty restoring force)
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        ff.fill(0.0);
        ff[self.slot] = self.alpha * (uu_local[self.slot] - self.g_current);
        Ok(())
    }

    /// Refreshes the load-dependent term `alpha · g(t)`
    fn apply_load(&mut self, t: f64) -> Result<(), StrError> {
        self.g_current = if self.value.1 { self.value.0 * t } else { self.value.0 };
        Ok(())
    }
}

/// Implements the penalty stiffness `alpha · BᵀB` of a multi-point constraint
///
/// `B` is the constraint row matrix over the local DOFs (+1 on constrained
/// slots, −C on retained slots), so the tangent couples the unconstrained
/// DOFs directly without extra unknowns.
pub struct FePenaltyMp {
    /// Tag of the enforced multi-point constraint
    pub mp_tag: usize,

    /// Penalty value in use (derived or user-given)
    pub alpha: f64,

    /// Connected groups: constrained and retained groups
    dof_group_tags: Vec<usize>,

    /// Constraint row matrix B (n_constrained × n_local)
    bb: Matrix,

    /// Constant offset g (copied from the constraint)
    gg: Vector,

    /// Dimension of the local system of equations
    n_local: usize,
}

impl FePenaltyMp {
    /// Allocates a new instance
    pub fn new(
        domain: &Domain,
        mp: &MpConstraint,
        constrained_group: usize,
        retained_group: usize,
        alpha: f64,
    ) -> Result<Self, StrError> {
        let node_c = &domain.nodes[mp.constrained_node];
        let node_r = &domain.nodes[mp.retained_node];
        let n_local = node_c.ndof() + node_r.ndof();
        let ncon = mp.n_constrained();
        let mut bb = Matrix::new(ncon, n_local);
        for k in 0..ncon {
            bb.set(k, node_c.local_dof(mp.constrained_dofs[k])?, 1.0);
            for j in 0..mp.n_retained() {
                let jj = node_c.ndof() + node_r.local_dof(mp.retained_dofs[j])?;
                bb.set(k, jj, -mp.cc.get(k, j));
            }
        }
        Ok(FePenaltyMp {
            mp_tag: mp.tag,
            alpha,
            dof_group_tags: vec![constrained_group, retained_group],
            bb,
            gg: mp.gg.clone(),
            n_local,
        })
    }
}

impl FeEquations for FePenaltyMp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.n_local
    }

    /// Calculates the local tangent matrix `alpha · BᵀB`
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        penalty_tangent(kk, &self.bb, self.alpha);
        Ok(())
    }

    /// Calculates the local unbalance vector `alpha · Bᵀ(B·u − g)`
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        penalty_unbalance(ff, &self.bb, &self.gg, uu_local, self.alpha);
        Ok(())
    }
}

/// Implements the penalty stiffness of a multi-retained-node constraint
pub struct FePenaltyMrmp {
    /// Tag of the enforced multi-retained-node constraint
    pub mrmp_tag: usize,

    /// Penalty value in use (derived or user-given)
    pub alpha: f64,

    /// Connected groups: constrained and retained groups (in order)
    dof_group_tags: Vec<usize>,

    /// Constraint row matrix B (n_constrained × n_local)
    bb: Matrix,

    /// Constant offset g (copied from the constraint)
    gg: Vector,

    /// Dimension of the local system of equations
    n_local: usize,
}

impl FePenaltyMrmp {
    /// Allocates a new instance
    ///
    /// `retained_groups` must follow the order of the constraint's retained list.
    pub fn new(
        domain: &Domain,
        mrmp: &MrmpConstraint,
        constrained_group: usize,
        retained_groups: &[usize],
        alpha: f64,
    ) -> Result<Self, StrError> {
        if retained_groups.len() != mrmp.retained.len() {
            return Err("number of retained groups must match the constraint");
        }
        let node_c = &domain.nodes[mrmp.constrained_node];
        let mut n_local = node_c.ndof();
        let mut r_positions = Vec::new();
        for (node_id, dofs) in &mrmp.retained {
            let node = &domain.nodes[*node_id];
            for dof in dofs {
                r_positions.push(n_local + node.local_dof(*dof)?);
            }
            n_local += node.ndof();
        }
        let ncon = mrmp.n_constrained();
        let mut bb = Matrix::new(ncon, n_local);
        for k in 0..ncon {
            bb.set(k, node_c.local_dof(mrmp.constrained_dofs[k])?, 1.0);
            for (j, jj) in r_positions.iter().enumerate() {
                bb.set(k, *jj, -mrmp.cc.get(k, j));
            }
        }
        let mut dof_group_tags = vec![constrained_group];
        dof_group_tags.extend_from_slice(retained_groups);
        Ok(FePenaltyMrmp {
            mrmp_tag: mrmp.tag,
            alpha,
            dof_group_tags,
            bb,
            gg: mrmp.gg.clone(),
            n_local,
        })
    }
}

impl FeEquations for FePenaltyMrmp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.n_local
    }

    /// Calculates the local tangent matrix `alpha · BᵀB`
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        penalty_tangent(kk, &self.bb, self.alpha);
        Ok(())
    }

    /// Calculates the local unbalance vector `alpha · Bᵀ(B·u − g)`
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        penalty_unbalance(ff, &self.bb, &self.gg, uu_local, self.alpha);
        Ok(())
    }
}

/// Fills the penalty tangent `alpha · BᵀB`
fn penalty_tangent(kk: &mut Matrix, bb: &Matrix, alpha: f64) {
    let (ncon, n_local) = bb.dims();
    kk.fill(0.0);
    for i in 0..n_local {
        for j in 0..n_local {
            let mut value = 0.0;
            for k in 0..ncon {
                value += bb.get(k, i) * bb.get(k, j);
            }
            if value != 0.0 {
                kk.set(i, j, alpha * value);
            }
        }
    }
}

/// Fills the penalty unbalance `alpha · Bᵀ(B·u − g)`
fn penalty_unbalance(ff: &mut Vector, bb: &Matrix, gg: &Vector, uu_local: &Vector, alpha: f64) {
    let (ncon, n_local) = bb.dims();
    ff.fill(0.0);
    for k in 0..ncon {
        let mut violation = -gg[k];
        for j in 0..n_local {
            violation += bb.get(k, j) * uu_local[j];
        }
        for i in 0..n_local {
            ff[i] += alpha * bb.get(k, i) * violation;
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{FePenaltyMp, FePenaltyMrmp, FePenaltySp};
    use crate::base::{Dof, Samples};
    use crate::fem::{FeContext, FeEquations, LoadControl};
    use russell_lab::{Matrix, Vector};

    #[test]
    fn sp_tangent_and_unbalance_work() {
        let domain = Samples::two_node_bar();
        let sp = domain.sp_constraints[1]; // Uy of node 0 prescribed as 0.0
        let mut fe = FePenaltySp::new(&domain, &sp, 0, 1e6).unwrap();
        assert_eq!(fe.dof_group_tags(), &[0]);
        assert_eq!(fe.n_local_eq(), 2);

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(2, 2);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        assert_eq!(kk.get(1, 1), 1e6);
        assert_eq!(kk.get(0, 0), 0.0);

        let uu = Vector::from(&[0.0, 0.5]);
        let mut ff = Vector::new(2);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[0.0, 500000.0]);
    }

    #[test]
    fn sp_apply_load_refreshes_the_prescribed_value() {
        let mut domain = Samples::two_node_bar();
        let tag = domain.add_sp_constraint(1, Dof::Ux, 0.25).unwrap();
        let index = domain.sp_constraints.iter().position(|sp| sp.tag == tag).unwrap();
        domain.sp_constraints[index].proportional = true;
        let sp = domain.sp_constraints[index];
        let mut fe = FePenaltySp::new(&domain, &sp, 1, 1e3).unwrap();
        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let uu = Vector::new(2);
        let mut ff = Vector::new(2);

        // before apply_load: g(0) = 0
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[0.0, 0.0]);

        // after apply_load at t = 0.5: g = 0.125
        fe.apply_load(0.5).unwrap();
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[-125.0, 0.0]);
    }

    #[test]
    fn mp_tangent_and_unbalance_work() {
        let domain = Samples::mp_tied_chain();
        let mp = &domain.mp_constraints[0]; // u₂ = u₁
        let mut fe = FePenaltyMp::new(&domain, mp, 2, 1, 1e4).unwrap();
        assert_eq!(fe.dof_group_tags(), &[2, 1]);
        assert_eq!(fe.n_local_eq(), 2);

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(2, 2);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        // α·BᵀB with B = [1, -1]
        assert_eq!(kk.get(0, 0), 1e4);
        assert_eq!(kk.get(0, 1), -1e4);
        assert_eq!(kk.get(1, 0), -1e4);
        assert_eq!(kk.get(1, 1), 1e4);

        let uu = Vector::from(&[0.375, 0.125]);
        let mut ff = Vector::new(2);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[2500.0, -2500.0]);
    }

    #[test]
    fn mrmp_tangent_and_unbalance_work() {
        let domain = Samples::mrmp_average();
        let mrmp = &domain.mrmp_constraints[0]; // u₃ = (u₁ + u₂)/2
        let mut fe = FePenaltyMrmp::new(&domain, mrmp, 3, &[1, 2], 1e4).unwrap();
        assert_eq!(fe.dof_group_tags(), &[3, 1, 2]);
        assert_eq!(fe.n_local_eq(), 3);

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(3, 3);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        // B = [1, -0.5, -0.5]
        assert_eq!(kk.get(0, 0), 1e4);
        assert_eq!(kk.get(0, 1), -0.5e4);
        assert_eq!(kk.get(1, 1), 0.25e4);
        assert_eq!(kk.get(1, 2), 0.25e4);

        let uu = Vector::from(&[0.5, 0.25, 0.25]);
        let mut ff = Vector::new(3);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[2500.0, -1250.0, -1250.0]);
    }

    #[test]
    fn mrmp_new_captures_errors() {
        let domain = Samples::mrmp_average();
        let mrmp = &domain.mrmp_constraints[0];
        assert_eq!(
            FePenaltyMrmp::new(&domain, mrmp, 3, &[1], 1e4).err(),
            Some("number of retained groups must match the constraint")
        );
    }
}

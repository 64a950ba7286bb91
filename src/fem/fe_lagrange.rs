use super::{FeContext, FeEquations, Integrator};
use crate::base::{Domain, MpConstraint, MrmpConstraint, SpConstraint};
use crate::StrError;
use russell_lab::{Matrix, Vector};

/// Implements the Lagrange-multiplier row/column of a single-point constraint
///
/// The local system spans all DOFs of the constrained node plus one multiplier
/// unknown. With scaling factor `alpha`, the tangent carries `alpha` at the
/// (constrained DOF, multiplier) couple, making the global system symmetric
/// indefinite; enforcement is exact to solver precision.
pub struct FeLagrangeSp {
    /// Tag of the enforced single-point constraint
    pub sp_tag: usize,

    /// Connected groups: the node's group and the multiplier group
    dof_group_tags: Vec<usize>,

    /// Local slot of the constrained DOF within the node
    slot: usize,

    /// Number of DOFs of the constrained node
    ndof: usize,

    /// Scaling factor
    alpha: f64,

    /// Prescribed value and proportionality flag
    value: (f64, bool),
}

impl FeLagrangeSp {
    /// Allocates a new instance
    pub fn new(domain: &Domain, sp: &SpConstraint, node_group: usize, lagrange_group: usize, alpha: f64) -> Result<Self, StrError> {
        let node = &domain.nodes[sp.node_id];
        Ok(FeLagrangeSp {
            sp_tag: sp.tag,
            dof_group_tags: vec![node_group, lagrange_group],
            slot: node.local_dof(sp.dof)?,
            ndof: node.ndof(),
            alpha,
            value: (sp.value, sp.proportional),
        })
    }

    /// Returns the prescribed value at the given pseudo-time
    fn prescribed_at(&self, t: f64) -> f64 {
        if self.value.1 {
            self.value.0 * t
        } else {
            self.value.0
        }
    }
}

impl FeEquations for FeLagrangeSp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.ndof + 1
    }

    /// Calculates the local tangent matrix (constraint row and column)
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        kk.fill(0.0);
        kk.set(self.slot, self.ndof, self.alpha);
        kk.set(self.ndof, self.slot, self.alpha);
        Ok(())
    }

    /// Calculates the local unbalance vector
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        ctx: &FeContext,
    ) -> Result<(), StrError> {
        ff.fill(0.0);
        let lambda = uu_local[self.ndof];
        ff[self.slot] = self.alpha * lambda;
        ff[self.ndof] = self.alpha * (uu_local[self.slot] - self.prescribed_at(ctx.domain.t));
        Ok(())
    }
}

/// Implements the Lagrange-multiplier rows/columns of a multi-point constraint
///
/// The local system spans all DOFs of the constrained node, all DOFs of the
/// retained node, and one multiplier per scalar constraint equation.
pub struct FeLagrangeMp {
    /// Tag of the enforced multi-point constraint
    pub mp_tag: usize,

    /// Connected groups: constrained, retained, and multiplier groups
    dof_group_tags: Vec<usize>,

    /// Local slots of the constrained DOFs within the constrained node
    c_slots: Vec<usize>,

    /// Local slots of the retained DOFs within the retained node
    r_slots: Vec<usize>,

    /// Number of DOFs of the constrained node
    ndof_c: usize,

    /// Number of DOFs of the retained node
    ndof_r: usize,

    /// Coefficient matrix C (copied from the constraint)
    cc: Matrix,

    /// Constant offset g (copied from the constraint)
    gg: Vector,

    /// Scaling factor
    alpha: f64,
}

impl FeLagrangeMp {
    /// Allocates a new instance
    pub fn new(
        domain: &Domain,
        mp: &MpConstraint,
        constrained_group: usize,
        retained_group: usize,
        lagrange_group: usize,
        alpha: f64,
    ) -> Result<Self, StrError> {
        let node_c = &domain.nodes[mp.constrained_node];
        let node_r = &domain.nodes[mp.retained_node];
        let c_slots = mp
            .constrained_dofs
            .iter()
            .map(|dof| node_c.local_dof(*dof))
            .collect::<Result<Vec<_>, _>>()?;
        let r_slots = mp
            .retained_dofs
            .iter()
            .map(|dof| node_r.local_dof(*dof))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FeLagrangeMp {
            mp_tag: mp.tag,
            dof_group_tags: vec![constrained_group, retained_group, lagrange_group],
            c_slots,
            r_slots,
            ndof_c: node_c.ndof(),
            ndof_r: node_r.ndof(),
            cc: mp.cc.clone(),
            gg: mp.gg.clone(),
            alpha,
        })
    }
}

impl FeEquations for FeLagrangeMp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.ndof_c + self.ndof_r + self.c_slots.len()
    }

    /// Calculates the local tangent matrix (constraint rows and columns)
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        kk.fill(0.0);
        let off_l = self.ndof_c + self.ndof_r;
        for k in 0..self.c_slots.len() {
            let i = self.c_slots[k];
            kk.set(i, off_l + k, self.alpha);
            kk.set(off_l + k, i, self.alpha);
            for j in 0..self.r_slots.len() {
                let jj = self.ndof_c + self.r_slots[j];
                kk.set(jj, off_l + k, -self.alpha * self.cc.get(k, j));
                kk.set(off_l + k, jj, -self.alpha * self.cc.get(k, j));
            }
        }
        Ok(())
    }

    /// Calculates the local unbalance vector
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        ff.fill(0.0);
        let off_l = self.ndof_c + self.ndof_r;
        for k in 0..self.c_slots.len() {
            let lambda = uu_local[off_l + k];
            let mut violation = uu_local[self.c_slots[k]] - self.gg[k];
            ff[self.c_slots[k]] += self.alpha * lambda;
            for j in 0..self.r_slots.len() {
                let jj = self.ndof_c + self.r_slots[j];
                violation -= self.cc.get(k, j) * uu_local[jj];
                ff[jj] -= self.alpha * self.cc.get(k, j) * lambda;
            }
            ff[off_l + k] = self.alpha * violation;
        }
        Ok(())
    }
}

/// Implements the Lagrange-multiplier rows/columns of a multi-retained-node constraint
///
/// Generalizes [FeLagrangeMp]: the local system spans the constrained node,
/// every retained node, and one multiplier per scalar constraint equation.
pub struct FeLagrangeMrmp {
    /// Tag of the enforced multi-retained-node constraint
    pub mrmp_tag: usize,

    /// Connected groups: constrained, retained (in order), and multiplier groups
    dof_group_tags: Vec<usize>,

    /// Local slots of the constrained DOFs within the constrained node
    c_slots: Vec<usize>,

    /// Per retained DOF: (local offset of its node block, slot within the node)
    r_positions: Vec<(usize, usize)>,

    /// Number of DOFs of the constrained node
    ndof_c: usize,

    /// Total number of DOFs across all retained nodes
    ndof_r_total: usize,

    /// Coefficient matrix C (copied from the constraint)
    cc: Matrix,

    /// Constant offset g (copied from the constraint)
    gg: Vector,

    /// Scaling factor
    alpha: f64,
}

impl FeLagrangeMrmp {
    /// Allocates a new instance
    ///
    /// `retained_groups` must follow the order of the constraint's retained list.
    pub fn new(
        domain: &Domain,
        mrmp: &MrmpConstraint,
        constrained_group: usize,
        retained_groups: &[usize],
        lagrange_group: usize,
        alpha: f64,
    ) -> Result<Self, StrError> {
        if retained_groups.len() != mrmp.retained.len() {
            return Err("number of retained groups must match the constraint");
        }
        let node_c = &domain.nodes[mrmp.constrained_node];
        let c_slots = mrmp
            .constrained_dofs
            .iter()
            .map(|dof| node_c.local_dof(*dof))
            .collect::<Result<Vec<_>, _>>()?;
        let mut dof_group_tags = vec![constrained_group];
        dof_group_tags.extend_from_slice(retained_groups);
        dof_group_tags.push(lagrange_group);
        let mut r_positions = Vec::new();
        let mut offset = node_c.ndof();
        for (node_id, dofs) in &mrmp.retained {
            let node = &domain.nodes[*node_id];
            for dof in dofs {
                r_positions.push((offset, node.local_dof(*dof)?));
            }
            offset += node.ndof();
        }
        Ok(FeLagrangeMrmp {
            mrmp_tag: mrmp.tag,
            dof_group_tags,
            c_slots,
            r_positions,
            ndof_c: node_c.ndof(),
            ndof_r_total: offset - node_c.ndof(),
            cc: mrmp.cc.clone(),
            gg: mrmp.gg.clone(),
            alpha,
        })
    }
}

impl FeEquations for FeLagrangeMrmp {
    /// Returns the tags of the connected DofGroups
    fn dof_group_tags(&self) -> &[usize] {
        &self.dof_group_tags
    }

    /// Returns the dimension of the local system of equations
    fn n_local_eq(&self) -> usize {
        self.ndof_c + self.ndof_r_total + self.c_slots.len()
    }

    /// Calculates the local tangent matrix (constraint rows and columns)
    fn calc_tangent(&mut self, kk: &mut Matrix, _: &dyn Integrator, _: &FeContext) -> Result<(), StrError> {
        kk.fill(0.0);
        let off_l = self.ndof_c + self.ndof_r_total;
        for k in 0..self.c_slots.len() {
            let i = self.c_slots[k];
            kk.set(i, off_l + k, self.alpha);
            kk.set(off_l + k, i, self.alpha);
            for (j, (block, slot)) in self.r_positions.iter().enumerate() {
                let jj = block + slot;
                kk.set(jj, off_l + k, -self.alpha * self.cc.get(k, j));
                kk.set(off_l + k, jj, -self.alpha * self.cc.get(k, j));
            }
        }
        Ok(())
    }

    /// Calculates the local unbalance vector
    fn calc_unbalance(
        &mut self,
        ff: &mut Vector,
        uu_local: &Vector,
        _: &dyn Integrator,
        _: &FeContext,
    ) -> Result<(), StrError> {
        ff.fill(0.0);
        let off_l = self.ndof_c + self.ndof_r_total;
        for k in 0..self.c_slots.len() {
            let lambda = uu_local[off_l + k];
            let mut violation = uu_local[self.c_slots[k]] - self.gg[k];
            ff[self.c_slots[k]] += self.alpha * lambda;
            for (j, (block, slot)) in self.r_positions.iter().enumerate() {
                let jj = block + slot;
                violation -= self.cc.get(k, j) * uu_local[jj];
                ff[jj] -= self.alpha * self.cc.get(k, j) * lambda;
            }
            ff[off_l + k] = self.alpha * violation;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{FeLagrangeMp, FeLagrangeMrmp, FeLagrangeSp};
    use crate::base::Samples;
    use crate::fem::{FeContext, FeEquations, LoadControl};
    use russell_lab::{Matrix, Vector};

    #[test]
    fn sp_tangent_and_unbalance_work() {
        let mut domain = Samples::two_node_bar();
        domain.apply_load(1.0);
        let sp = domain.sp_constraints[0]; // Ux of node 0 prescribed as 0.0
        let mut fe = FeLagrangeSp::new(&domain, &sp, 0, 2, 10.0).unwrap();
        assert_eq!(fe.dof_group_tags(), &[0, 2]);
        assert_eq!(fe.n_local_eq(), 3);

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(3, 3);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        assert_eq!(kk.get(0, 2), 10.0);
        assert_eq!(kk.get(2, 0), 10.0);
        assert_eq!(kk.get(0, 0), 0.0);

        // u_x = 0.25 violates the constraint; λ = 2
        let uu = Vector::from(&[0.25, 0.0, 2.0]);
        let mut ff = Vector::new(3);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[20.0, 0.0, 2.5]);
    }

    #[test]
    fn sp_proportional_value_follows_time() {
        let mut domain = Samples::two_node_bar();
        let tag = domain.add_sp_constraint(1, crate::base::Dof::Ux, 0.5).unwrap();
        let index = domain.sp_constraints.iter().position(|sp| sp.tag == tag).unwrap();
        domain.sp_constraints[index].proportional = true;
        domain.apply_load(2.0); // prescribed value = 1.0
        let sp = domain.sp_constraints[index];
        let mut fe = FeLagrangeSp::new(&domain, &sp, 1, 2, 1.0).unwrap();
        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let uu = Vector::new(3);
        let mut ff = Vector::new(3);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[0.0, 0.0, -1.0]);
    }

    #[test]
    fn mp_tangent_and_unbalance_work() {
        let domain = Samples::mp_tied_chain();
        let mp = &domain.mp_constraints[0]; // u₂ = u₁
        let mut fe = FeLagrangeMp::new(&domain, mp, 2, 1, 4, 1.0).unwrap();
        assert_eq!(fe.dof_group_tags(), &[2, 1, 4]);
        assert_eq!(fe.n_local_eq(), 3); // u_c, u_r, λ

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(3, 3);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        assert_eq!(kk.get(0, 2), 1.0);
        assert_eq!(kk.get(1, 2), -1.0);
        assert_eq!(kk.get(2, 0), 1.0);
        assert_eq!(kk.get(2, 1), -1.0);

        // u_c = 0.5, u_r = 0.25 → violation 0.25; λ = 5
        let uu = Vector::from(&[0.5, 0.25, 5.0]);
        let mut ff = Vector::new(3);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[5.0, -5.0, 0.25]);
    }

    #[test]
    fn mrmp_tangent_and_unbalance_work() {
        let domain = Samples::mrmp_average();
        let mrmp = &domain.mrmp_constraints[0]; // u₃ = (u₁ + u₂)/2
        let mut fe = FeLagrangeMrmp::new(&domain, mrmp, 3, &[1, 2], 4, 2.0).unwrap();
        assert_eq!(fe.dof_group_tags(), &[3, 1, 2, 4]);
        assert_eq!(fe.n_local_eq(), 4); // u_c, u_r1, u_r2, λ

        let ctx = FeContext { domain: &domain };
        let integrator = LoadControl::new();
        let mut kk = Matrix::new(4, 4);
        fe.calc_tangent(&mut kk, &integrator, &ctx).unwrap();
        assert_eq!(kk.get(0, 3), 2.0);
        assert_eq!(kk.get(1, 3), -1.0);
        assert_eq!(kk.get(2, 3), -1.0);

        // u_c = 0.5, u_r1 = 0.25, u_r2 = 0.25 → violation 0.25; λ = 1
        let uu = Vector::from(&[0.5, 0.25, 0.25, 1.0]);
        let mut ff = Vector::new(4);
        fe.calc_unbalance(&mut ff, &uu, &integrator, &ctx).unwrap();
        assert_eq!(ff.as_data(), &[2.0, -1.0, -1.0, 0.5]);
    }

    #[test]
    fn mrmp_new_captures_errors() {
        let domain = Samples::mrmp_average();
        let mrmp = &domain.mrmp_constraints[0];
        assert_eq!(
            FeLagrangeMrmp::new(&domain, mrmp, 3, &[1], 4, 1.0).err(),
            Some("number of retained groups must match the constraint")
        );
    }
}

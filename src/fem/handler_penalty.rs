use super::constraint_handler::{check_conflicts, create_node_groups, create_plain_fes, fill_summary, Created, HandleSummary};
use super::{AnalysisModel, FeElement, FePenaltyMp, FePenaltyMrmp, FePenaltySp};
use crate::base::{Config, Domain};
use crate::StrError;
use std::collections::HashMap;

/// Implements the penalty constraint strategy (fixed and auto-scaled)
///
/// No extra unknowns: each constraint contributes `alpha · BᵀB` directly to
/// the unconstrained DOFs. In auto mode the penalty is derived in two passes:
/// pass 1 surveys the plain FeElements for the max diagonal stiffness at the
/// constrained DOFs, pass 2 builds the penalty elements with
/// `10^auto_penalty_oom × max(neighboring stiffness)`, keeping the penalty
/// well-scaled relative to the surrounding physical stiffness. A configured
/// `user_penalty` overrides the survey. The violation left in the solution is
/// proportional to `1/alpha`; an exaggerated `alpha` ill-conditions the
/// matrix, so neither extreme is hidden from the caller.
pub struct PenaltyHandler {
    /// Auto-scaled mode (survey-based) instead of a fixed penalty
    auto: bool,

    /// Enables the stiffness survey (auto mode)
    auto_penalty: bool,

    /// Penalty value of the fixed mode
    fixed_alpha: f64,

    /// Orders of magnitude above the surveyed stiffness (auto mode)
    oom: f64,

    /// Fixed penalty overriding the survey when greater than zero (auto mode)
    user_penalty: f64,

    /// Prints the derived penalty values
    verbose: bool,

    /// Tags created by this handler
    pub(crate) created: Created,
}

impl PenaltyHandler {
    /// Allocates a fixed-penalty instance
    pub fn new_fixed(config: &Config) -> Self {
        PenaltyHandler {
            auto: false,
            auto_penalty: false,
            fixed_alpha: config.penalty_alpha,
            oom: config.auto_penalty_oom,
            user_penalty: config.user_penalty,
            verbose: config.verbose,
            created: Created::new(),
        }
    }

    /// Allocates an auto-penalty instance
    pub fn new_auto(config: &Config) -> Self {
        PenaltyHandler {
            auto: true,
            auto_penalty: config.auto_penalty,
            fixed_alpha: config.penalty_alpha,
            oom: config.auto_penalty_oom,
            user_penalty: config.user_penalty,
            verbose: config.verbose,
            created: Created::new(),
        }
    }

    /// Rebuilds all FeElements and DofGroups for the current domain
    pub fn handle(
        &mut self,
        domain: &mut Domain,
        model: &mut AnalysisModel,
        nodes_last: Option<&[usize]>,
    ) -> Result<HandleSummary, StrError> {
        if domain.nodes.is_empty() {
            return Err("domain has no nodes");
        }
        check_conflicts(domain)?;
        self.created.remove_all(model)?;
        model.nodes_numbered_last = match nodes_last {
            Some(ids) => ids.to_vec(),
            None => Vec::new(),
        };

        let mut summary = HandleSummary::new();
        create_node_groups(domain, model, &mut self.created)?;
        let mut fe_tag = create_plain_fes(domain, model, &mut self.created, &mut summary, self.verbose)?;

        // pass 1: derive one penalty value per constraint
        let (sp_alphas, mp_alphas, mrmp_alphas) = self.derive_penalties(domain, model)?;

        // pass 2: build the penalty elements
        for (i, sp) in domain.sp_constraints.iter().enumerate() {
            let node_group = model.node_group_tag(sp.node_id)?;
            let fe = FePenaltySp::new(domain, sp, node_group, sp_alphas[i])?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            fe_tag += 1;
        }
        for (i, mp) in domain.mp_constraints.iter().enumerate() {
            let constrained_group = model.node_group_tag(mp.constrained_node)?;
            let retained_group = model.node_group_tag(mp.retained_node)?;
            let fe = FePenaltyMp::new(domain, mp, constrained_group, retained_group, mp_alphas[i])?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            fe_tag += 1;
        }
        for (i, mrmp) in domain.mrmp_constraints.iter().enumerate() {
            let constrained_group = model.node_group_tag(mrmp.constrained_node)?;
            let retained_groups = mrmp
                .retained
                .iter()
                .map(|(node_id, _)| model.node_group_tag(*node_id))
                .collect::<Result<Vec<_>, _>>()?;
            let fe = FePenaltyMrmp::new(domain, mrmp, constrained_group, &retained_groups, mrmp_alphas[i])?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            fe_tag += 1;
        }

        fill_summary(&mut summary, model);
        Ok(summary)
    }

    /// Forwards load application to the penalty elements
    pub fn apply_load(&mut self, model: &mut AnalysisModel, t: f64) -> Result<(), StrError> {
        for tag in &self.created.constraint_fes {
            model.get_fe_mut(*tag)?.actual.apply_load(t)?;
        }
        Ok(())
    }

    /// Derives the penalty value of every constraint (pass 1)
    fn derive_penalties(
        &self,
        domain: &Domain,
        model: &mut AnalysisModel,
    ) -> Result<(Vec<f64>, Vec<f64>, Vec<f64>), StrError> {
        let n_sp = domain.sp_constraints.len();
        let n_mp = domain.mp_constraints.len();
        let n_mrmp = domain.mrmp_constraints.len();

        // fixed mode, or auto mode with a user-given penalty
        if !self.auto {
            return Ok((
                vec![self.fixed_alpha; n_sp],
                vec![self.fixed_alpha; n_mp],
                vec![self.fixed_alpha; n_mrmp],
            ));
        }
        if self.user_penalty > 0.0 {
            return Ok((
                vec![self.user_penalty; n_sp],
                vec![self.user_penalty; n_mp],
                vec![self.user_penalty; n_mrmp],
            ));
        }
        if !self.auto_penalty {
            return Err("user_penalty must be set when auto_penalty is disabled");
        }

        // survey the plain elements for the diagonal stiffness at each DOF
        let mut surveys = Vec::new();
        for tag in &self.created.plain_fes {
            let fe = model.get_fe_mut(*tag)?;
            if let Some(diag) = fe.actual.diagonal_stiffness()? {
                surveys.push((fe.actual.dof_group_tags().to_vec(), diag));
            }
        }
        let mut max_diag: HashMap<(usize, usize), f64> = HashMap::new();
        let mut global_max = 0.0;
        for (group_tags, diag) in &surveys {
            let mut offset = 0;
            for group_tag in group_tags {
                let group = model.get_dof_group(*group_tag)?;
                let node_id = group.node_id().ok_or("survey found a group without a node")?;
                for slot in 0..group.n_eq() {
                    let value = f64::abs(diag[offset + slot]);
                    let entry = max_diag.entry((node_id, slot)).or_insert(0.0);
                    if value > *entry {
                        *entry = value;
                    }
                    if value > global_max {
                        global_max = value;
                    }
                }
                offset += group.n_eq();
            }
        }

        // scale: 10^oom × max(neighboring stiffness), falling back to the
        // global max when the constrained DOF itself sees no stiffness
        let scale = f64::powf(10.0, self.oom);
        let derive = |neighbors: &[(usize, usize)]| -> Result<f64, StrError> {
            let mut k_max = 0.0;
            for key in neighbors {
                if let Some(value) = max_diag.get(key) {
                    if *value > k_max {
                        k_max = *value;
                    }
                }
            }
            if k_max == 0.0 {
                k_max = global_max;
            }
            if k_max == 0.0 {
                return Err("cannot derive auto penalty because no stiffness was surveyed");
            }
            Ok(scale * k_max)
        };

        let mut sp_alphas = Vec::with_capacity(n_sp);
        for sp in &domain.sp_constraints {
            let slot = domain.nodes[sp.node_id].local_dof(sp.dof)?;
            let alpha = derive(&[(sp.node_id, slot)])?;
            if self.verbose {
                println!("auto penalty for SP constraint {} = {:e}", sp.tag, alpha);
            }
            sp_alphas.push(alpha);
        }
        let mut mp_alphas = Vec::with_capacity(n_mp);
        for mp in &domain.mp_constraints {
            let mut neighbors = Vec::new();
            for dof in &mp.constrained_dofs {
                neighbors.push((mp.constrained_node, domain.nodes[mp.constrained_node].local_dof(*dof)?));
            }
            for dof in &mp.retained_dofs {
                neighbors.push((mp.retained_node, domain.nodes[mp.retained_node].local_dof(*dof)?));
            }
            let alpha = derive(&neighbors)?;
            if self.verbose {
                println!("auto penalty for MP constraint {} = {:e}", mp.tag, alpha);
            }
            mp_alphas.push(alpha);
        }
        let mut mrmp_alphas = Vec::with_capacity(n_mrmp);
        for mrmp in &domain.mrmp_constraints {
            let mut neighbors = Vec::new();
            for dof in &mrmp.constrained_dofs {
                neighbors.push((mrmp.constrained_node, domain.nodes[mrmp.constrained_node].local_dof(*dof)?));
            }
            for (node_id, dofs) in &mrmp.retained {
                for dof in dofs {
                    neighbors.push((*node_id, domain.nodes[*node_id].local_dof(*dof)?));
                }
            }
            let alpha = derive(&neighbors)?;
            if self.verbose {
                println!("auto penalty for MRMP constraint {} = {:e}", mrmp.tag, alpha);
            }
            mrmp_alphas.push(alpha);
        }
        Ok((sp_alphas, mp_alphas, mrmp_alphas))
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::PenaltyHandler;
    use crate::base::{Config, HandlerKind, Samples};
    use crate::fem::{AnalysisModel, PlainNumberer};

    #[test]
    fn fixed_handle_two_node_bar_works() {
        let mut config = Config::new();
        config.set_handler(HandlerKind::Penalty);
        let mut handler = PenaltyHandler::new_fixed(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        let summary = handler.handle(&mut domain, &mut model, None).unwrap();
        assert!(summary.is_clean());

        // no extra groups; 1 plain FE + 2 penalty FEs
        assert_eq!(summary.n_dof_groups, 2);
        assert_eq!(summary.n_lagrange_groups, 0);
        assert_eq!(summary.n_fes, 3);

        // all 4 physical equations are numbered
        let numberer = PlainNumberer::new();
        assert_eq!(numberer.number(&mut model).unwrap(), 4);
        model.finalize_ids().unwrap();
        model.check_equation_coverage().unwrap();
    }

    #[test]
    fn auto_penalty_scales_with_neighboring_stiffness() {
        let mut config = Config::new();
        config.set_handler(HandlerKind::AutoPenalty);
        let mut handler = PenaltyHandler::new_auto(&config);
        let mut domain = Samples::mrmp_average();
        let mut model = AnalysisModel::new();
        handler.handle(&mut domain, &mut model, None).unwrap();

        // springs have k = 100 and 200; oom = 3
        let (sp_alphas, _, mrmp_alphas) = handler.derive_penalties(&domain, &mut model).unwrap();
        assert_eq!(sp_alphas, &[1e3 * 200.0]); // grounded node touches both springs
        assert_eq!(mrmp_alphas, &[1e3 * 200.0]); // retained nodes see 100 and 200
    }

    #[test]
    fn auto_penalty_falls_back_to_the_global_max() {
        let mut config = Config::new();
        config.set_handler(HandlerKind::AutoPenalty);
        let mut handler = PenaltyHandler::new_auto(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        handler.handle(&mut domain, &mut model, None).unwrap();

        // Uy of node 0 sees no stiffness (bar along x): fall back to the max
        let (sp_alphas, _, _) = handler.derive_penalties(&domain, &mut model).unwrap();
        assert_eq!(sp_alphas, &[1e5, 1e5]);
    }

    #[test]
    fn user_penalty_overrides_the_survey() {
        let mut config = Config::new();
        config.set_handler(HandlerKind::AutoPenalty);
        config.set_user_penalty(7e9).unwrap();
        let mut handler = PenaltyHandler::new_auto(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        handler.handle(&mut domain, &mut model, None).unwrap();
        let (sp_alphas, _, _) = handler.derive_penalties(&domain, &mut model).unwrap();
        assert_eq!(sp_alphas, &[7e9, 7e9]);
    }

    #[test]
    fn apply_load_reaches_the_penalty_elements() {
        let mut config = Config::new();
        config.set_handler(HandlerKind::Penalty);
        let mut handler = PenaltyHandler::new_fixed(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        handler.handle(&mut domain, &mut model, None).unwrap();
        handler.apply_load(&mut model, 0.5).unwrap();
    }
}

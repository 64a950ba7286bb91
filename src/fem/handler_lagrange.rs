use super::constraint_handler::{check_conflicts, create_node_groups, create_plain_fes, fill_summary, Created, HandleSummary};
use super::{AnalysisModel, ConstraintRef, DofGroup, FeElement, FeLagrangeMp, FeLagrangeMrmp, FeLagrangeSp};
use crate::base::{Config, Domain};
use crate::StrError;

/// Implements the Lagrange-multiplier constraint strategy
///
/// Adds one multiplier DofGroup per constraint (one extra unknown per scalar
/// constraint equation) plus one FeElement assembling the constraint
/// row/column scaled by `alpha`. The resulting global system is symmetric
/// indefinite; enforcement is exact to solver precision.
pub struct LagrangeHandler {
    /// Scaling factor for the multiplier rows/columns
    alpha: f64,

    /// Prints information while handling
    verbose: bool,

    /// Tags created by this handler
    pub(crate) created: Created,
}

impl LagrangeHandler {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        LagrangeHandler {
            alpha: config.lagrange_alpha,
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
        let mut group_tag = create_node_groups(domain, model, &mut self.created)?;
        let mut fe_tag = create_plain_fes(domain, model, &mut self.created, &mut summary, self.verbose)?;

        // one multiplier group + one constraint row/column per SP constraint
        for sp in &domain.sp_constraints {
            let node_group = model.node_group_tag(sp.node_id)?;
            model.add_dof_group(DofGroup::new_lagrange(group_tag, ConstraintRef::Sp(sp.tag), 1))?;
            self.created.constraint_groups.push(group_tag);
            let fe = FeLagrangeSp::new(domain, sp, node_group, group_tag, self.alpha)?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            group_tag += 1;
            fe_tag += 1;
        }

        // one multiplier group (n_constrained unknowns) per MP constraint
        for mp in &domain.mp_constraints {
            let constrained_group = model.node_group_tag(mp.constrained_node)?;
            let retained_group = model.node_group_tag(mp.retained_node)?;
            model.add_dof_group(DofGroup::new_lagrange(
                group_tag,
                ConstraintRef::Mp(mp.tag),
                mp.n_constrained(),
            ))?;
            self.created.constraint_groups.push(group_tag);
            let fe = FeLagrangeMp::new(domain, mp, constrained_group, retained_group, group_tag, self.alpha)?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            group_tag += 1;
            fe_tag += 1;
        }

        // one multiplier group (n_constrained unknowns) per MRMP constraint
        for mrmp in &domain.mrmp_constraints {
            let constrained_group = model.node_group_tag(mrmp.constrained_node)?;
            let retained_groups = mrmp
                .retained
                .iter()
                .map(|(node_id, _)| model.node_group_tag(*node_id))
                .collect::<Result<Vec<_>, _>>()?;
            model.add_dof_group(DofGroup::new_lagrange(
                group_tag,
                ConstraintRef::Mrmp(mrmp.tag),
                mrmp.n_constrained(),
            ))?;
            self.created.constraint_groups.push(group_tag);
            let fe = FeLagrangeMrmp::new(domain, mrmp, constrained_group, &retained_groups, group_tag, self.alpha)?;
            model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
            self.created.constraint_fes.push(fe_tag);
            group_tag += 1;
            fe_tag += 1;
        }

        fill_summary(&mut summary, model);
        Ok(summary)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::LagrangeHandler;
    use crate::base::{Config, Samples};
    use crate::fem::{AnalysisModel, PlainNumberer};

    #[test]
    fn handle_two_node_bar_works() {
        let config = Config::new();
        let mut handler = LagrangeHandler::new(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        let summary = handler.handle(&mut domain, &mut model, None).unwrap();
        assert!(summary.is_clean());

        // 2 physical groups + 2 multiplier groups; 1 plain FE + 2 constraint FEs
        assert_eq!(summary.n_dof_groups, 4);
        assert_eq!(summary.n_lagrange_groups, 2);
        assert_eq!(summary.n_fes, 3);

        // nodes got their back-references
        assert_eq!(domain.nodes[0].dof_group(), Some(0));
        assert_eq!(domain.nodes[1].dof_group(), Some(1));

        // 4 physical equations + 2 multipliers, multipliers numbered last
        let numberer = PlainNumberer::new();
        let n = numberer.number(&mut model).unwrap();
        assert_eq!(n, 6);
        assert_eq!(model.get_dof_group(2).unwrap().eqs, &[Some(4)]);
        assert_eq!(model.get_dof_group(3).unwrap().eqs, &[Some(5)]);

        model.finalize_ids().unwrap();
        model.check_equation_coverage().unwrap();
    }

    #[test]
    fn handle_mp_and_mrmp_work() {
        let config = Config::new();
        let mut handler = LagrangeHandler::new(&config);
        let mut domain = Samples::mp_tied_chain();
        let mut model = AnalysisModel::new();
        let summary = handler.handle(&mut domain, &mut model, None).unwrap();
        // 4 physical + 1 SP multiplier + 1 MP multiplier; 2 plain + 2 constraint FEs
        assert_eq!(summary.n_dof_groups, 6);
        assert_eq!(summary.n_lagrange_groups, 2);
        assert_eq!(summary.n_fes, 4);

        let mut handler = LagrangeHandler::new(&config);
        let mut domain = Samples::mrmp_average();
        let mut model = AnalysisModel::new();
        let summary = handler.handle(&mut domain, &mut model, None).unwrap();
        // 4 physical + 1 SP multiplier + 1 MRMP multiplier; 2 plain + 2 constraint FEs
        assert_eq!(summary.n_dof_groups, 6);
        assert_eq!(summary.n_lagrange_groups, 2);
        assert_eq!(summary.n_fes, 4);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let config = Config::new();
        let mut handler = LagrangeHandler::new(&config);
        let mut domain = Samples::two_node_bar();
        let mut model = AnalysisModel::new();
        let first = handler.handle(&mut domain, &mut model, None).unwrap();
        let second = handler.handle(&mut domain, &mut model, None).unwrap();
        assert_eq!(first.n_fes, second.n_fes);
        assert_eq!(first.n_dof_groups, second.n_dof_groups);
        let numberer = PlainNumberer::new();
        assert_eq!(numberer.number(&mut model).unwrap(), 6);
    }
}

use super::{AnalysisModel, DofGroup, FeElement, FemState, FePlain, LagrangeHandler, PenaltyHandler, TransformationHandler};
use crate::base::{Config, Domain, HandlerKind};
use crate::StrError;
use std::collections::HashMap;

/// Holds the outcome of a handle pass
///
/// Skipped objects are local, recoverable conditions (e.g., an element whose
/// nodes lack the required DOFs); they do not abort the pass, but the summary
/// must be clean before the analysis may proceed.
#[derive(Clone, Debug)]
pub struct HandleSummary {
    /// Total number of FeElements registered with the model
    pub n_fes: usize,

    /// Total number of DofGroups registered with the model
    pub n_dof_groups: usize,

    /// Number of multiplier (Lagrange) groups among them
    pub n_lagrange_groups: usize,

    /// Number of skipped objects
    pub n_skipped: usize,

    /// Ids of the skipped elements
    pub skipped_elements: Vec<usize>,
}

impl HandleSummary {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        HandleSummary {
            n_fes: 0,
            n_dof_groups: 0,
            n_lagrange_groups: 0,
            n_skipped: 0,
            skipped_elements: Vec::new(),
        }
    }

    /// Returns whether the pass completed without skipping any object
    pub fn is_clean(&self) -> bool {
        self.n_skipped == 0
    }
}

/// Records the tags created by a handler, split by creation path
///
/// The handler exclusively owns what it created and must deregister exactly
/// that subset on rebuild or clear, never touching objects owned by a
/// different path.
pub struct Created {
    /// Tags of the plain FeElements
    pub plain_fes: Vec<usize>,

    /// Tags of the plain (physical/transformed) DofGroups
    pub plain_groups: Vec<usize>,

    /// Tags of the constraint-enforcement FeElements
    pub constraint_fes: Vec<usize>,

    /// Tags of the constraint-enforcement DofGroups
    pub constraint_groups: Vec<usize>,
}

impl Created {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        Created {
            plain_fes: Vec::new(),
            plain_groups: Vec::new(),
            constraint_fes: Vec::new(),
            constraint_groups: Vec::new(),
        }
    }

    /// Removes every recorded object from the model and forgets the records
    pub fn remove_all(&mut self, model: &mut AnalysisModel) -> Result<(), StrError> {
        for tag in self.constraint_fes.drain(..).chain(self.plain_fes.drain(..)) {
            model.remove_fe(tag)?;
        }
        for tag in self.constraint_groups.drain(..).chain(self.plain_groups.drain(..)) {
            model.remove_dof_group(tag)?;
        }
        Ok(())
    }
}

/// Checks that no DOF is targeted by more than one constraint
///
/// SP and MP/MRMP enforcement on the same DOF (or two constraints of the same
/// kind on one DOF) is a conflict; it is detected here instead of being
/// silently resolved by a "last write wins" rule.
pub fn check_conflicts(domain: &Domain) -> Result<(), StrError> {
    let mut targeted: HashMap<(usize, crate::base::Dof), usize> = HashMap::new();
    for sp in &domain.sp_constraints {
        *targeted.entry((sp.node_id, sp.dof)).or_insert(0) += 1;
    }
    for mp in &domain.mp_constraints {
        for dof in &mp.constrained_dofs {
            *targeted.entry((mp.constrained_node, *dof)).or_insert(0) += 1;
        }
    }
    for mrmp in &domain.mrmp_constraints {
        for dof in &mrmp.constrained_dofs {
            *targeted.entry((mrmp.constrained_node, *dof)).or_insert(0) += 1;
        }
    }
    if targeted.values().any(|count| *count > 1) {
        return Err("a DOF is targeted by more than one constraint");
    }
    Ok(())
}

/// Creates one physical DofGroup per node and sets the node back-references
///
/// Returns the next available group tag.
pub fn create_node_groups(
    domain: &mut Domain,
    model: &mut AnalysisModel,
    created: &mut Created,
) -> Result<usize, StrError> {
    let mut tag = 0;
    for node in domain.nodes.iter_mut() {
        model.add_dof_group(DofGroup::new_physical(tag, node))?;
        created.plain_groups.push(tag);
        node.set_dof_group(tag);
        tag += 1;
    }
    Ok(tag)
}

/// Creates one plain FeElement per active element
///
/// Elements whose nodes lack the required DOFs are skipped and counted in the
/// summary; the remaining setup continues. Returns the next available tag.
pub fn create_plain_fes(
    domain: &Domain,
    model: &mut AnalysisModel,
    created: &mut Created,
    summary: &mut HandleSummary,
    verbose: bool,
) -> Result<usize, StrError> {
    let mut tag = 0;
    for element in &domain.elements {
        if !element.active {
            continue;
        }
        let group_tags = element
            .nodes
            .iter()
            .map(|node_id| model.node_group_tag(*node_id))
            .collect::<Result<Vec<_>, _>>()?;
        match FePlain::new(domain, element, group_tags) {
            Ok(fe) => {
                model.add_fe(FeElement::new(tag, Box::new(fe)))?;
                created.plain_fes.push(tag);
                tag += 1;
            }
            Err(message) => {
                if verbose {
                    println!("skipping element {} due to: {}", element.id, message);
                }
                summary.n_skipped += 1;
                summary.skipped_elements.push(element.id);
            }
        }
    }
    Ok(tag)
}

/// Fills the summary counters from the model after a handle pass
pub fn fill_summary(summary: &mut HandleSummary, model: &AnalysisModel) {
    summary.n_fes = model.fes.len();
    summary.n_dof_groups = model.dof_groups.len();
    summary.n_lagrange_groups = model.n_lagrange_groups();
}

/// Defines the strategy that converts constraints into FeElements/DofGroups
///
/// The variant set is closed: every strategy produces the same solver-facing
/// abstraction (FeElement + DofGroup) and differs only in how the constraints
/// enter the system (extra multiplier unknowns, penalty stiffness, or static
/// elimination).
pub enum ConstraintHandler {
    /// Exact enforcement via Lagrange multipliers
    Lagrange(LagrangeHandler),

    /// Approximate enforcement via a fixed penalty stiffness
    Penalty(PenaltyHandler),

    /// Approximate enforcement via a penalty derived from neighboring stiffness
    AutoPenalty(PenaltyHandler),

    /// Exact enforcement via static elimination
    Transformation(TransformationHandler),
}

impl ConstraintHandler {
    /// Allocates a new instance according to the configuration
    pub fn new(config: &Config) -> Result<Self, StrError> {
        if let Some(message) = config.validate() {
            println!("ERROR: {}", message);
            return Err("cannot create constraint handler because config.validate() failed");
        }
        match config.handler {
            HandlerKind::Lagrange => Ok(ConstraintHandler::Lagrange(LagrangeHandler::new(config))),
            HandlerKind::Penalty => Ok(ConstraintHandler::Penalty(PenaltyHandler::new_fixed(config))),
            HandlerKind::AutoPenalty => Ok(ConstraintHandler::AutoPenalty(PenaltyHandler::new_auto(config))),
            HandlerKind::Transformation => Ok(ConstraintHandler::Transformation(TransformationHandler::new(config))),
        }
    }

    /// Rebuilds all FeElements and DofGroups for the current domain
    ///
    /// An optional node-id list forces those nodes to be numbered last (used
    /// to keep substructure interface DOFs contiguous).
    pub fn handle(
        &mut self,
        domain: &mut Domain,
        model: &mut AnalysisModel,
        nodes_last: Option<&[usize]>,
    ) -> Result<HandleSummary, StrError> {
        match self {
            ConstraintHandler::Lagrange(h) => h.handle(domain, model, nodes_last),
            ConstraintHandler::Penalty(h) => h.handle(domain, model, nodes_last),
            ConstraintHandler::AutoPenalty(h) => h.handle(domain, model, nodes_last),
            ConstraintHandler::Transformation(h) => h.handle(domain, model, nodes_last),
        }
    }

    /// Finalizes the FeElement local-to-global maps after numbering
    pub fn done_numbering(&mut self, domain: &Domain, model: &mut AnalysisModel) -> Result<(), StrError> {
        match self {
            ConstraintHandler::Lagrange(..) | ConstraintHandler::Penalty(..) | ConstraintHandler::AutoPenalty(..) => {
                model.finalize_ids()
            }
            ConstraintHandler::Transformation(h) => h.done_numbering(domain, model),
        }
    }

    /// Forwards load application to the constraint FeElements that need it
    pub fn apply_load(&mut self, domain: &Domain, model: &mut AnalysisModel, t: f64) -> Result<(), StrError> {
        match self {
            ConstraintHandler::Lagrange(..) => Ok(()),
            ConstraintHandler::Penalty(h) => h.apply_load(model, t),
            ConstraintHandler::AutoPenalty(h) => h.apply_load(model, t),
            ConstraintHandler::Transformation(h) => h.apply_load(domain, model, t),
        }
    }

    /// Refreshes per-iteration state of the constraint FeElements
    pub fn update(&mut self, domain: &Domain, model: &mut AnalysisModel, state: &FemState) -> Result<(), StrError> {
        match self {
            ConstraintHandler::Transformation(h) => h.update(domain, model, state),
            _ => Ok(()),
        }
    }

    /// Removes everything this handler created and clears node back-references
    pub fn clear_all(&mut self, domain: &mut Domain, model: &mut AnalysisModel) -> Result<(), StrError> {
        let created = match self {
            ConstraintHandler::Lagrange(h) => &mut h.created,
            ConstraintHandler::Penalty(h) => &mut h.created,
            ConstraintHandler::AutoPenalty(h) => &mut h.created,
            ConstraintHandler::Transformation(h) => &mut h.created,
        };
        created.remove_all(model)?;
        model.n_equation = 0;
        model.nodes_numbered_last.clear();
        domain.clear_dof_groups();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{check_conflicts, ConstraintHandler, HandleSummary};
    use crate::base::{Config, Dof, HandlerKind, Samples};
    use crate::fem::AnalysisModel;
    use russell_lab::{Matrix, Vector};

    #[test]
    fn summary_is_clean_works() {
        let mut summary = HandleSummary::new();
        assert!(summary.is_clean());
        summary.n_skipped = 1;
        assert!(!summary.is_clean());
    }

    #[test]
    fn check_conflicts_detects_sp_mp_overlap() {
        let mut domain = Samples::mp_tied_chain();
        assert_eq!(check_conflicts(&domain), Ok(()));
        // node 2's Ux is already MP-constrained; adding an SP is a conflict
        domain.add_sp_constraint(2, Dof::Ux, 0.0).unwrap();
        assert_eq!(check_conflicts(&domain).err(), Some("a DOF is targeted by more than one constraint"));
    }

    #[test]
    fn check_conflicts_detects_double_mrmp() {
        let mut domain = Samples::mrmp_average();
        let cc = Matrix::from(&[[1.0]]);
        let gg = Vector::new(1);
        domain
            .add_mrmp_constraint(3, &[Dof::Ux], &[(1, vec![Dof::Ux])], cc, gg)
            .unwrap();
        assert_eq!(check_conflicts(&domain).err(), Some("a DOF is targeted by more than one constraint"));
    }

    #[test]
    fn new_captures_config_errors() {
        let mut config = Config::new();
        config
            .set_handler(HandlerKind::AutoPenalty)
            .set_auto_penalty(false);
        assert_eq!(
            ConstraintHandler::new(&config).err(),
            Some("cannot create constraint handler because config.validate() failed")
        );
    }

    #[test]
    fn handle_requires_nodes() {
        let config = Config::new();
        let mut handler = ConstraintHandler::new(&config).unwrap();
        let mut domain = crate::base::Domain::new(2).unwrap();
        let mut model = AnalysisModel::new();
        assert_eq!(
            handler.handle(&mut domain, &mut model, None).err(),
            Some("domain has no nodes")
        );
    }

    #[test]
    fn incompatible_elements_are_skipped_not_fatal() {
        use crate::base::{Domain, Elem, ParamRod};
        // rod between nodes carrying Ux only: the formulation needs (Ux, Uy)
        let mut domain = Domain::new(2).unwrap();
        let a = domain.add_node(&[0.0, 0.0], &[Dof::Ux]).unwrap();
        let b = domain.add_node(&[1.0, 0.0], &[Dof::Ux, Dof::Uy]).unwrap();
        let p = ParamRod { young: 100.0, area: 1.0 };
        domain.add_element(Elem::Rod(p), &[a, b]).unwrap();
        domain.add_sp_constraint(a, Dof::Ux, 0.0).unwrap();

        let config = Config::new();
        let mut handler = ConstraintHandler::new(&config).unwrap();
        let mut model = AnalysisModel::new();
        let summary = handler.handle(&mut domain, &mut model, None).unwrap();
        assert!(!summary.is_clean());
        assert_eq!(summary.n_skipped, 1);
        assert_eq!(summary.skipped_elements, &[0]);
        // the rest of the setup still completed
        assert_eq!(summary.n_dof_groups, 3); // 2 nodes + 1 multiplier
    }

    #[test]
    fn nodes_numbered_last_reach_the_model() {
        let config = Config::new();
        let mut handler = ConstraintHandler::new(&config).unwrap();
        let mut domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        handler.handle(&mut domain, &mut model, Some(&[1])).unwrap();
        assert_eq!(model.nodes_numbered_last, &[1]);
    }
}

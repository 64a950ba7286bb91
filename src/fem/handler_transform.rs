use super::constraint_handler::{check_conflicts, fill_summary, Created, HandleSummary};
use super::{AnalysisModel, DofGroup, FeContext, FeElement, FemState, FeTransform};
use crate::base::{Config, Dof, Domain};
use crate::StrError;
use russell_lab::{Matrix, Vector};
use std::collections::HashMap;

/// Describes how one constrained node ties to its retained DOFs
///
/// MP and MRMP constraints reduce to the same description: the constrained
/// slots, the borrowed (retained) DOFs, and the coefficient rows.
struct Tie {
    /// Local slots of the constrained DOFs
    c_slots: Vec<usize>,

    /// Retained (node, DOF) pairs, in coefficient column order
    borrowed: Vec<(usize, Dof)>,

    /// Coefficient matrix (n_constrained × n_borrowed)
    cc: Matrix,

    /// Constant offset (n_constrained)
    gg: Vector,
}

/// Implements the transformation (static condensation) constraint strategy
///
/// No extra unknowns and no approximation error: every constrained node gets
/// a transformed DofGroup holding the linear map from its full DOF set to a
/// reduced free set, and every element touching such a node is wrapped in a
/// condensing FeElement. Retained DOFs must resolve before constrained ones,
/// so chained or cyclic retained-node relations are rejected instead of being
/// silently mis-handled.
pub struct TransformationHandler {
    /// Prints information while handling
    verbose: bool,

    /// Tags created by this handler
    pub(crate) created: Created,
}

impl TransformationHandler {
    /// Allocates a new instance
    pub fn new(config: &Config) -> Self {
        TransformationHandler {
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

        // collect the prescribed slots of each node
        let mut sp_map: HashMap<usize, Vec<(usize, f64, bool)>> = HashMap::new();
        for sp in &domain.sp_constraints {
            let slot = domain.nodes[sp.node_id].local_dof(sp.dof)?;
            sp_map
                .entry(sp.node_id)
                .or_insert_with(Vec::new)
                .push((slot, sp.value, sp.proportional));
        }

        // collect the tie of each constrained node (MP and MRMP uniformly)
        let mut tie_map: HashMap<usize, Tie> = HashMap::new();
        for mp in &domain.mp_constraints {
            let node = &domain.nodes[mp.constrained_node];
            let c_slots = mp
                .constrained_dofs
                .iter()
                .map(|dof| node.local_dof(*dof))
                .collect::<Result<Vec<_>, _>>()?;
            let borrowed: Vec<_> = mp.retained_dofs.iter().map(|dof| (mp.retained_node, *dof)).collect();
            let tie = Tie {
                c_slots,
                borrowed,
                cc: mp.cc.clone(),
                gg: mp.gg.clone(),
            };
            if tie_map.insert(mp.constrained_node, tie).is_some() {
                return Err("node has more than one multi-point constraint");
            }
        }
        for mrmp in &domain.mrmp_constraints {
            let node = &domain.nodes[mrmp.constrained_node];
            let c_slots = mrmp
                .constrained_dofs
                .iter()
                .map(|dof| node.local_dof(*dof))
                .collect::<Result<Vec<_>, _>>()?;
            let mut borrowed = Vec::new();
            for (node_id, dofs) in &mrmp.retained {
                for dof in dofs {
                    borrowed.push((*node_id, *dof));
                }
            }
            let tie = Tie {
                c_slots,
                borrowed,
                cc: mrmp.cc.clone(),
                gg: mrmp.gg.clone(),
            };
            if tie_map.insert(mrmp.constrained_node, tie).is_some() {
                return Err("node has more than one multi-point constraint");
            }
        }

        // retained DOFs must resolve before constrained ones
        for tie in tie_map.values() {
            for (retained_node, retained_dof) in &tie.borrowed {
                if tie_map.contains_key(retained_node) {
                    return Err("cannot build transformation because the multi-point constraint chain is cyclic");
                }
                if let Some(slots) = sp_map.get(retained_node) {
                    let slot = domain.nodes[*retained_node].local_dof(*retained_dof)?;
                    if slots.iter().any(|(s, _, _)| *s == slot) {
                        return Err("cannot build transformation because a retained DOF is constrained");
                    }
                }
            }
        }

        // one group per node: transformed when constrained, physical otherwise
        let mut summary = HandleSummary::new();
        let mut group_tag = 0;
        for node_id in 0..domain.nodes.len() {
            let sp_slots = sp_map.get(&node_id);
            let tie = tie_map.get(&node_id);
            if sp_slots.is_none() && tie.is_none() {
                let node = &mut domain.nodes[node_id];
                model.add_dof_group(DofGroup::new_physical(group_tag, node))?;
                self.created.plain_groups.push(group_tag);
                node.set_dof_group(group_tag);
                group_tag += 1;
                continue;
            }
            let node = &domain.nodes[node_id];
            let ndof = node.ndof();
            let mut offset = vec![(0.0, 0.0); ndof];
            let mut eliminated = vec![false; ndof];
            if let Some(slots) = sp_slots {
                for (slot, value, proportional) in slots {
                    eliminated[*slot] = true;
                    offset[*slot] = if *proportional { (0.0, *value) } else { (*value, 0.0) };
                }
            }
            if let Some(tie) = tie {
                for (k, slot) in tie.c_slots.iter().enumerate() {
                    eliminated[*slot] = true;
                    offset[*slot] = (tie.gg[k], 0.0);
                }
            }
            let free_slots: Vec<_> = (0..ndof).filter(|slot| !eliminated[*slot]).collect();
            let borrowed = match tie {
                Some(tie) => tie.borrowed.clone(),
                None => Vec::new(),
            };
            let mut tt = Matrix::new(ndof, free_slots.len() + borrowed.len());
            for (reduced, slot) in free_slots.iter().enumerate() {
                tt.set(*slot, reduced, 1.0);
            }
            if let Some(tie) = tie {
                for (k, slot) in tie.c_slots.iter().enumerate() {
                    for j in 0..tie.borrowed.len() {
                        tt.set(*slot, free_slots.len() + j, tie.cc.get(k, j));
                    }
                }
            }
            let group = DofGroup::new_transformed(group_tag, node, tt, offset, free_slots, borrowed)?;
            model.add_dof_group(group)?;
            self.created.constraint_groups.push(group_tag);
            domain.nodes[node_id].set_dof_group(group_tag);
            group_tag += 1;
        }

        // elements touching a constrained node get wrapped in a condensing FE
        let mut fe_tag = 0;
        for element in &domain.elements {
            if !element.active {
                continue;
            }
            let any_transformed = element
                .nodes
                .iter()
                .any(|node_id| sp_map.contains_key(node_id) || tie_map.contains_key(node_id));
            if !any_transformed {
                continue;
            }
            let group_tags = element
                .nodes
                .iter()
                .map(|node_id| model.node_group_tag(*node_id))
                .collect::<Result<Vec<_>, _>>()?;
            let result = {
                let groups = group_tags
                    .iter()
                    .map(|tag| model.get_dof_group(*tag))
                    .collect::<Result<Vec<_>, _>>()?;
                FeTransform::new(domain, element, group_tags.clone(), &groups)
            };
            match result {
                Ok(fe) => {
                    model.add_fe(FeElement::new(fe_tag, Box::new(fe)))?;
                    self.created.constraint_fes.push(fe_tag);
                    fe_tag += 1;
                }
                Err(message) => {
                    if self.verbose {
                        println!("skipping element {} due to: {}", element.id, message);
                    }
                    summary.n_skipped += 1;
                    summary.skipped_elements.push(element.id);
                }
            }
        }

        // remaining (untouched) elements are plain; tags continue after the
        // wrapped ones so both paths share the FeElement tag space
        self.create_untouched_plain_fes(domain, model, &mut summary, fe_tag, &sp_map, &tie_map)?;

        fill_summary(&mut summary, model);
        Ok(summary)
    }

    /// Creates plain FeElements for elements with no transformed node
    fn create_untouched_plain_fes(
        &mut self,
        domain: &Domain,
        model: &mut AnalysisModel,
        summary: &mut HandleSummary,
        first_tag: usize,
        sp_map: &HashMap<usize, Vec<(usize, f64, bool)>>,
        tie_map: &HashMap<usize, Tie>,
    ) -> Result<(), StrError> {
        let mut tag = first_tag;
        for element in &domain.elements {
            if !element.active {
                continue;
            }
            let any_transformed = element
                .nodes
                .iter()
                .any(|node_id| sp_map.contains_key(node_id) || tie_map.contains_key(node_id));
            if any_transformed {
                continue;
            }
            let group_tags = element
                .nodes
                .iter()
                .map(|node_id| model.node_group_tag(*node_id))
                .collect::<Result<Vec<_>, _>>()?;
            match super::FePlain::new(domain, element, group_tags) {
                Ok(fe) => {
                    model.add_fe(FeElement::new(tag, Box::new(fe)))?;
                    self.created.plain_fes.push(tag);
                    tag += 1;
                }
                Err(message) => {
                    if self.verbose {
                        println!("skipping element {} due to: {}", element.id, message);
                    }
                    summary.n_skipped += 1;
                    summary.skipped_elements.push(element.id);
                }
            }
        }
        Ok(())
    }

    /// Fills the borrowed equations and finalizes the local-to-global maps
    ///
    /// The borrowed slots of every transformed group take the equation numbers
    /// of the retained DOFs, which the numberer has just assigned.
    pub fn done_numbering(&mut self, domain: &Domain, model: &mut AnalysisModel) -> Result<(), StrError> {
        let mut assignments = Vec::new();
        for group in &model.dof_groups {
            if let super::DofGroupKind::Transformed {
                free_slots, borrowed, ..
            } = &group.kind
            {
                for (j, (retained_node, retained_dof)) in borrowed.iter().enumerate() {
                    let retained_tag = model.node_group_tag(*retained_node)?;
                    let retained_group = model.get_dof_group(retained_tag)?;
                    let eq = retained_group.eq_for_dof(&domain.nodes[*retained_node], *retained_dof)?;
                    assignments.push((group.tag, free_slots.len() + j, eq));
                }
            }
        }
        for (tag, slot, eq) in assignments {
            model.get_dof_group_mut(tag)?.eqs[slot] = Some(eq);
        }
        model.finalize_ids()
    }

    /// Forwards load application to the condensing elements
    pub fn apply_load(&mut self, _domain: &Domain, model: &mut AnalysisModel, t: f64) -> Result<(), StrError> {
        for tag in &self.created.constraint_fes {
            model.get_fe_mut(*tag)?.actual.apply_load(t)?;
        }
        Ok(())
    }

    /// Refreshes per-iteration state of the condensing elements
    pub fn update(&mut self, domain: &Domain, model: &mut AnalysisModel, _state: &FemState) -> Result<(), StrError> {
        let ctx = FeContext { domain };
        for tag in &self.created.constraint_fes {
            model.get_fe_mut(*tag)?.actual.update(&ctx)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

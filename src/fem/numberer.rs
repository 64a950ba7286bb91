use super::AnalysisModel;
use crate::StrError;

/// Implements a plain equation numberer
///
/// Assigns equation numbers to the numberable slots of all DofGroups in three
/// passes, following the group connectivity graph order (insertion order):
///
/// 1. ordinary groups (physical and transformed);
/// 2. groups of nodes listed in `nodes_numbered_last` (substructure
///    interfaces are kept contiguous at the end of the physical range);
/// 3. multiplier (Lagrange) groups.
///
/// Multiplier unknowns therefore share the global equation space and are
/// numbered last; `n_equation` includes them. Fancier orderings
/// (bandwidth/fill reduction) belong to external numberers consuming the same
/// graph contract.
pub struct PlainNumberer {}

impl PlainNumberer {
    /// Allocates a new instance
    pub fn new() -> Self {
        PlainNumberer {}
    }

    /// Numbers all DofGroups and returns the total number of equations
    pub fn number(&self, model: &mut AnalysisModel) -> Result<usize, StrError> {
        if model.dof_groups.is_empty() {
            return Err("there are no DofGroups to number");
        }
        let order: Vec<usize> = model.dof_group_graph().vertices.clone();
        for group in model.dof_groups.iter_mut() {
            group.reset_numbering();
        }

        let mut n = 0;

        // pass 1: ordinary groups
        for tag in &order {
            let group = model.get_dof_group(*tag)?;
            if group.is_lagrange() {
                continue;
            }
            if let Some(node_id) = group.node_id() {
                if model.nodes_numbered_last.contains(&node_id) {
                    continue;
                }
            }
            n = Self::assign(model, *tag, n)?;
        }

        // pass 2: groups forced to be numbered last (interface nodes)
        for tag in &order {
            let group = model.get_dof_group(*tag)?;
            match group.node_id() {
                Some(node_id) => {
                    if !model.nodes_numbered_last.contains(&node_id) {
                        continue;
                    }
                }
                None => continue,
            }
            n = Self::assign(model, *tag, n)?;
        }

        // pass 3: multiplier groups
        for tag in &order {
            if !model.get_dof_group(*tag)?.is_lagrange() {
                continue;
            }
            n = Self::assign(model, *tag, n)?;
        }

        model.n_equation = n;
        Ok(n)
    }

    /// Assigns sequential numbers to the numberable slots of one group
    fn assign(model: &mut AnalysisModel, tag: usize, mut n: usize) -> Result<usize, StrError> {
        let group = model.get_dof_group_mut(tag)?;
        for (slot, eq) in group.eqs.iter_mut().enumerate() {
            if group.numberable[slot] {
                *eq = Some(n);
                n += 1;
            }
        }
        Ok(n)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

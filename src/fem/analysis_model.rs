use super::{ConstraintHandler, DofGraph, DofGroup, DofGroupGraph, FeElement, FemState};
use crate::base::Domain;
use crate::StrError;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Holds all FeElements and DofGroups of the current analysis
///
/// This is a typed, tag-indexed container with two independent tag spaces
/// (FeElements and DofGroups). Insertion rejects duplicate tags. The model
/// also derives the DofGroup connectivity graph consumed by the numberer; the
/// graph is rebuilt lazily whenever the container set changes.
pub struct AnalysisModel {
    /// All FeElements (arena; owned exclusively by the model)
    pub fes: Vec<FeElement>,

    /// All DofGroups (arena; owned exclusively by the model)
    pub dof_groups: Vec<DofGroup>,

    /// Total number of global equations (valid after numbering)
    pub n_equation: usize,

    /// Node ids whose groups must be numbered after all ordinary groups
    pub nodes_numbered_last: Vec<usize>,

    /// Maps FeElement tags to arena indices
    fe_tag_to_index: HashMap<usize, usize>,

    /// Maps DofGroup tags to arena indices
    group_tag_to_index: HashMap<usize, usize>,

    /// Maps node ids to the tag of their (physical or transformed) group
    node_to_group: HashMap<usize, usize>,

    /// Indicates that the cached graph no longer matches the container set
    graph_dirty: bool,

    /// Cached DofGroup connectivity graph
    group_graph: DofGroupGraph,
}

impl AnalysisModel {
    /// Allocates a new (empty) instance
    pub fn new() -> Self {
        AnalysisModel {
            fes: Vec::new(),
            dof_groups: Vec::new(),
            n_equation: 0,
            nodes_numbered_last: Vec::new(),
            fe_tag_to_index: HashMap::new(),
            group_tag_to_index: HashMap::new(),
            node_to_group: HashMap::new(),
            graph_dirty: true,
            group_graph: DofGroupGraph {
                vertices: Vec::new(),
                adjacency: Vec::new(),
            },
        }
    }

    /// Adds an FeElement; fails on duplicate tag
    pub fn add_fe(&mut self, fe: FeElement) -> Result<(), StrError> {
        if self.fe_tag_to_index.contains_key(&fe.tag) {
            return Err("cannot add FeElement because the tag already exists");
        }
        self.fe_tag_to_index.insert(fe.tag, self.fes.len());
        self.fes.push(fe);
        self.graph_dirty = true;
        Ok(())
    }

    /// Adds a DofGroup; fails on duplicate tag or duplicate node group
    pub fn add_dof_group(&mut self, group: DofGroup) -> Result<(), StrError> {
        if self.group_tag_to_index.contains_key(&group.tag) {
            return Err("cannot add DofGroup because the tag already exists");
        }
        if let Some(node_id) = group.node_id() {
            if self.node_to_group.contains_key(&node_id) {
                return Err("cannot add DofGroup because the node already has one");
            }
            self.node_to_group.insert(node_id, group.tag);
        }
        self.group_tag_to_index.insert(group.tag, self.dof_groups.len());
        self.dof_groups.push(group);
        self.graph_dirty = true;
        Ok(())
    }

    /// Removes an FeElement given its tag
    pub fn remove_fe(&mut self, tag: usize) -> Result<(), StrError> {
        let index = *self
            .fe_tag_to_index
            .get(&tag)
            .ok_or("cannot find FeElement with the given tag")?;
        self.fes.remove(index);
        self.fe_tag_to_index.clear();
        for (i, fe) in self.fes.iter().enumerate() {
            self.fe_tag_to_index.insert(fe.tag, i);
        }
        self.graph_dirty = true;
        Ok(())
    }

    /// Removes a DofGroup given its tag
    pub fn remove_dof_group(&mut self, tag: usize) -> Result<(), StrError> {
        let index = *self
            .group_tag_to_index
            .get(&tag)
            .ok_or("cannot find DofGroup with the given tag")?;
        if let Some(node_id) = self.dof_groups[index].node_id() {
            self.node_to_group.remove(&node_id);
        }
        self.dof_groups.remove(index);
        self.group_tag_to_index.clear();
        for (i, group) in self.dof_groups.iter().enumerate() {
            self.group_tag_to_index.insert(group.tag, i);
        }
        self.graph_dirty = true;
        Ok(())
    }

    /// Returns a reference to an FeElement given its tag
    pub fn get_fe(&self, tag: usize) -> Result<&FeElement, StrError> {
        let index = self.fe_tag_to_index.get(&tag).ok_or("cannot find FeElement with the given tag")?;
        Ok(&self.fes[*index])
    }

    /// Returns a mutable reference to an FeElement given its tag
    pub fn get_fe_mut(&mut self, tag: usize) -> Result<&mut FeElement, StrError> {
        let index = self.fe_tag_to_index.get(&tag).ok_or("cannot find FeElement with the given tag")?;
        Ok(&mut self.fes[*index])
    }

    /// Returns a reference to a DofGroup given its tag
    pub fn get_dof_group(&self, tag: usize) -> Result<&DofGroup, StrError> {
        let index = self
            .group_tag_to_index
            .get(&tag)
            .ok_or("cannot find DofGroup with the given tag")?;
        Ok(&self.dof_groups[*index])
    }

    /// Returns a mutable reference to a DofGroup given its tag
    pub fn get_dof_group_mut(&mut self, tag: usize) -> Result<&mut DofGroup, StrError> {
        let index = self
            .group_tag_to_index
            .get(&tag)
            .ok_or("cannot find DofGroup with the given tag")?;
        Ok(&mut self.dof_groups[*index])
    }

    /// Returns the tag of the group representing a node
    pub fn node_group_tag(&self, node_id: usize) -> Result<usize, StrError> {
        match self.node_to_group.get(&node_id) {
            Some(tag) => Ok(*tag),
            None => Err("cannot find DofGroup for the given node"),
        }
    }

    /// Returns the number of multiplier (Lagrange) groups
    pub fn n_lagrange_groups(&self) -> usize {
        self.dof_groups.iter().filter(|g| g.is_lagrange()).count()
    }

    /// Returns the DofGroup connectivity graph (lazily rebuilt)
    pub fn dof_group_graph(&mut self) -> &DofGroupGraph {
        if self.graph_dirty {
            self.group_graph = DofGroupGraph::new(&self.dof_groups, &self.fes, &self.group_tag_to_index);
            self.graph_dirty = false;
        }
        &self.group_graph
    }

    /// Returns the equation-level graph (requires finalized numbering)
    pub fn dof_graph(&self) -> Result<DofGraph, StrError> {
        DofGraph::new(&self.fes, self.n_equation)
    }

    /// Finalizes all FeElement local-to-global maps from the groups' equations
    pub fn finalize_ids(&mut self) -> Result<(), StrError> {
        let groups = &self.dof_groups;
        let map = &self.group_tag_to_index;
        for fe in self.fes.iter_mut() {
            fe.done_numbering(groups, map)?;
        }
        Ok(())
    }

    /// Checks that the FeElement IDs address every equation in [0, n_equation)
    ///
    /// Unaddressed equations indicate floating/unconstrained DOFs; the system
    /// would be singular and must not reach the solver.
    pub fn check_equation_coverage(&self) -> Result<(), StrError> {
        if self.n_equation < 1 {
            return Err("cannot check coverage before numbering completes");
        }
        let mut covered = BTreeSet::new();
        for fe in &self.fes {
            for eq in fe.id.iter().flatten() {
                if *eq >= self.n_equation {
                    return Err("FeElement ID references an equation out of range");
                }
                covered.insert(*eq);
            }
        }
        if covered.len() != self.n_equation {
            return Err("equation numbers are not fully addressed by the FeElements (floating DOF)");
        }
        Ok(())
    }

    /// Removes all FeElements and DofGroups and resets the numbering
    pub fn clear_all(&mut self) {
        self.fes.clear();
        self.dof_groups.clear();
        self.fe_tag_to_index.clear();
        self.group_tag_to_index.clear();
        self.node_to_group.clear();
        self.n_equation = 0;
        self.nodes_numbered_last.clear();
        self.graph_dirty = true;
    }

    /// Forwards apply-load to the domain first, then to the handler
    ///
    /// The fixed order guarantees that the handler's pseudo-elements always
    /// see post-update physical state.
    pub fn apply_load_domain(
        &mut self,
        domain: &mut Domain,
        handler: &mut ConstraintHandler,
        t: f64,
    ) -> Result<(), StrError> {
        domain.apply_load(t);
        handler.apply_load(domain, self, t)
    }

    /// Forwards update to the domain first, then to the handler
    pub fn update_domain(
        &mut self,
        domain: &mut Domain,
        handler: &mut ConstraintHandler,
        state: &FemState,
    ) -> Result<(), StrError> {
        domain.update()?;
        handler.update(domain, self, state)
    }

    /// Forwards commit to the domain
    pub fn commit_domain(&mut self, domain: &mut Domain, state: &mut FemState) {
        domain.commit();
        state.commit();
    }

    /// Forwards revert-to-last-commit to the domain
    pub fn revert_domain_to_last_commit(&mut self, domain: &mut Domain, state: &mut FemState) {
        domain.revert_to_last_commit();
        state.revert_to_last_commit();
    }

    /// Forwards new-step to the domain
    pub fn new_step_domain(&mut self, domain: &mut Domain, dt: f64) {
        domain.new_step(dt);
    }
}

impl fmt::Display for AnalysisModel {
    /// Prints a formatted summary of the DOF numbering
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DofGroups: equation numbers\n").unwrap();
        write!(f, "===========================\n").unwrap();
        for group in &self.dof_groups {
            let eqs: Vec<String> = group
                .eqs
                .iter()
                .map(|eq| match eq {
                    Some(i) => format!("{}", i),
                    None => "-".to_string(),
                })
                .collect();
            match group.node_id() {
                Some(node_id) => write!(f, "{} (node {}): [{}]\n", group.tag, node_id, eqs.join(", ")).unwrap(),
                None => write!(f, "{} (multiplier): [{}]\n", group.tag, eqs.join(", ")).unwrap(),
            }
        }
        write!(f, "\nFeElements: local-to-global\n").unwrap();
        write!(f, "===========================\n").unwrap();
        for fe in &self.fes {
            let id: Vec<String> = fe
                .id
                .iter()
                .map(|eq| match eq {
                    Some(i) => format!("{}", i),
                    None => "-".to_string(),
                })
                .collect();
            write!(f, "{}: [{}]\n", fe.tag, id.join(", ")).unwrap();
        }
        write!(f, "\nInformation\n").unwrap();
        write!(f, "===========\n").unwrap();
        write!(f, "number of equations = {}\n", self.n_equation).unwrap();
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::AnalysisModel;
    use crate::base::Samples;
    use crate::fem::{ConstraintRef, DofGroup, FeElement, FePlain};

    fn new_fe(domain: &crate::base::Domain, element_id: usize, tag: usize, groups: Vec<usize>) -> FeElement {
        let plain = FePlain::new(domain, &domain.elements[element_id], groups).unwrap();
        FeElement::new(tag, Box::new(plain))
    }

    #[test]
    fn add_rejects_duplicates() {
        let domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        model.add_dof_group(DofGroup::new_physical(0, &domain.nodes[0])).unwrap();
        assert_eq!(
            model.add_dof_group(DofGroup::new_physical(0, &domain.nodes[1])).err(),
            Some("cannot add DofGroup because the tag already exists")
        );
        assert_eq!(
            model.add_dof_group(DofGroup::new_physical(1, &domain.nodes[0])).err(),
            Some("cannot add DofGroup because the node already has one")
        );
        model.add_dof_group(DofGroup::new_physical(1, &domain.nodes[1])).unwrap();

        model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).unwrap();
        assert_eq!(
            model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).err(),
            Some("cannot add FeElement because the tag already exists")
        );
    }

    #[test]
    fn lookup_and_removal_work() {
        let domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        for node in &domain.nodes {
            model.add_dof_group(DofGroup::new_physical(node.id, node)).unwrap();
        }
        model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).unwrap();
        model.add_fe(new_fe(&domain, 1, 1, vec![1, 2])).unwrap();

        assert_eq!(model.get_fe(1).unwrap().tag, 1);
        assert_eq!(model.get_dof_group(2).unwrap().tag, 2);
        assert_eq!(model.node_group_tag(2), Ok(2));
        assert_eq!(model.get_fe(9).err(), Some("cannot find FeElement with the given tag"));
        assert_eq!(model.get_dof_group(9).err(), Some("cannot find DofGroup with the given tag"));
        assert_eq!(model.node_group_tag(9).err(), Some("cannot find DofGroup for the given node"));

        model.remove_fe(0).unwrap();
        assert_eq!(model.fes.len(), 1);
        assert_eq!(model.get_fe(1).unwrap().tag, 1); // index map was rebuilt
        model.remove_dof_group(0).unwrap();
        assert_eq!(model.node_group_tag(0).err(), Some("cannot find DofGroup for the given node"));
        assert_eq!(model.remove_fe(0).err(), Some("cannot find FeElement with the given tag"));
        assert_eq!(model.remove_dof_group(0).err(), Some("cannot find DofGroup with the given tag"));
    }

    #[test]
    fn graph_is_lazily_rebuilt() {
        let domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        for node in &domain.nodes {
            model.add_dof_group(DofGroup::new_physical(node.id, node)).unwrap();
        }
        model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).unwrap();
        assert_eq!(model.dof_group_graph().adjacency[0], &[1]);
        assert_eq!(model.dof_group_graph().adjacency[2], Vec::<usize>::new());

        model.add_fe(new_fe(&domain, 1, 1, vec![1, 2])).unwrap();
        assert_eq!(model.dof_group_graph().adjacency[1], &[0, 2]);
    }

    #[test]
    fn numbering_counts_and_coverage_work() {
        let domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        for node in &domain.nodes {
            model.add_dof_group(DofGroup::new_physical(node.id, node)).unwrap();
        }
        model.add_dof_group(DofGroup::new_lagrange(3, ConstraintRef::Sp(0), 1)).unwrap();
        assert_eq!(model.n_lagrange_groups(), 1);

        model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).unwrap();
        model.add_fe(new_fe(&domain, 1, 1, vec![1, 2])).unwrap();

        assert_eq!(
            model.check_equation_coverage().err(),
            Some("cannot check coverage before numbering completes")
        );

        // number every group; no FeElement addresses the multiplier equation
        let mut n = 0;
        for group in model.dof_groups.iter_mut() {
            for eq in group.eqs.iter_mut() {
                *eq = Some(n);
                n += 1;
            }
        }
        model.n_equation = n;
        model.finalize_ids().unwrap();
        assert_eq!(
            model.check_equation_coverage().err(),
            Some("equation numbers are not fully addressed by the FeElements (floating DOF)")
        );

        model.clear_all();
        assert_eq!(model.fes.len(), 0);
        assert_eq!(model.dof_groups.len(), 0);
        assert_eq!(model.n_equation, 0);
    }

    #[test]
    fn display_works() {
        let domain = Samples::three_node_chain();
        let mut model = AnalysisModel::new();
        for node in &domain.nodes {
            model.add_dof_group(DofGroup::new_physical(node.id, node)).unwrap();
        }
        model.add_fe(new_fe(&domain, 0, 0, vec![0, 1])).unwrap();
        let mut n = 0;
        for group in model.dof_groups.iter_mut() {
            for eq in group.eqs.iter_mut() {
                *eq = Some(n);
                n += 1;
            }
        }
        model.n_equation = n;
        model.finalize_ids().unwrap();
        assert_eq!(
            format!("{}", model),
            "DofGroups: equation numbers\n\
             ===========================\n\
             0 (node 0): [0, 1]\n\
             1 (node 1): [2, 3]\n\
             2 (node 2): [4, 5]\n\
             \n\
             FeElements: local-to-global\n\
             ===========================\n\
             0: [0, 1, 2, 3]\n\
             \n\
             Information\n\
             ===========\n\
             number of equations = 6\n"
        );
    }
}

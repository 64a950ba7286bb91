use super::{Dof, Elem, Element, MpConstraint, MrmpConstraint, NodalLoad, Node, SpConstraint};
use crate::StrError;
use russell_lab::{Matrix, Vector};
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

/// Holds the physical model: nodes, elements, constraints, and loads
///
/// The domain owns every physical object and drives the physical part of the
/// analysis lifecycle (`apply_load`, `update`, `commit`, `revert_to_last_commit`,
/// `new_step`). Any mutation of the model (adding/removing objects, killing an
/// element) bumps the change stamp so that the analysis layer knows it must
/// rebuild its FeElements and DofGroups.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Domain {
    /// Number of space dimensions
    pub ndim: usize,

    /// All nodes
    pub nodes: Vec<Node>,

    /// All elements
    pub elements: Vec<Element>,

    /// All single-point constraints
    pub sp_constraints: Vec<SpConstraint>,

    /// All multi-point constraints
    pub mp_constraints: Vec<MpConstraint>,

    /// All multi-retained-node constraints
    pub mrmp_constraints: Vec<MrmpConstraint>,

    /// All nodal loads
    pub nodal_loads: Vec<NodalLoad>,

    /// Current pseudo-time (load factor)
    pub t: f64,

    /// Current pseudo-time increment
    pub dt: f64,

    /// Committed pseudo-time
    t_committed: f64,

    /// Change stamp, bumped on every mutation of the model
    stamp: usize,

    /// Next tag for single-point constraints
    next_sp_tag: usize,

    /// Next tag for multi-point constraints
    next_mp_tag: usize,

    /// Next tag for multi-retained-node constraints
    next_mrmp_tag: usize,

    /// Next tag for nodal loads
    next_load_tag: usize,
}

impl Domain {
    /// Allocates a new (empty) instance
    pub fn new(ndim: usize) -> Result<Self, StrError> {
        if ndim < 1 || ndim > 3 {
            return Err("ndim must be 1, 2, or 3");
        }
        Ok(Domain {
            ndim,
            nodes: Vec::new(),
            elements: Vec::new(),
            sp_constraints: Vec::new(),
            mp_constraints: Vec::new(),
            mrmp_constraints: Vec::new(),
            nodal_loads: Vec::new(),
            t: 0.0,
            dt: 0.0,
            t_committed: 0.0,
            stamp: 0,
            next_sp_tag: 0,
            next_mp_tag: 0,
            next_mrmp_tag: 0,
            next_load_tag: 0,
        })
    }

    /// Adds a node and returns its id
    pub fn add_node(&mut self, coords: &[f64], dofs: &[Dof]) -> Result<usize, StrError> {
        if coords.len() != self.ndim {
            return Err("number of coordinates must equal ndim");
        }
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, coords, dofs)?);
        self.stamp += 1;
        Ok(id)
    }

    /// Adds an element and returns its id
    pub fn add_element(&mut self, param: Elem, nodes: &[usize]) -> Result<usize, StrError> {
        for node_id in nodes {
            if *node_id >= self.nodes.len() {
                return Err("element references a node that does not exist");
            }
        }
        let id = self.elements.len();
        self.elements.push(Element::new(id, param, nodes)?);
        self.stamp += 1;
        Ok(id)
    }

    /// Activates or deactivates (kills) an element
    pub fn set_element_active(&mut self, element_id: usize, active: bool) -> Result<(), StrError> {
        let element = self.elements.get_mut(element_id).ok_or("element id is out of range")?;
        if element.active != active {
            element.active = active;
            self.stamp += 1;
        }
        Ok(())
    }

    /// Adds a single-point constraint and returns its tag
    pub fn add_sp_constraint(&mut self, node_id: usize, dof: Dof, value: f64) -> Result<usize, StrError> {
        let node = self.nodes.get(node_id).ok_or("node id is out of range")?;
        node.local_dof(dof)?;
        let tag = self.next_sp_tag;
        self.next_sp_tag += 1;
        self.sp_constraints.push(SpConstraint::new(tag, node_id, dof, value));
        self.stamp += 1;
        Ok(tag)
    }

    /// Removes a single-point constraint given its tag
    pub fn remove_sp_constraint(&mut self, tag: usize) -> Result<(), StrError> {
        let before = self.sp_constraints.len();
        self.sp_constraints.retain(|sp| sp.tag != tag);
        if self.sp_constraints.len() == before {
            return Err("cannot find single-point constraint with the given tag");
        }
        self.stamp += 1;
        Ok(())
    }

    /// Adds a multi-point constraint and returns its tag
    pub fn add_mp_constraint(
        &mut self,
        constrained_node: usize,
        constrained_dofs: &[Dof],
        retained_node: usize,
        retained_dofs: &[Dof],
        cc: Matrix,
        gg: Vector,
    ) -> Result<usize, StrError> {
        self.check_node_dofs(constrained_node, constrained_dofs)?;
        self.check_node_dofs(retained_node, retained_dofs)?;
        let tag = self.next_mp_tag;
        self.next_mp_tag += 1;
        self.mp_constraints.push(MpConstraint::new(
            tag,
            constrained_node,
            constrained_dofs,
            retained_node,
            retained_dofs,
            cc,
            gg,
        )?);
        self.stamp += 1;
        Ok(tag)
    }

    /// Adds a multi-retained-node constraint and returns its tag
    pub fn add_mrmp_constraint(
        &mut self,
        constrained_node: usize,
        constrained_dofs: &[Dof],
        retained: &[(usize, Vec<Dof>)],
        cc: Matrix,
        gg: Vector,
    ) -> Result<usize, StrError> {
        self.check_node_dofs(constrained_node, constrained_dofs)?;
        for (node_id, dofs) in retained {
            self.check_node_dofs(*node_id, dofs)?;
        }
        let tag = self.next_mrmp_tag;
        self.next_mrmp_tag += 1;
        self.mrmp_constraints
            .push(MrmpConstraint::new(tag, constrained_node, constrained_dofs, retained, cc, gg)?);
        self.stamp += 1;
        Ok(tag)
    }

    /// Adds a nodal load and returns its tag
    pub fn add_nodal_load(&mut self, node_id: usize, dof: Dof, value: f64) -> Result<usize, StrError> {
        let node = self.nodes.get(node_id).ok_or("node id is out of range")?;
        node.local_dof(dof)?;
        let tag = self.next_load_tag;
        self.next_load_tag += 1;
        self.nodal_loads.push(NodalLoad::new(tag, node_id, dof, value));
        self.stamp += 1;
        Ok(tag)
    }

    /// Returns the change stamp (bumped on every mutation)
    pub fn stamp(&self) -> usize {
        self.stamp
    }

    /// Sets the pseudo-time at which loads and prescribed values are evaluated
    pub fn apply_load(&mut self, t: f64) {
        self.t = t;
    }

    /// Updates internal element state for the current trial solution
    ///
    /// **Note:** The sample formulations are linear and keep no internal state,
    /// so this only has to exist to complete the lifecycle contract.
    pub fn update(&mut self) -> Result<(), StrError> {
        Ok(())
    }

    /// Commits the current state
    pub fn commit(&mut self) {
        self.t_committed = self.t;
    }

    /// Reverts to the last committed state
    pub fn revert_to_last_commit(&mut self) {
        self.t = self.t_committed;
    }

    /// Starts a new pseudo-time step
    pub fn new_step(&mut self, dt: f64) {
        self.dt = dt;
        self.t += dt;
    }

    /// Clears the DofGroup back-references of all nodes
    pub fn clear_dof_groups(&mut self) {
        self.nodes.iter_mut().for_each(|node| node.clear_dof_group());
    }

    /// Reads a JSON file containing the domain data
    pub fn read_json<P>(full_path: &P) -> Result<Self, StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        let data = File::open(path).map_err(|_| "cannot open domain file")?;
        let buffered = BufReader::new(data);
        let domain = serde_json::from_reader(buffered).map_err(|_| "cannot parse domain file")?;
        Ok(domain)
    }

    /// Writes a JSON file with the domain data
    pub fn write_json<P>(&self, full_path: &P) -> Result<(), StrError>
    where
        P: AsRef<OsStr> + ?Sized,
    {
        let path = Path::new(full_path).to_path_buf();
        if let Some(p) = path.parent() {
            fs::create_dir_all(p).map_err(|_| "cannot create directory")?;
        }
        let mut file = File::create(&path).map_err(|_| "cannot create domain file")?;
        serde_json::to_writer(&mut file, &self).map_err(|_| "cannot write domain file")?;
        Ok(())
    }

    /// Checks that a node exists and carries all given DOFs
    fn check_node_dofs(&self, node_id: usize, dofs: &[Dof]) -> Result<(), StrError> {
        let node = self.nodes.get(node_id).ok_or("node id is out of range")?;
        for dof in dofs {
            node.local_dof(*dof)?;
        }
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

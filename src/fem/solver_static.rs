use super::{AnalysisModel, ConstraintHandler, DofGroupKind, FeContext, FemState, LinearSystem, LoadControl, PlainNumberer};
use crate::base::{Config, Dof, Domain};
use crate::StrError;

/// Implements the linear-static analysis driver
///
/// Runs the full pipeline: handle (constraint conversion) → number →
/// finalize IDs → assemble → solve → update → commit. The driver re-runs the
/// conversion whenever the domain change stamp moves (elements killed,
/// constraints added or removed), so the constraint machinery always reflects
/// the current domain. A failed handle pass or an unclean summary aborts the
/// step before the solver is ever invoked.
pub struct SolverStatic<'a> {
    /// Holds configuration parameters
    pub config: &'a Config,

    /// Active constraint enforcement strategy
    pub handler: ConstraintHandler,

    /// Holds all FeElements and DofGroups
    pub model: AnalysisModel,

    /// Assigns the equation numbers
    pub numberer: PlainNumberer,

    /// Drives the assembly (static load control)
    pub integrator: LoadControl,

    /// Domain change stamp at the last successful handle pass
    stamp: Option<usize>,
}

impl<'a> SolverStatic<'a> {
    /// Allocates a new instance
    pub fn new(config: &'a Config) -> Result<Self, StrError> {
        Ok(SolverStatic {
            config,
            handler: ConstraintHandler::new(config)?,
            model: AnalysisModel::new(),
            numberer: PlainNumberer::new(),
            integrator: LoadControl::new(),
            stamp: None,
        })
    }

    /// Solves the linear-static problem at full load factor (t = 1)
    pub fn solve(&mut self, domain: &mut Domain) -> Result<FemState, StrError> {
        self.setup(domain)?;

        // state and loads at full load factor
        let mut state = FemState::new(self.model.n_equation)?;
        state.t = 1.0;
        self.integrator.t = 1.0;
        self.model.apply_load_domain(domain, &mut self.handler, 1.0)?;

        // assemble the global system
        let mut lin_sys = LinearSystem::new(&self.model, self.config)?;
        let triangular = lin_sys.triangular;
        {
            let ctx = FeContext { domain };
            let kk = lin_sys.kk.get_coo_mut()?;
            kk.reset();
            for fe in self.model.fes.iter_mut() {
                fe.calc_tangent(&self.integrator, &ctx)?;
                fe.assemble_tangent(kk, triangular)?;
                fe.calc_unbalance(&state, &self.integrator, &ctx)?;
                fe.assemble_unbalance(&mut lin_sys.rr);
            }
            for group in self.model.dof_groups.iter_mut() {
                group.calc_unbalance(domain, 1.0)?;
                group.assemble_unbalance(&mut lin_sys.rr);
            }
        }

        // solve K·mdu = R and update U ← U − mdu
        lin_sys.solver.actual.factorize(&mut lin_sys.kk, None)?;
        lin_sys
            .solver
            .actual
            .solve(&mut lin_sys.mdu, &lin_sys.kk, &lin_sys.rr, false)?;
        for i in 0..self.model.n_equation {
            state.uu[i] -= lin_sys.mdu[i];
            state.duu[i] = state.uu[i];
        }

        // propagate and commit
        self.model.update_domain(domain, &mut self.handler, &state)?;
        self.model.commit_domain(domain, &mut state);
        Ok(state)
    }

    /// Returns the value of one DOF of one node from the solved state
    ///
    /// Transformed nodes are recovered by back-substitution
    /// (`u_full = T·u_reduced + g(t)`), so eliminated DOFs report their
    /// prescribed values and tied DOFs follow their retained nodes.
    pub fn node_dof_value(
        &self,
        domain: &Domain,
        state: &FemState,
        node_id: usize,
        dof: Dof,
    ) -> Result<f64, StrError> {
        let node = domain.nodes.get(node_id).ok_or("node id is out of range")?;
        let slot = node.local_dof(dof)?;
        let group_tag = self.model.node_group_tag(node_id)?;
        let group = self.model.get_dof_group(group_tag)?;
        match &group.kind {
            DofGroupKind::Physical { .. } => {
                let eq = group.eqs[slot].ok_or("DOF has not been numbered yet")?;
                Ok(state.uu[eq])
            }
            DofGroupKind::Transformed { tt, .. } => {
                let g = group.offset_vector(state.t);
                let mut value = g[slot];
                for (j, eq) in group.eqs.iter().enumerate() {
                    let eq = eq.ok_or("transformed DOF has not been resolved yet")?;
                    value += tt.get(slot, j) * state.uu[eq];
                }
                Ok(value)
            }
            DofGroupKind::Lagrange { .. } => Err("node is represented by a multiplier group"),
        }
    }

    /// Rebuilds the analysis model when the domain has changed
    fn setup(&mut self, domain: &mut Domain) -> Result<(), StrError> {
        if self.stamp == Some(domain.stamp()) && self.model.n_equation > 0 {
            return Ok(());
        }
        let summary = self.handler.handle(domain, &mut self.model, None)?;
        if !summary.is_clean() {
            return Err("cannot proceed because objects were skipped while handling constraints");
        }
        self.numberer.number(&mut self.model)?;
        self.handler.done_numbering(domain, &mut self.model)?;
        self.model.check_equation_coverage()?;
        self.stamp = Some(domain.stamp());
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

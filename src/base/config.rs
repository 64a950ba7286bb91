use super::HandlerKind;
use crate::StrError;
use russell_sparse::Genie;

/// Holds configuration parameters for the analysis
pub struct Config {
    /// Strategy used to enforce constraints
    pub handler: HandlerKind,

    /// Scaling factor applied to the Lagrange multiplier rows/columns
    ///
    /// This is a numerical conditioning knob; the enforcement stays exact for
    /// any positive value.
    pub lagrange_alpha: f64,

    /// Penalty stiffness used by the (fixed) Penalty handler
    pub penalty_alpha: f64,

    /// Enables the stiffness survey of the AutoPenalty handler
    pub auto_penalty: bool,

    /// Orders of magnitude above the surveyed neighboring stiffness
    pub auto_penalty_oom: f64,

    /// Fixed penalty overriding the survey when greater than zero
    pub user_penalty: f64,

    /// Prints information such as the derived penalty values
    pub verbose: bool,

    /// Linear solver kind
    pub lin_sol_genie: Genie,

    /// Assembles the full matrix even if all local tangents are symmetric
    pub ignore_tangent_symmetry: bool,
}

impl Config {
    /// Allocates a new instance with default values
    pub fn new() -> Self {
        Config {
            handler: HandlerKind::Lagrange,
            lagrange_alpha: 1.0,
            penalty_alpha: 1e8,
            auto_penalty: true,
            auto_penalty_oom: 3.0,
            user_penalty: 0.0,
            verbose: false,
            lin_sol_genie: Genie::Umfpack,
            ignore_tangent_symmetry: false,
        }
    }

    /// Sets the constraint enforcement strategy
    pub fn set_handler(&mut self, handler: HandlerKind) -> &mut Self {
        self.handler = handler;
        self
    }

    /// Sets the scaling factor for the Lagrange multiplier rows/columns
    pub fn set_lagrange_alpha(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 {
            return Err("lagrange_alpha must be > 0.0");
        }
        self.lagrange_alpha = value;
        Ok(self)
    }

    /// Sets the penalty stiffness for the fixed Penalty handler
    pub fn set_penalty_alpha(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value <= 0.0 {
            return Err("penalty_alpha must be > 0.0");
        }
        self.penalty_alpha = value;
        Ok(self)
    }

    /// Enables/disables the stiffness survey of the AutoPenalty handler
    pub fn set_auto_penalty(&mut self, flag: bool) -> &mut Self {
        self.auto_penalty = flag;
        self
    }

    /// Sets the orders of magnitude above the surveyed stiffness
    pub fn set_auto_penalty_oom(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 || value > 12.0 {
            return Err("auto_penalty_oom must be in [0.0, 12.0]");
        }
        self.auto_penalty_oom = value;
        Ok(self)
    }

    /// Sets a fixed penalty overriding the survey (ignored when zero)
    pub fn set_user_penalty(&mut self, value: f64) -> Result<&mut Self, StrError> {
        if value < 0.0 {
            return Err("user_penalty must be ≥ 0.0");
        }
        self.user_penalty = value;
        Ok(self)
    }

    /// Enables/disables verbose output
    pub fn set_verbose(&mut self, flag: bool) -> &mut Self {
        self.verbose = flag;
        self
    }

    /// Validates the configuration; returns a message if something is wrong
    pub fn validate(&self) -> Option<String> {
        if self.handler == HandlerKind::AutoPenalty && !self.auto_penalty && self.user_penalty <= 0.0 {
            return Some("AutoPenalty with auto_penalty disabled requires user_penalty > 0.0".to_string());
        }
        None
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////////////////////////

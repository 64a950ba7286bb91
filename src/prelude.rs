//! Makes the most frequently used definitions available

pub use crate::base::{Config, Dof, Domain, Elem, HandlerKind, ParamRod, ParamSpring, Samples};
pub use crate::fem::{AnalysisModel, ConstraintHandler, FemState, PlainNumberer, SolverStatic};
pub use crate::StrError;

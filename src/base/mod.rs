//! Implements the domain-side data model: nodes, elements, constraints, loads

mod config;
mod domain;
mod element;
mod enums;
mod mp_constraint;
mod mrmp_constraint;
mod nodal_load;
mod node;
mod samples;
mod sp_constraint;
pub use crate::base::config::*;
pub use crate::base::domain::*;
pub use crate::base::element::*;
pub use crate::base::enums::*;
pub use crate::base::mp_constraint::*;
pub use crate::base::mrmp_constraint::*;
pub use crate::base::nodal_load::*;
pub use crate::base::node::*;
pub use crate::base::samples::*;
pub use crate::base::sp_constraint::*;

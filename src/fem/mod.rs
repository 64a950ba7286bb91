//! Implements the analysis layer: constraint handling, DOF numbering, assembly

mod analysis_model;
mod constraint_handler;
mod dof_graph;
mod dof_group;
mod element_rod;
mod element_spring;
mod element_trait;
mod fe_element;
mod fe_lagrange;
mod fe_penalty;
mod fe_plain;
mod fe_transform;
mod fem_state;
mod file_io;
mod handler_lagrange;
mod handler_penalty;
mod handler_transform;
mod integrator;
mod linear_system;
mod numberer;
mod solver_static;
mod sync;
pub use crate::fem::analysis_model::*;
pub use crate::fem::constraint_handler::*;
pub use crate::fem::dof_graph::*;
pub use crate::fem::dof_group::*;
pub use crate::fem::element_rod::*;
pub use crate::fem::element_spring::*;
pub use crate::fem::element_trait::*;
pub use crate::fem::fe_element::*;
pub use crate::fem::fe_lagrange::*;
pub use crate::fem::fe_penalty::*;
pub use crate::fem::fe_plain::*;
pub use crate::fem::fe_transform::*;
pub use crate::fem::fem_state::*;
pub use crate::fem::file_io::*;
pub use crate::fem::handler_lagrange::*;
pub use crate::fem::handler_penalty::*;
pub use crate::fem::handler_transform::*;
pub use crate::fem::integrator::*;
pub use crate::fem::linear_system::*;
pub use crate::fem::numberer::*;
pub use crate::fem::solver_static::*;
pub use crate::fem::sync::*;

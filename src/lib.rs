//! Terminal viewer for grid-world environments.
//!
//! A simulation produces snapshots of its objects; the state reconciler turns
//! each snapshot into create/update/destroy calls on a renderer, and the input
//! mapper turns held keys into the action vectors the simulation consumes.

pub mod config;
pub mod env;
pub mod input;
pub mod menubar;
pub mod player;
pub mod reconcile;
pub mod renderer;
pub mod sim;
pub mod types;

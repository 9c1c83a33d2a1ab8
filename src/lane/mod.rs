//! Concrete lane implementations.
//!
//! Each lane kind pairs a model (canonical state + view-set management) with
//! a view (the agent-facing typed handle) and a family of relay types, one
//! per structural mutation.

pub mod list;

//! Core services for sdlc-assist-mcp.
//!
//! This crate owns the record store gateway, assembles project context for the
//! estimation model, enforces the estimation output contract, and talks to the
//! hosted generation endpoint. The control plane composes those pieces for the
//! MCP tool layer.

pub mod context;
pub mod control;
pub mod estimation;
pub mod model;
pub mod services;
pub mod store;

//! MCP tool modules.
//!
//! Tools are grouped by purpose: read-only project access, estimation
//! generation, and contextual help.

pub mod estimation;
pub mod projects;
mod context;

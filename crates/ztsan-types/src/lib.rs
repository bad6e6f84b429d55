//! Zero Trust SAN Types - Wire types for the controller REST contract
//!
//! This crate contains the types exchanged with the Zero Trust SAN controller
//! backend and has zero dependencies on other ztsan crates. It defines:
//!
//! - Nodes as observed through `GET /nodes`, read defensively
//! - The four pipeline stages and the coarser node status
//! - System mode, config and health payloads
//! - Node creation payloads (custom form records and preset shorthand)
//!
//! # Ownership
//!
//! Nodes are owned by the backend. Everything here is a read-only copy of
//! what the last response said; nothing in the dashboard mutates a node.

pub mod lenient;
pub mod mode;
pub mod node;
pub mod spec;

pub use mode::*;
pub use node::*;
pub use spec::*;

/// Base path every controller endpoint lives under
pub const API_BASE_PATH: &str = "/api";

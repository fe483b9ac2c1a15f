//! Capability-Based Access to Physical Memory
//!
//! Hosted backends model physical-memory access as a capability granted
//! by the host rather than ambient privilege.
//!
//! # Security Properties
//! - Capabilities cannot be widened
//! - Rights can only be reduced, never increased
//! - Containment is enforced on every peek

pub mod capability;

pub use capability::{MemoryCapability, Rights};

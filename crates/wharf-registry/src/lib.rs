//! # Wharf Registry
//!
//! [`HostMap`], the single source of truth for which hosts are currently
//! connected.

pub mod error;
pub mod host_map;

pub use error::HostMapError;
pub use host_map::{HostMap, HostMapStats};

//! epcsim-mme: MME NAS layer for the EPS simulator
//!
//! Implements the network-side EMM common procedures (3GPP TS 24.301),
//! starting with identification, on top of a tick-driven timer service and
//! an actor-style task wiring.

pub mod emm;
pub mod tasks;
pub mod timer;

pub use emm::EmmLayer;
pub use timer::EmmTimer;

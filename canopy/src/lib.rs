//! End-to-end exercises for the canopy mesh core.
//!
//! [`testbed`] provides the simulated link layer: virtual radios on a
//! shared air with tree routing, severable links and seeded frame loss.
//! [`simulations`] builds small meshes on top of it and walks them through
//! the address-management protocol; the integration tests run each one.

pub mod simulations;
pub mod testbed;

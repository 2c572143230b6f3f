//! Heat-driven productivity loss sampling.
//!
//! Samples gridded productivity-loss projections at asset locations, reshapes
//! the samples into a long table and discounts them by local air-conditioning
//! penetration.
//!
//! Pipeline:
//!   assets → intensity → sampler → table → scaling → output.

pub mod assets;
pub mod config;
pub mod coords;
pub mod error;
pub mod figures;
pub mod grid;
pub mod intensity;
pub mod output;
pub mod pipeline;
pub mod sampler;
pub mod scaling;
pub mod scenario;
pub mod store;
pub mod table;

pub use error::{Error, Result};

use std::time::Instant;

use once_cell::sync::Lazy;

pub mod clip;
pub mod config;
pub mod eval;
pub mod ga;
pub mod geometry;
pub mod nfp;
pub mod placement;
pub mod session;
pub mod util;

pub static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

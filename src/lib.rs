//! Botball robot controller simulator: a 2D board of PVC pipe, a simulated
//! robot with differential or Create drive, and user programs running on
//! their own threads against the controller library.

pub mod arena;
pub mod assets;
pub mod collision;
pub mod config;
pub mod demos;
pub mod error;
pub mod geometry;
pub mod kinematics;
pub mod logging;
pub mod panel;
pub mod program;
pub mod properties;
pub mod robot;
pub mod sensor;
pub mod simulator;
pub mod types;
pub mod utils;
pub mod wall;

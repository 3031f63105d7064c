//! Project conversion service.
//!
//! Converts completed consultations into projects (exactly once per
//! consultation), tracks team seats with workload accounting, and records
//! repository linkage and milestones.

mod desk;
mod team;

pub use desk::{ProjectDesk, ProjectInput};

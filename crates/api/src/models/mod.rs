//! Database record types.

mod clip;
mod credit;
mod file;
mod project;

pub use clip::{Clip, ClipProject};
pub use credit::Credit;
pub use file::{File, TRACKED_CATEGORIES, status as file_status};
pub use project::Project;

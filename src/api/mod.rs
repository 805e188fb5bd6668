pub mod cohorts;
pub mod community;
pub mod coursework;
pub mod dashboard;
pub mod mentors;
pub mod routes;
pub mod students;

pub use routes::{build_router, ApiError, AppState};

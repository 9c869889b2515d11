pub mod grade;
pub mod review;
pub mod sm2;
pub mod state;
pub mod store;
pub mod web;

pub use grade::{GradeError, QualityGrade};
pub use state::ReviewState;

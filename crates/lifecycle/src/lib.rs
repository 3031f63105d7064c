//! Consultation lifecycle service.
//!
//! Validates and creates consultation records, enforces the status state
//! machine, and answers search/filter/stats queries. Email dispatch runs as
//! a detached background task whose outcome is written back onto the record.

mod desk;
mod validate;

pub use desk::{ConsultationDesk, NewConsultation};
pub use validate::validate;

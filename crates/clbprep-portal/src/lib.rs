//! clbprep-portal — Business records and access control for the prep school.
//!
//! Repository traits over students, courses, enrollments, leads and blog
//! posts with an in-memory implementation, plus salted-password accounts and
//! expiring sessions that gate the admin, teacher and student dashboards.

pub mod auth;
pub mod error;
pub mod model;
pub mod store;

pub use auth::{AuthService, Claims, SessionToken};
pub use error::PortalError;
pub use model::{Dashboard, LeadSource, LeadStatus, Role};
pub use store::{
    CourseRepository, EnrollmentRepository, InMemoryStore, LeadRepository, PostRepository,
    StudentRepository,
};

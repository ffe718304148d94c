//! Portal records: students, courses, enrollments, leads and blog posts.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::PortalError;

/// Trimmed, lowercased address with a non-empty part on each side of `@`.
/// Shared by account registration and student and lead records.
pub(crate) fn normalize_email(value: &str) -> Result<String, PortalError> {
    let email = value.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(PortalError::invalid(
            "email",
            format!("'{}' is not an email address", value.trim()),
        )),
    }
}

// ---------------------------------------------------------------------------
// Students
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    /// CLB level the student is aiming for.
    #[serde(default)]
    pub target_clb: Option<u8>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub target_clb: Option<u8>,
}

/// Partial update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub target_clb: Option<u8>,
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// Target band, e.g. "CLB 5-7".
    pub level: String,
    pub price_cents: u32,
    pub published: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub level: String,
    #[serde(default)]
    pub price_cents: u32,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub level: Option<String>,
    pub price_cents: Option<u32>,
    pub published: Option<bool>,
}

// ---------------------------------------------------------------------------
// Enrollments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub course_id: Uuid,
    pub status: EnrollmentStatus,
    /// Course progress, 0..=100.
    pub progress_percent: u8,
    pub enrolled_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

/// Which form a lead came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LeadSource {
    ContactForm,
    FreeTrial,
    Newsletter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Converted,
    Lost,
}

impl LeadStatus {
    /// Allowed pipeline moves: new → contacted → converted, and any open
    /// lead may be marked lost.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        matches!(
            (self, next),
            (LeadStatus::New, LeadStatus::Contacted)
                | (LeadStatus::New, LeadStatus::Lost)
                | (LeadStatus::Contacted, LeadStatus::Converted)
                | (LeadStatus::Contacted, LeadStatus::Lost)
        )
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadStatus::New => write!(f, "new"),
            LeadStatus::Contacted => write!(f, "contacted"),
            LeadStatus::Converted => write!(f, "converted"),
            LeadStatus::Lost => write!(f, "lost"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
    pub source: LeadSource,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLead {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub message: String,
    pub source: LeadSource,
}

// ---------------------------------------------------------------------------
// Blog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// URL slug for a title: lowercase ASCII words joined by dashes.
///
/// Common French accents fold to their base letter; anything else that is
/// not alphanumeric separates words.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'à' | 'â' | 'ä' => 'a',
            'ç' => 'c',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ÿ' => 'y',
            other => other,
        };
        if folded.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(folded);
        } else {
            pending_dash = true;
        }
    }
    slug
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Teacher => write!(f, "teacher"),
            Role::Student => write!(f, "student"),
        }
    }
}

impl FromStr for Role {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "teacher" => Ok(Role::Teacher),
            "student" => Ok(Role::Student),
            other => Err(PortalError::invalid("role", format!("unknown role '{other}'"))),
        }
    }
}

/// The role-segregated dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dashboard {
    Admin,
    Teacher,
    Student,
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dashboard::Admin => write!(f, "the admin dashboard"),
            Dashboard::Teacher => write!(f, "the teacher dashboard"),
            Dashboard::Student => write!(f, "the student dashboard"),
        }
    }
}

impl Role {
    /// Admins see everything; other roles only their own dashboard.
    pub fn can_view(self, dashboard: Dashboard) -> bool {
        matches!(
            (self, dashboard),
            (Role::Admin, _)
                | (Role::Teacher, Dashboard::Teacher)
                | (Role::Student, Dashboard::Student)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_normalized_once_for_every_caller() {
        assert_eq!(
            normalize_email("  Marie.Tremblay@Exemple.CA ").unwrap(),
            "marie.tremblay@exemple.ca"
        );
        for bad in ["", "marie", "@exemple.ca", "marie@"] {
            assert!(matches!(
                normalize_email(bad),
                Err(PortalError::InvalidInput { field: "email", .. })
            ));
        }
    }

    #[test]
    fn slugify_titles() {
        assert_eq!(
            slugify("Réussir le TEF Canada : 5 conseils"),
            "reussir-le-tef-canada-5-conseils"
        );
        assert_eq!(slugify("  Déjà   vu!! "), "deja-vu");
        assert_eq!(slugify("CLB 7 — pourquoi ?"), "clb-7-pourquoi");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn lead_pipeline() {
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Contacted));
        assert!(LeadStatus::Contacted.can_transition_to(LeadStatus::Converted));
        assert!(LeadStatus::New.can_transition_to(LeadStatus::Lost));
        assert!(!LeadStatus::New.can_transition_to(LeadStatus::Converted));
        assert!(!LeadStatus::Converted.can_transition_to(LeadStatus::Lost));
        assert!(!LeadStatus::Lost.can_transition_to(LeadStatus::New));
    }

    #[test]
    fn dashboard_access() {
        assert!(Role::Admin.can_view(Dashboard::Student));
        assert!(Role::Teacher.can_view(Dashboard::Teacher));
        assert!(!Role::Teacher.can_view(Dashboard::Admin));
        assert!(!Role::Student.can_view(Dashboard::Teacher));
    }

    #[test]
    fn lead_source_wire_names() {
        let json = serde_json::to_string(&LeadSource::FreeTrial).unwrap();
        assert_eq!(json, "\"free-trial\"");
        assert_eq!("Teacher".parse::<Role>().unwrap(), Role::Teacher);
        assert!("owner".parse::<Role>().is_err());
    }
}

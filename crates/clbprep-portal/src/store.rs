//! Repository traits and the in-memory store behind them.
//!
//! Handlers receive an `Arc<InMemoryStore>` (or any other implementation of
//! the traits) explicitly; nothing here is global.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PortalError;
use crate::model::{
    normalize_email, slugify, Course, CourseUpdate, Enrollment, EnrollmentStatus, Lead, LeadStatus, NewCourse,
    NewLead, NewPost, NewStudent, Post, PostUpdate, Student, StudentUpdate,
};

pub type PortalResult<T> = Result<T, PortalError>;

#[async_trait]
pub trait StudentRepository: Send + Sync {
    async fn create_student(&self, new: NewStudent) -> PortalResult<Student>;
    async fn get_student(&self, id: Uuid) -> PortalResult<Student>;
    async fn list_students(&self) -> PortalResult<Vec<Student>>;
    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> PortalResult<Student>;
    /// Deleting a student removes their enrollments too.
    async fn delete_student(&self, id: Uuid) -> PortalResult<()>;
}

#[async_trait]
pub trait CourseRepository: Send + Sync {
    async fn create_course(&self, new: NewCourse) -> PortalResult<Course>;
    async fn get_course(&self, id: Uuid) -> PortalResult<Course>;
    async fn list_courses(&self, published_only: bool) -> PortalResult<Vec<Course>>;
    async fn update_course(&self, id: Uuid, update: CourseUpdate) -> PortalResult<Course>;
    async fn delete_course(&self, id: Uuid) -> PortalResult<()>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> PortalResult<Enrollment>;
    async fn enrollments_for_student(&self, student_id: Uuid) -> PortalResult<Vec<Enrollment>>;
    async fn enrollments_for_course(&self, course_id: Uuid) -> PortalResult<Vec<Enrollment>>;
    /// Progress of 100 marks the enrollment completed.
    async fn update_progress(&self, id: Uuid, progress_percent: u8) -> PortalResult<Enrollment>;
    async fn cancel_enrollment(&self, id: Uuid) -> PortalResult<Enrollment>;
    async fn delete_enrollment(&self, id: Uuid) -> PortalResult<()>;
}

#[async_trait]
pub trait LeadRepository: Send + Sync {
    async fn create_lead(&self, new: NewLead) -> PortalResult<Lead>;
    async fn get_lead(&self, id: Uuid) -> PortalResult<Lead>;
    async fn list_leads(&self, status: Option<LeadStatus>) -> PortalResult<Vec<Lead>>;
    async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> PortalResult<Lead>;
    async fn delete_lead(&self, id: Uuid) -> PortalResult<()>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, new: NewPost) -> PortalResult<Post>;
    async fn get_post_by_slug(&self, slug: &str) -> PortalResult<Post>;
    /// Published posts, newest first.
    async fn list_published(&self) -> PortalResult<Vec<Post>>;
    /// Edits keep the slug, so published links stay valid.
    async fn update_post(&self, id: Uuid, update: PostUpdate) -> PortalResult<Post>;
    async fn publish_post(&self, id: Uuid) -> PortalResult<Post>;
    async fn delete_post(&self, id: Uuid) -> PortalResult<()>;
}

#[derive(Default)]
struct Tables {
    students: HashMap<Uuid, Student>,
    courses: HashMap<Uuid, Course>,
    enrollments: HashMap<Uuid, Enrollment>,
    leads: HashMap<Uuid, Lead>,
    posts: HashMap<Uuid, Post>,
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.students
            .values()
            .any(|s| Some(s.id) != except && s.email.eq_ignore_ascii_case(email))
    }

    fn drop_enrollments_where(&mut self, pred: impl Fn(&Enrollment) -> bool) -> usize {
        let before = self.enrollments.len();
        self.enrollments.retain(|_, e| !pred(e));
        before - self.enrollments.len()
    }
}

/// All repositories over one lock, so cascades are atomic.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn required(field: &'static str, value: &str) -> PortalResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PortalError::invalid(field, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

fn target_clb(level: Option<u8>) -> PortalResult<Option<u8>> {
    match level {
        Some(l) if !(1..=12).contains(&l) => Err(PortalError::invalid(
            "target_clb",
            format!("CLB level must be between 1 and 12, got {l}"),
        )),
        other => Ok(other),
    }
}

#[async_trait]
impl StudentRepository for InMemoryStore {
    async fn create_student(&self, new: NewStudent) -> PortalResult<Student> {
        let student = Student {
            id: Uuid::new_v4(),
            name: required("name", &new.name)?,
            email: normalize_email(&new.email)?,
            phone: new.phone,
            target_clb: target_clb(new.target_clb)?,
            created_at: Utc::now(),
        };
        let mut t = self.tables.write().await;
        if t.email_taken(&student.email, None) {
            return Err(PortalError::Conflict(format!(
                "a student with email {} already exists",
                student.email
            )));
        }
        t.students.insert(student.id, student.clone());
        tracing::debug!(id = %student.id, "created student");
        Ok(student)
    }

    async fn get_student(&self, id: Uuid) -> PortalResult<Student> {
        let t = self.tables.read().await;
        t.students
            .get(&id)
            .cloned()
            .ok_or_else(|| PortalError::not_found("student", id))
    }

    async fn list_students(&self) -> PortalResult<Vec<Student>> {
        let t = self.tables.read().await;
        let mut students: Vec<Student> = t.students.values().cloned().collect();
        students.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(students)
    }

    async fn update_student(&self, id: Uuid, update: StudentUpdate) -> PortalResult<Student> {
        let name = update.name.as_deref().map(|n| required("name", n)).transpose()?;
        let new_email = update.email.as_deref().map(normalize_email).transpose()?;
        let level = target_clb(update.target_clb)?;

        let mut t = self.tables.write().await;
        if let Some(ref e) = new_email {
            if t.email_taken(e, Some(id)) {
                return Err(PortalError::Conflict(format!(
                    "a student with email {e} already exists"
                )));
            }
        }
        let student = t
            .students
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("student", id))?;
        if let Some(n) = name {
            student.name = n;
        }
        if let Some(e) = new_email {
            student.email = e;
        }
        if update.phone.is_some() {
            student.phone = update.phone;
        }
        if level.is_some() {
            student.target_clb = level;
        }
        Ok(student.clone())
    }

    async fn delete_student(&self, id: Uuid) -> PortalResult<()> {
        let mut t = self.tables.write().await;
        if t.students.remove(&id).is_none() {
            return Err(PortalError::not_found("student", id));
        }
        let dropped = t.drop_enrollments_where(|e| e.student_id == id);
        tracing::debug!(%id, enrollments = dropped, "deleted student");
        Ok(())
    }
}

#[async_trait]
impl CourseRepository for InMemoryStore {
    async fn create_course(&self, new: NewCourse) -> PortalResult<Course> {
        let course = Course {
            id: Uuid::new_v4(),
            title: required("title", &new.title)?,
            description: new.description.trim().to_string(),
            level: required("level", &new.level)?,
            price_cents: new.price_cents,
            published: new.published,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .courses
            .insert(course.id, course.clone());
        Ok(course)
    }

    async fn get_course(&self, id: Uuid) -> PortalResult<Course> {
        let t = self.tables.read().await;
        t.courses
            .get(&id)
            .cloned()
            .ok_or_else(|| PortalError::not_found("course", id))
    }

    async fn list_courses(&self, published_only: bool) -> PortalResult<Vec<Course>> {
        let t = self.tables.read().await;
        let mut courses: Vec<Course> = t
            .courses
            .values()
            .filter(|c| !published_only || c.published)
            .cloned()
            .collect();
        courses.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(courses)
    }

    async fn update_course(&self, id: Uuid, update: CourseUpdate) -> PortalResult<Course> {
        let title = update.title.as_deref().map(|v| required("title", v)).transpose()?;
        let level = update.level.as_deref().map(|v| required("level", v)).transpose()?;

        let mut t = self.tables.write().await;
        let course = t
            .courses
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("course", id))?;
        if let Some(v) = title {
            course.title = v;
        }
        if let Some(v) = level {
            course.level = v;
        }
        if let Some(v) = update.description {
            course.description = v.trim().to_string();
        }
        if let Some(v) = update.price_cents {
            course.price_cents = v;
        }
        if let Some(v) = update.published {
            course.published = v;
        }
        Ok(course.clone())
    }

    async fn delete_course(&self, id: Uuid) -> PortalResult<()> {
        let mut t = self.tables.write().await;
        if t.courses.remove(&id).is_none() {
            return Err(PortalError::not_found("course", id));
        }
        let dropped = t.drop_enrollments_where(|e| e.course_id == id);
        tracing::debug!(%id, enrollments = dropped, "deleted course");
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryStore {
    async fn enroll(&self, student_id: Uuid, course_id: Uuid) -> PortalResult<Enrollment> {
        let mut t = self.tables.write().await;
        if !t.students.contains_key(&student_id) {
            return Err(PortalError::not_found("student", student_id));
        }
        if !t.courses.contains_key(&course_id) {
            return Err(PortalError::not_found("course", course_id));
        }
        let duplicate = t.enrollments.values().any(|e| {
            e.student_id == student_id
                && e.course_id == course_id
                && e.status != EnrollmentStatus::Cancelled
        });
        if duplicate {
            return Err(PortalError::Conflict(format!(
                "student {student_id} is already enrolled in course {course_id}"
            )));
        }
        let enrollment = Enrollment {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            status: EnrollmentStatus::Active,
            progress_percent: 0,
            enrolled_at: Utc::now(),
        };
        t.enrollments.insert(enrollment.id, enrollment.clone());
        Ok(enrollment)
    }

    async fn enrollments_for_student(&self, student_id: Uuid) -> PortalResult<Vec<Enrollment>> {
        let t = self.tables.read().await;
        let mut out: Vec<Enrollment> = t
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.enrolled_at);
        Ok(out)
    }

    async fn enrollments_for_course(&self, course_id: Uuid) -> PortalResult<Vec<Enrollment>> {
        let t = self.tables.read().await;
        let mut out: Vec<Enrollment> = t
            .enrollments
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.enrolled_at);
        Ok(out)
    }

    async fn update_progress(&self, id: Uuid, progress_percent: u8) -> PortalResult<Enrollment> {
        if progress_percent > 100 {
            return Err(PortalError::invalid(
                "progress_percent",
                format!("must be at most 100, got {progress_percent}"),
            ));
        }
        let mut t = self.tables.write().await;
        let enrollment = t
            .enrollments
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("enrollment", id))?;
        if enrollment.status == EnrollmentStatus::Cancelled {
            return Err(PortalError::Conflict(format!("enrollment {id} is cancelled")));
        }
        enrollment.progress_percent = progress_percent;
        if progress_percent == 100 {
            enrollment.status = EnrollmentStatus::Completed;
        }
        Ok(enrollment.clone())
    }

    async fn cancel_enrollment(&self, id: Uuid) -> PortalResult<Enrollment> {
        let mut t = self.tables.write().await;
        let enrollment = t
            .enrollments
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("enrollment", id))?;
        enrollment.status = EnrollmentStatus::Cancelled;
        Ok(enrollment.clone())
    }

    async fn delete_enrollment(&self, id: Uuid) -> PortalResult<()> {
        let mut t = self.tables.write().await;
        t.enrollments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortalError::not_found("enrollment", id))
    }
}

#[async_trait]
impl LeadRepository for InMemoryStore {
    async fn create_lead(&self, new: NewLead) -> PortalResult<Lead> {
        let lead = Lead {
            id: Uuid::new_v4(),
            name: required("name", &new.name)?,
            email: normalize_email(&new.email)?,
            phone: new.phone,
            message: new.message.trim().to_string(),
            source: new.source,
            status: LeadStatus::New,
            created_at: Utc::now(),
        };
        self.tables.write().await.leads.insert(lead.id, lead.clone());
        tracing::info!(id = %lead.id, source = ?lead.source, "new lead");
        Ok(lead)
    }

    async fn get_lead(&self, id: Uuid) -> PortalResult<Lead> {
        let t = self.tables.read().await;
        t.leads
            .get(&id)
            .cloned()
            .ok_or_else(|| PortalError::not_found("lead", id))
    }

    async fn list_leads(&self, status: Option<LeadStatus>) -> PortalResult<Vec<Lead>> {
        let t = self.tables.read().await;
        let mut leads: Vec<Lead> = t
            .leads
            .values()
            .filter(|l| status.map_or(true, |s| l.status == s))
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(leads)
    }

    async fn set_lead_status(&self, id: Uuid, status: LeadStatus) -> PortalResult<Lead> {
        let mut t = self.tables.write().await;
        let lead = t
            .leads
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("lead", id))?;
        if !lead.status.can_transition_to(status) {
            return Err(PortalError::Conflict(format!(
                "lead cannot move from {} to {status}",
                lead.status
            )));
        }
        lead.status = status;
        Ok(lead.clone())
    }

    async fn delete_lead(&self, id: Uuid) -> PortalResult<()> {
        let mut t = self.tables.write().await;
        t.leads
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortalError::not_found("lead", id))
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create_post(&self, new: NewPost) -> PortalResult<Post> {
        let title = required("title", &new.title)?;
        let slug = slugify(&title);
        if slug.is_empty() {
            return Err(PortalError::invalid(
                "title",
                "must contain at least one letter or digit",
            ));
        }
        let post = Post {
            id: Uuid::new_v4(),
            slug,
            title,
            body: new.body,
            author: required("author", &new.author)?,
            published_at: None,
            created_at: Utc::now(),
        };
        let mut t = self.tables.write().await;
        if t.posts.values().any(|p| p.slug == post.slug) {
            return Err(PortalError::Conflict(format!(
                "a post with slug '{}' already exists",
                post.slug
            )));
        }
        t.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn get_post_by_slug(&self, slug: &str) -> PortalResult<Post> {
        let t = self.tables.read().await;
        t.posts
            .values()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| PortalError::not_found("post", slug))
    }

    async fn list_published(&self) -> PortalResult<Vec<Post>> {
        let t = self.tables.read().await;
        let mut posts: Vec<Post> = t
            .posts
            .values()
            .filter(|p| p.published_at.is_some())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn update_post(&self, id: Uuid, update: PostUpdate) -> PortalResult<Post> {
        let title = update.title.as_deref().map(|v| required("title", v)).transpose()?;

        let mut t = self.tables.write().await;
        let post = t
            .posts
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("post", id))?;
        if let Some(v) = title {
            post.title = v;
        }
        if let Some(v) = update.body {
            post.body = v;
        }
        Ok(post.clone())
    }

    async fn publish_post(&self, id: Uuid) -> PortalResult<Post> {
        let mut t = self.tables.write().await;
        let post = t
            .posts
            .get_mut(&id)
            .ok_or_else(|| PortalError::not_found("post", id))?;
        if post.published_at.is_none() {
            post.published_at = Some(Utc::now());
        }
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> PortalResult<()> {
        let mut t = self.tables.write().await;
        t.posts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| PortalError::not_found("post", id))
    }
}

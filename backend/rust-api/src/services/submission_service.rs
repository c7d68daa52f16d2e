use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{ApiError, CourseLocks};
use crate::metrics::SUBMISSIONS_TOTAL;
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{Assignment, Course, CourseRef};
use crate::models::enrollment::Enrollment;
use crate::models::submission::{
    AssignmentSubmission, GradeSubmissionRequest, SubmissionStatus, SubmitAssignmentRequest,
};
use crate::store::{self, keys, DocumentStore};

pub struct SubmissionService {
    store: Arc<dyn DocumentStore>,
    locks: Arc<CourseLocks>,
}

impl SubmissionService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<CourseLocks>) -> Self {
        Self { store, locks }
    }

    /// Creates the (assignment, student) submission. Late work is accepted
    /// and flagged, never rejected; due-date enforcement on creation is a
    /// caller/UI concern.
    pub async fn submit(
        &self,
        claims: &JwtClaims,
        assignment_id: &str,
        req: SubmitAssignmentRequest,
    ) -> Result<AssignmentSubmission, ApiError> {
        let (course, assignment) = self.resolve_assignment(assignment_id).await?;
        self.ensure_enrolled(&claims.sub, &course.id).await?;

        let (text_answer, file_url) = req.normalized();
        if text_answer.is_none() && file_url.is_none() {
            return Err(ApiError::EmptySubmission);
        }

        let _guard = self.locks.acquire(&course.id).await;

        let submissions_key = keys::assignment_submissions(assignment_id);
        let mut submissions: Vec<AssignmentSubmission> =
            store::load_list(self.store.as_ref(), &submissions_key).await?;

        if submissions.iter().any(|s| s.student_id == claims.sub) {
            return Err(ApiError::validation(
                "A submission already exists for this assignment; edit it instead",
            ));
        }

        let now = Utc::now();
        let is_late = assignment.due_date.is_some_and(|due| now > due);
        let submission = AssignmentSubmission {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment_id.to_string(),
            student_id: claims.sub.clone(),
            text_answer,
            file_url,
            submitted_at: now,
            status: SubmissionStatus::for_lateness(is_late),
            is_late,
            points_obtained: None,
            instructor_review: None,
            graded_at: None,
            version: 1,
        };

        submissions.push(submission.clone());
        store::save(self.store.as_ref(), &submissions_key, &submissions).await?;

        SUBMISSIONS_TOTAL
            .with_label_values(&[submission.status.as_str()])
            .inc();
        tracing::info!(
            "Submission created: assignment={} student={} late={}",
            assignment_id,
            claims.sub,
            is_late
        );

        Ok(submission)
    }

    /// Edits an existing submission. Blocked once graded or once the due
    /// date has passed; a stored late flag by itself does not block.
    pub async fn edit(
        &self,
        claims: &JwtClaims,
        assignment_id: &str,
        student_id: &str,
        req: SubmitAssignmentRequest,
    ) -> Result<AssignmentSubmission, ApiError> {
        if claims.sub != student_id {
            return Err(ApiError::forbidden(
                "You can only edit your own submission",
            ));
        }

        let (course, assignment) = self.resolve_assignment(assignment_id).await?;

        let (text_answer, file_url) = req.normalized();
        if text_answer.is_none() && file_url.is_none() {
            return Err(ApiError::EmptySubmission);
        }

        let _guard = self.locks.acquire(&course.id).await;

        let submissions_key = keys::assignment_submissions(assignment_id);
        let mut submissions: Vec<AssignmentSubmission> =
            store::load_list(self.store.as_ref(), &submissions_key).await?;

        let submission = submissions
            .iter_mut()
            .find(|s| s.student_id == student_id)
            .ok_or(ApiError::NoSubmission)?;

        let now = Utc::now();
        if submission.is_graded() || assignment.due_date.is_some_and(|due| now > due) {
            return Err(ApiError::NotEditable);
        }

        submission.text_answer = text_answer;
        submission.file_url = file_url;
        submission.submitted_at = now;
        submission.is_late = assignment.due_date.is_some_and(|due| now > due);
        submission.status = SubmissionStatus::for_lateness(submission.is_late);
        submission.version += 1;

        let updated = submission.clone();
        store::save(self.store.as_ref(), &submissions_key, &submissions).await?;

        SUBMISSIONS_TOTAL.with_label_values(&["edited"]).inc();
        tracing::info!(
            "Submission edited: assignment={} student={} version={}",
            assignment_id,
            student_id,
            updated.version
        );

        Ok(updated)
    }

    /// Grades (or regrades) a submission. Regrading overwrites points and
    /// review without touching the version counter.
    pub async fn grade(
        &self,
        claims: &JwtClaims,
        assignment_id: &str,
        student_id: &str,
        req: GradeSubmissionRequest,
    ) -> Result<AssignmentSubmission, ApiError> {
        let (course, assignment) = self.resolve_assignment(assignment_id).await?;
        self.ensure_course_instructor(&course, claims)?;

        if req.points > assignment.points {
            return Err(ApiError::InvalidPoints(format!(
                "Points must be between 0 and {}",
                assignment.points
            )));
        }

        let _guard = self.locks.acquire(&course.id).await;

        let submissions_key = keys::assignment_submissions(assignment_id);
        let mut submissions: Vec<AssignmentSubmission> =
            store::load_list(self.store.as_ref(), &submissions_key).await?;

        let submission = submissions
            .iter_mut()
            .find(|s| s.student_id == student_id)
            .ok_or(ApiError::NoSubmission)?;

        submission.points_obtained = Some(req.points);
        submission.instructor_review = req.review.clone();
        submission.status = SubmissionStatus::Graded;
        submission.graded_at = Some(Utc::now());

        let graded = submission.clone();
        store::save(self.store.as_ref(), &submissions_key, &submissions).await?;

        SUBMISSIONS_TOTAL.with_label_values(&["graded"]).inc();
        tracing::info!(
            "Submission graded: assignment={} student={} points={}",
            assignment_id,
            student_id,
            req.points
        );

        Ok(graded)
    }

    pub async fn get_submission(
        &self,
        claims: &JwtClaims,
        assignment_id: &str,
        student_id: &str,
    ) -> Result<Option<AssignmentSubmission>, ApiError> {
        let (course, _assignment) = self.resolve_assignment(assignment_id).await?;

        if claims.sub != student_id {
            self.ensure_course_instructor(&course, claims)?;
        }

        let submissions: Vec<AssignmentSubmission> = store::load_list(
            self.store.as_ref(),
            &keys::assignment_submissions(assignment_id),
        )
        .await?;

        Ok(submissions
            .into_iter()
            .find(|s| s.student_id == student_id))
    }

    pub async fn list_submissions(
        &self,
        claims: &JwtClaims,
        assignment_id: &str,
    ) -> Result<Vec<AssignmentSubmission>, ApiError> {
        let (course, _assignment) = self.resolve_assignment(assignment_id).await?;
        self.ensure_course_instructor(&course, claims)?;

        store::load_list(
            self.store.as_ref(),
            &keys::assignment_submissions(assignment_id),
        )
        .await
        .map_err(Into::into)
    }

    async fn resolve_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<(Course, Assignment), ApiError> {
        let index = store::load::<CourseRef>(
            self.store.as_ref(),
            &keys::assignment_index(assignment_id),
        )
        .await?
        .ok_or_else(|| ApiError::not_found("Assignment not found"))?;

        let course = store::load::<Course>(self.store.as_ref(), &keys::course(&index.course_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let assignment = course
            .find_assignment(assignment_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Assignment not found"))?;

        Ok((course, assignment))
    }

    async fn ensure_enrolled(&self, user_id: &str, course_id: &str) -> Result<(), ApiError> {
        let enrolled =
            store::load::<Enrollment>(self.store.as_ref(), &keys::enrollment(user_id, course_id))
                .await?
                .is_some();
        if enrolled {
            Ok(())
        } else {
            Err(ApiError::NotEnrolled)
        }
    }

    fn ensure_course_instructor(
        &self,
        course: &Course,
        claims: &JwtClaims,
    ) -> Result<(), ApiError> {
        if claims.role == "admin" || course.instructor_id == claims.sub {
            Ok(())
        } else {
            Err(ApiError::forbidden(
                "Access denied. Course instructor role required.",
            ))
        }
    }
}

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{ApiError, CourseLocks};
use crate::metrics::ENROLLMENTS_TOTAL;
use crate::models::course::Course;
use crate::models::enrollment::{
    EnrolledCourseSummary, Enrollment, LearningStats, RefundNotice, SetProgressRequest,
};
use crate::models::round_one_decimal;
use crate::store::{self, keys, DocumentStore};

pub struct EnrollmentService {
    store: Arc<dyn DocumentStore>,
    locks: Arc<CourseLocks>,
    grace_hours: i64,
}

fn enrolled_summary(course: &Course, enrollment: &Enrollment) -> EnrolledCourseSummary {
    EnrolledCourseSummary {
        course_id: course.id.clone(),
        title: course.title.clone(),
        subtitle: course.subtitle.clone(),
        thumbnail: course.thumbnail.clone(),
        instructor_id: course.instructor_id.clone(),
        total_hours: course.total_hours,
        price: course.price,
        progress: enrollment.progress,
        completed: enrollment.completed,
        enrolled_at: enrollment.enrolled_at,
        last_accessed: enrollment.last_accessed,
    }
}

impl EnrollmentService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<CourseLocks>, grace_hours: i64) -> Self {
        Self {
            store,
            locks,
            grace_hours,
        }
    }

    pub async fn enroll(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<EnrolledCourseSummary, ApiError> {
        // Seat accounting is a read-modify-write on the course document, so
        // the whole operation runs under the course lock.
        let _guard = self.locks.acquire(course_id).await;

        let mut course = store::load::<Course>(self.store.as_ref(), &keys::course(course_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        if !(course.is_published && course.is_approved) {
            return Err(ApiError::NotPublished);
        }

        let enrollment_key = keys::enrollment(user_id, course_id);
        if store::load::<Enrollment>(self.store.as_ref(), &enrollment_key)
            .await?
            .is_some()
        {
            return Err(ApiError::AlreadyEnrolled);
        }

        if let Some(limit) = course.seat_limit {
            if course.total_students >= limit {
                return Err(ApiError::SeatsExhausted);
            }
        }

        let enrollment = Enrollment::new(user_id, course_id);
        store::save(self.store.as_ref(), &enrollment_key, &enrollment).await?;

        course.total_students += 1;
        store::save(self.store.as_ref(), &keys::course(course_id), &course).await?;

        ENROLLMENTS_TOTAL.with_label_values(&["enrolled"]).inc();
        tracing::info!("User {} enrolled in course {}", user_id, course_id);

        Ok(enrolled_summary(&course, &enrollment))
    }

    /// Unenrollment is only allowed inside the grace window. It removes the
    /// enrollment and the lecture-progress record, frees a seat, and records
    /// a refund notice for paid courses (no payment integration).
    pub async fn unenroll(&self, user_id: &str, course_id: &str) -> Result<(), ApiError> {
        let _guard = self.locks.acquire(course_id).await;

        let enrollment_key = keys::enrollment(user_id, course_id);
        let enrollment = store::load::<Enrollment>(self.store.as_ref(), &enrollment_key)
            .await?
            .ok_or(ApiError::NotEnrolled)?;

        let now = Utc::now();
        if now - enrollment.enrolled_at > Duration::hours(self.grace_hours) {
            return Err(ApiError::GracePeriodExpired);
        }

        self.store.delete(&enrollment_key).await?;
        self.store
            .delete(&keys::lecture_progress(user_id, course_id))
            .await?;

        if let Some(mut course) =
            store::load::<Course>(self.store.as_ref(), &keys::course(course_id)).await?
        {
            course.total_students = course.total_students.saturating_sub(1);
            store::save(self.store.as_ref(), &keys::course(course_id), &course).await?;

            if course.price > 0.0 {
                let notice = RefundNotice {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.to_string(),
                    course_id: course_id.to_string(),
                    amount: course.price,
                    created_at: now,
                };
                store::save(
                    self.store.as_ref(),
                    &keys::refund_notice(&notice.id),
                    &notice,
                )
                .await?;
                tracing::info!(
                    "Refund notice {} recorded for user {} on course {} ({})",
                    notice.id,
                    user_id,
                    course_id,
                    course.price
                );
            }
        }

        ENROLLMENTS_TOTAL.with_label_values(&["unenrolled"]).inc();
        tracing::info!("User {} unenrolled from course {}", user_id, course_id);

        Ok(())
    }

    pub async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool, ApiError> {
        Ok(
            store::load::<Enrollment>(self.store.as_ref(), &keys::enrollment(user_id, course_id))
                .await?
                .is_some(),
        )
    }

    /// Direct progress write (PUT course-progress). Progress is clamped to
    /// [0, 100]; completed=true forces progress to 100.
    pub async fn set_progress(
        &self,
        user_id: &str,
        course_id: &str,
        req: SetProgressRequest,
    ) -> Result<Enrollment, ApiError> {
        let enrollment_key = keys::enrollment(user_id, course_id);
        let mut enrollment = store::load::<Enrollment>(self.store.as_ref(), &enrollment_key)
            .await?
            .ok_or(ApiError::NotEnrolled)?;

        if let Some(progress) = req.progress {
            enrollment.progress = progress.clamp(0, 100) as u8;
        }

        if let Some(completed) = req.completed {
            enrollment.completed = completed;
            if completed {
                enrollment.progress = 100;
            }
        }

        enrollment.last_accessed = Utc::now();
        store::save(self.store.as_ref(), &enrollment_key, &enrollment).await?;

        Ok(enrollment)
    }

    pub async fn list_enrolled(
        &self,
        user_id: &str,
    ) -> Result<Vec<EnrolledCourseSummary>, ApiError> {
        let enrollments: Vec<Enrollment> =
            store::load_prefix(self.store.as_ref(), &keys::enrollment_prefix(user_id)).await?;

        let mut summaries = Vec::with_capacity(enrollments.len());
        for enrollment in &enrollments {
            if let Some(course) = store::load::<Course>(
                self.store.as_ref(),
                &keys::course(&enrollment.course_id),
            )
            .await?
            {
                summaries.push(enrolled_summary(&course, enrollment));
            }
        }
        summaries.sort_by(|a, b| b.enrolled_at.cmp(&a.enrolled_at));
        Ok(summaries)
    }

    pub async fn learning_stats(&self, user_id: &str) -> Result<LearningStats, ApiError> {
        let enrollments: Vec<Enrollment> =
            store::load_prefix(self.store.as_ref(), &keys::enrollment_prefix(user_id)).await?;

        let total_courses = enrollments.len();
        let completed_courses = enrollments.iter().filter(|e| e.completed).count();

        let average_progress = if total_courses == 0 {
            0
        } else {
            let sum: u32 = enrollments.iter().map(|e| u32::from(e.progress)).sum();
            ((f64::from(sum) / total_courses as f64).round()) as u8
        };

        let mut learning_hours = 0.0;
        for enrollment in &enrollments {
            if let Some(course) = store::load::<Course>(
                self.store.as_ref(),
                &keys::course(&enrollment.course_id),
            )
            .await?
            {
                learning_hours += course.total_hours * f64::from(enrollment.progress) / 100.0;
            }
        }

        Ok(LearningStats {
            total_courses,
            completed_courses,
            in_progress_courses: total_courses - completed_courses,
            average_progress,
            total_learning_hours: round_one_decimal(learning_hours),
        })
    }
}

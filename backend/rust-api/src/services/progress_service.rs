use std::sync::Arc;

use chrono::Utc;

use super::ApiError;
use crate::metrics::LECTURES_COMPLETED_TOTAL;
use crate::models::course::Course;
use crate::models::enrollment::{Enrollment, LectureProgress};
use crate::store::{self, keys, DocumentStore};

/// Watch fraction at which a lecture counts as completed
pub const COMPLETION_WATCH_FRACTION: f64 = 0.95;

pub struct ProgressService {
    store: Arc<dyn DocumentStore>,
}

impl ProgressService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Marks a lecture complete. Idempotent: re-completing is a no-op.
    /// Completion is a one-way ratchet, and the derived enrollment progress
    /// never decreases through this path even if the lecture set grew since.
    pub async fn mark_complete(
        &self,
        user_id: &str,
        course_id: &str,
        lecture_id: &str,
        trigger: &str,
    ) -> Result<(Enrollment, LectureProgress), ApiError> {
        let (course, mut enrollment) = self.load_enrolled_course(user_id, course_id).await?;

        if course.find_lecture(lecture_id).is_none() {
            return Err(ApiError::not_found("Lecture not found"));
        }

        let progress_key = keys::lecture_progress(user_id, course_id);
        let mut lecture_progress =
            store::load::<LectureProgress>(self.store.as_ref(), &progress_key)
                .await?
                .unwrap_or_default();

        let newly_completed = lecture_progress.mark_complete(lecture_id);
        if newly_completed {
            store::save(self.store.as_ref(), &progress_key, &lecture_progress).await?;
            LECTURES_COMPLETED_TOTAL.with_label_values(&[trigger]).inc();
            tracing::info!(
                "Lecture {} completed by user {} in course {} ({})",
                lecture_id,
                user_id,
                course_id,
                trigger
            );
        }

        let percentage = lecture_progress.percentage(&course);
        enrollment.apply_progress(percentage.max(enrollment.progress));
        store::save(
            self.store.as_ref(),
            &keys::enrollment(user_id, course_id),
            &enrollment,
        )
        .await?;

        Ok((enrollment, lecture_progress))
    }

    /// Watch-position report from the player. Crossing the 95% threshold is
    /// equivalent to marking the lecture complete; anything less only
    /// refreshes last_accessed.
    pub async fn record_watch_progress(
        &self,
        user_id: &str,
        course_id: &str,
        lecture_id: &str,
        fraction_watched: f64,
    ) -> Result<(Enrollment, LectureProgress), ApiError> {
        if !(0.0..=1.0).contains(&fraction_watched) {
            return Err(ApiError::validation(
                "fraction_watched must be between 0 and 1",
            ));
        }

        if fraction_watched >= COMPLETION_WATCH_FRACTION {
            return self
                .mark_complete(user_id, course_id, lecture_id, "watch_threshold")
                .await;
        }

        let (course, mut enrollment) = self.load_enrolled_course(user_id, course_id).await?;
        if course.find_lecture(lecture_id).is_none() {
            return Err(ApiError::not_found("Lecture not found"));
        }

        enrollment.last_accessed = Utc::now();
        store::save(
            self.store.as_ref(),
            &keys::enrollment(user_id, course_id),
            &enrollment,
        )
        .await?;

        let lecture_progress = store::load::<LectureProgress>(
            self.store.as_ref(),
            &keys::lecture_progress(user_id, course_id),
        )
        .await?
        .unwrap_or_default();

        Ok((enrollment, lecture_progress))
    }

    async fn load_enrolled_course(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<(Course, Enrollment), ApiError> {
        let course = store::load::<Course>(self.store.as_ref(), &keys::course(course_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let enrollment =
            store::load::<Enrollment>(self.store.as_ref(), &keys::enrollment(user_id, course_id))
                .await?
                .ok_or(ApiError::NotEnrolled)?;

        Ok((course, enrollment))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::Course;

/// Enrollment record stored under `enrollment_<userId>_<courseId>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    /// Percentage in [0, 100]
    pub progress: u8,
    pub completed: bool,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(user_id: &str, course_id: &str) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            progress: 0,
            completed: false,
            enrolled_at: now,
            last_accessed: now,
        }
    }

    /// Applies a freshly recomputed progress percentage. Completion latches:
    /// once a course is completed it stays completed.
    pub fn apply_progress(&mut self, progress: u8) {
        self.progress = progress.min(100);
        if self.progress == 100 {
            self.completed = true;
        }
        self.last_accessed = Utc::now();
    }
}

/// Completed-lecture set stored under `lecture_progress_<userId>_<courseId>`.
/// Lecture ids only ever get added; there is no un-complete operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LectureProgress {
    pub completed_lecture_ids: Vec<String>,
}

impl LectureProgress {
    /// Inserts the lecture id; returns false when it was already present.
    pub fn mark_complete(&mut self, lecture_id: &str) -> bool {
        if self.completed_lecture_ids.iter().any(|id| id == lecture_id) {
            return false;
        }
        self.completed_lecture_ids.push(lecture_id.to_string());
        true
    }

    /// Course progress percentage: completed lectures that still exist in the
    /// course, over the current lecture count, rounded to the nearest integer.
    pub fn percentage(&self, course: &Course) -> u8 {
        let total = course.lecture_count();
        if total == 0 {
            return 0;
        }
        let completed = course
            .lectures()
            .filter(|lecture| {
                self.completed_lecture_ids
                    .iter()
                    .any(|id| id == &lecture.id)
            })
            .count();
        ((completed as f64 / total as f64) * 100.0).round() as u8
    }
}

/// Refund notice persisted when a paid enrollment is cancelled inside the
/// grace window. No payment integration: the record is the whole side effect.
#[derive(Debug, Serialize, Deserialize)]
pub struct RefundNotice {
    pub id: String,
    pub user_id: String,
    pub course_id: String,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SetProgressRequest {
    pub progress: Option<i32>,
    pub completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct WatchProgressRequest {
    pub fraction_watched: f64,
}

/// Entry of the enrolled-courses listing
#[derive(Debug, Serialize)]
pub struct EnrolledCourseSummary {
    pub course_id: String,
    pub title: String,
    pub subtitle: String,
    pub thumbnail: String,
    pub instructor_id: String,
    pub total_hours: f64,
    pub price: f64,
    pub progress: u8,
    pub completed: bool,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Aggregate learning statistics across a user's enrollments
#[derive(Debug, Serialize)]
pub struct LearningStats {
    pub total_courses: usize,
    pub completed_courses: usize,
    pub in_progress_courses: usize,
    pub average_progress: u8,
    pub total_learning_hours: f64,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Submitted,
    SubmittedLate,
    Graded,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Submitted => "submitted",
            SubmissionStatus::SubmittedLate => "submitted_late",
            SubmissionStatus::Graded => "graded",
        }
    }

    pub fn for_lateness(is_late: bool) -> Self {
        if is_late {
            SubmissionStatus::SubmittedLate
        } else {
            SubmissionStatus::Submitted
        }
    }
}

/// One submission per (assignment, student); the whole set for an assignment
/// is stored as a list under `assignment_submissions_<assignmentId>`. A pair
/// without a record is "pending".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub id: String,
    pub assignment_id: String,
    pub student_id: String,
    pub text_answer: Option<String>,
    pub file_url: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub status: SubmissionStatus,
    /// Frozen at submission (or last edit) time: was the work handed in after
    /// the due date. Lateness never blocks submission.
    pub is_late: bool,
    pub points_obtained: Option<u32>,
    pub instructor_review: Option<String>,
    pub graded_at: Option<DateTime<Utc>>,
    /// 1 on submit, incremented on every edit, untouched by grading.
    pub version: u32,
}

impl AssignmentSubmission {
    pub fn is_graded(&self) -> bool {
        self.points_obtained.is_some()
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitAssignmentRequest {
    pub text_answer: Option<String>,
    pub file_url: Option<String>,
}

impl SubmitAssignmentRequest {
    /// A submission must carry a text answer or a file (or both). Blank
    /// strings count as absent.
    pub fn normalized(&self) -> (Option<String>, Option<String>) {
        let text = self
            .text_answer
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let file = self
            .file_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        (text, file)
    }
}

#[derive(Debug, Deserialize)]
pub struct GradeSubmissionRequest {
    pub points: u32,
    pub review: Option<String>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::course::{Quiz, QuizView};

/// In-flight attempt stored under `quiz_session_<quizId>_<studentId>`.
/// Exists only between start and submit; the deadline is server-side so the
/// client timer is cosmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveQuizSession {
    pub quiz_id: String,
    pub student_id: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    /// One slot per question; None = unanswered.
    pub answers: Vec<Option<u32>>,
}

impl ActiveQuizSession {
    pub fn start(quiz: &Quiz, student_id: &str) -> Self {
        let now = Utc::now();
        Self {
            quiz_id: quiz.id.clone(),
            student_id: student_id.to_string(),
            started_at: now,
            deadline: now + chrono::Duration::minutes(i64::from(quiz.time_limit_minutes)),
            answers: vec![None; quiz.questions.len()],
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }
}

/// Scores an answer sheet against a quiz: exact matches only, unanswered
/// counts wrong. Returns (correct count, percentage).
pub fn score_answers(quiz: &Quiz, answers: &[Option<u32>]) -> (u32, u32) {
    let correct = quiz
        .questions
        .iter()
        .zip(answers.iter())
        .filter(|(question, answer)| **answer == Some(question.correct_option))
        .count() as u32;

    let total = quiz.questions.len() as u32;
    let percentage = if total == 0 {
        0
    } else {
        ((f64::from(correct) / f64::from(total)) * 100.0).round() as u32
    };
    (correct, percentage)
}

/// Completed attempt, appended to the list under `quiz_attempts_<quizId>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: String,
    pub quiz_id: String,
    pub student_id: String,
    pub answers: Vec<Option<u32>>,
    /// Correct answer count
    pub score: u32,
    pub percentage: u32,
    pub submitted_at: DateTime<Utc>,
    pub time_spent_seconds: i64,
    pub timed_out: bool,
}

/// Per-student aggregate stored under `quiz_stats_<quizId>_<studentId>`;
/// best_score is recomputed as a max on every submit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizStats {
    pub attempted: bool,
    pub best_score: u32,
}

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question_index: usize,
    /// Expected 0..=3; range is the caller's contract and is stored as sent.
    pub option_index: u32,
}

#[derive(Debug, Serialize)]
pub struct QuizSessionView {
    pub quiz_id: String,
    pub started_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub answered: usize,
    pub quiz: QuizView,
}

impl QuizSessionView {
    pub fn from_session(session: &ActiveQuizSession, quiz: &Quiz) -> Self {
        Self {
            quiz_id: session.quiz_id.clone(),
            started_at: session.started_at,
            deadline: session.deadline,
            answered: session.answers.iter().filter(|a| a.is_some()).count(),
            quiz: QuizView::for_student(quiz),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AttemptResult {
    pub attempt_id: String,
    pub quiz_id: String,
    pub score: u32,
    pub percentage: u32,
    pub total_questions: usize,
    pub best_score: u32,
    pub time_spent_seconds: i64,
    pub timed_out: bool,
}

#[derive(Debug, Serialize)]
pub struct AttemptHistory {
    pub quiz_id: String,
    pub attempted: bool,
    pub best_score: u32,
    pub attempts: Vec<QuizAttempt>,
}

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use super::{ApiError, CourseLocks};
use crate::metrics::QUIZ_ATTEMPTS_TOTAL;
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{Course, CourseRef, Quiz};
use crate::models::enrollment::Enrollment;
use crate::models::quiz::{
    score_answers, ActiveQuizSession, AnswerRequest, AttemptHistory, AttemptResult, QuizAttempt,
    QuizSessionView, QuizStats,
};
use crate::store::{self, keys, DocumentStore};

/// Timed attempt sessions with a server-side deadline. The client renders a
/// countdown; the authoritative clock and all scoring live here. There is no
/// background timer: an expired session is finalized as a timed-out attempt
/// the next time it is observed, and a session abandoned before its deadline
/// leaves no attempt record.
pub struct QuizService {
    store: Arc<dyn DocumentStore>,
    locks: Arc<CourseLocks>,
}

impl QuizService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<CourseLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn start(
        &self,
        claims: &JwtClaims,
        quiz_id: &str,
    ) -> Result<QuizSessionView, ApiError> {
        let (course, quiz) = self.resolve_quiz(quiz_id).await?;
        self.ensure_enrolled(&claims.sub, &course.id).await?;

        let _guard = self.locks.acquire(&course.id).await;

        let session_key = keys::quiz_session(quiz_id, &claims.sub);
        if let Some(existing) =
            store::load::<ActiveQuizSession>(self.store.as_ref(), &session_key).await?
        {
            if existing.is_expired(Utc::now()) {
                // The previous attempt ran out of time without being
                // observed; it submits with whatever was answered.
                self.finalize_session(&quiz, existing, true).await?;
            } else {
                tracing::info!(
                    "Abandoning in-progress quiz session: quiz={} student={}",
                    quiz_id,
                    claims.sub
                );
            }
        }

        let session = ActiveQuizSession::start(&quiz, &claims.sub);
        store::save(self.store.as_ref(), &session_key, &session).await?;

        tracing::info!(
            "Quiz attempt started: quiz={} student={} deadline={}",
            quiz_id,
            claims.sub,
            session.deadline
        );

        Ok(QuizSessionView::from_session(&session, &quiz))
    }

    pub async fn answer(
        &self,
        claims: &JwtClaims,
        quiz_id: &str,
        req: AnswerRequest,
    ) -> Result<QuizSessionView, ApiError> {
        let (course, quiz) = self.resolve_quiz(quiz_id).await?;

        let session_key = keys::quiz_session(quiz_id, &claims.sub);
        let mut session = store::load::<ActiveQuizSession>(self.store.as_ref(), &session_key)
            .await?
            .ok_or_else(|| ApiError::not_found("No active quiz attempt"))?;

        if session.is_expired(Utc::now()) {
            let _guard = self.locks.acquire(&course.id).await;
            self.finalize_session(&quiz, session, true).await?;
            return Err(ApiError::validation(
                "Time expired: the attempt was submitted automatically",
            ));
        }

        if req.question_index >= session.answers.len() {
            return Err(ApiError::validation("question_index out of range"));
        }

        // Overwrites any prior answer for the slot. The 0..=3 option range is
        // the caller's contract; anything else just scores as wrong.
        session.answers[req.question_index] = Some(req.option_index);
        store::save(self.store.as_ref(), &session_key, &session).await?;

        Ok(QuizSessionView::from_session(&session, &quiz))
    }

    pub async fn submit(
        &self,
        claims: &JwtClaims,
        quiz_id: &str,
    ) -> Result<AttemptResult, ApiError> {
        let (course, quiz) = self.resolve_quiz(quiz_id).await?;

        let session_key = keys::quiz_session(quiz_id, &claims.sub);
        let session = store::load::<ActiveQuizSession>(self.store.as_ref(), &session_key)
            .await?
            .ok_or_else(|| ApiError::not_found("No active quiz attempt"))?;

        let timed_out = session.is_expired(Utc::now());

        let _guard = self.locks.acquire(&course.id).await;
        self.finalize_session(&quiz, session, timed_out).await
    }

    pub async fn attempt_history(
        &self,
        claims: &JwtClaims,
        quiz_id: &str,
    ) -> Result<AttemptHistory, ApiError> {
        let (course, _quiz) = self.resolve_quiz(quiz_id).await?;
        self.ensure_enrolled(&claims.sub, &course.id).await?;

        let attempts: Vec<QuizAttempt> =
            store::load_list(self.store.as_ref(), &keys::quiz_attempts(quiz_id)).await?;
        let own_attempts: Vec<QuizAttempt> = attempts
            .into_iter()
            .filter(|attempt| attempt.student_id == claims.sub)
            .collect();

        let stats = store::load::<QuizStats>(
            self.store.as_ref(),
            &keys::quiz_stats(quiz_id, &claims.sub),
        )
        .await?
        .unwrap_or_default();

        Ok(AttemptHistory {
            quiz_id: quiz_id.to_string(),
            attempted: stats.attempted,
            best_score: stats.best_score,
            attempts: own_attempts,
        })
    }

    /// Scores the session, appends the attempt, recomputes the best-score
    /// aggregate as a max, and consumes the session record (exactly-once:
    /// a second submit finds no session). Caller holds the course lock.
    async fn finalize_session(
        &self,
        quiz: &Quiz,
        session: ActiveQuizSession,
        timed_out: bool,
    ) -> Result<AttemptResult, ApiError> {
        let (score, percentage) = score_answers(quiz, &session.answers);

        let submitted_at = if timed_out {
            session.deadline
        } else {
            Utc::now()
        };
        let time_spent_seconds = (submitted_at - session.started_at).num_seconds().max(0);

        let attempt = QuizAttempt {
            id: Uuid::new_v4().to_string(),
            quiz_id: quiz.id.clone(),
            student_id: session.student_id.clone(),
            answers: session.answers.clone(),
            score,
            percentage,
            submitted_at,
            time_spent_seconds,
            timed_out,
        };

        let attempts_key = keys::quiz_attempts(&quiz.id);
        let mut attempts: Vec<QuizAttempt> =
            store::load_list(self.store.as_ref(), &attempts_key).await?;
        attempts.push(attempt.clone());
        store::save(self.store.as_ref(), &attempts_key, &attempts).await?;

        let stats_key = keys::quiz_stats(&quiz.id, &session.student_id);
        let mut stats = store::load::<QuizStats>(self.store.as_ref(), &stats_key)
            .await?
            .unwrap_or_default();
        stats.attempted = true;
        stats.best_score = stats.best_score.max(percentage);
        store::save(self.store.as_ref(), &stats_key, &stats).await?;

        self.store
            .delete(&keys::quiz_session(&quiz.id, &session.student_id))
            .await?;

        let trigger = if timed_out { "timeout" } else { "manual" };
        QUIZ_ATTEMPTS_TOTAL.with_label_values(&[trigger]).inc();
        tracing::info!(
            "Quiz attempt submitted: quiz={} student={} percentage={} trigger={}",
            quiz.id,
            session.student_id,
            percentage,
            trigger
        );

        Ok(AttemptResult {
            attempt_id: attempt.id,
            quiz_id: quiz.id.clone(),
            score,
            percentage,
            total_questions: quiz.questions.len(),
            best_score: stats.best_score,
            time_spent_seconds,
            timed_out,
        })
    }

    async fn resolve_quiz(&self, quiz_id: &str) -> Result<(Course, Quiz), ApiError> {
        let index = store::load::<CourseRef>(self.store.as_ref(), &keys::quiz_index(quiz_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Quiz not found"))?;

        let course = store::load::<Course>(self.store.as_ref(), &keys::course(&index.course_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Course not found"))?;

        let quiz = course
            .find_quiz(quiz_id)
            .cloned()
            .ok_or_else(|| ApiError::not_found("Quiz not found"))?;

        Ok((course, quiz))
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
}

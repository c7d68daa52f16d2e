use axum::http::StatusCode;
use serde_json::{json, Value};

mod common;

/// Course with three quizzes:
/// - "Fundamentals check": 5 questions, answer key [0, 1, 2, 3, 0]
/// - "Lightning round": 10 questions, first option always correct
/// - "Instant deadline": zero-minute time limit, expired the moment it starts
fn quiz_payload() -> Value {
    let four_options = json!(["a", "b", "c", "d"]);

    let fundamentals: Vec<Value> = [0, 1, 2, 3, 0]
        .iter()
        .enumerate()
        .map(|(index, correct)| {
            json!({
                "text": format!("Fundamentals question {}", index + 1),
                "options": four_options,
                "correct_option": correct
            })
        })
        .collect();

    let lightning: Vec<Value> = (0..10)
        .map(|index| {
            json!({
                "text": format!("Lightning question {}", index + 1),
                "options": four_options,
                "correct_option": 0
            })
        })
        .collect();

    common::merge(
        common::course_payload(),
        json!({
            "quizzes": [
                {
                    "title": "Fundamentals check",
                    "time_limit_minutes": 30,
                    "questions": fundamentals
                },
                {
                    "title": "Lightning round",
                    "time_limit_minutes": 30,
                    "questions": lightning
                },
                {
                    "title": "Instant deadline",
                    "time_limit_minutes": 0,
                    "questions": [
                        {
                            "text": "Too late already",
                            "options": four_options,
                            "correct_option": 0
                        },
                        {
                            "text": "Also too late",
                            "options": four_options,
                            "correct_option": 1
                        }
                    ]
                }
            ]
        }),
    )
}

struct QuizWorld {
    app: axum::Router,
    student_token: String,
    fundamentals: String,
    lightning: String,
    instant: String,
}

async fn setup() -> QuizWorld {
    let app = common::create_test_app().await;

    let (_, _instructor_token, course) =
        common::setup_published_course(&app, quiz_payload()).await;
    let course_id = course["id"].as_str().unwrap();
    let fundamentals = course["quizzes"][0]["id"].as_str().unwrap().to_string();
    let lightning = course["quizzes"][1]["id"].as_str().unwrap().to_string();
    let instant = course["quizzes"][2]["id"].as_str().unwrap().to_string();

    let (_, student_token) = common::register_and_login(&app, "student").await;
    let (status, _) = common::enroll(&app, &student_token, course_id).await;
    assert_eq!(status, StatusCode::OK);

    QuizWorld {
        app,
        student_token,
        fundamentals,
        lightning,
        instant,
    }
}

async fn start(world: &QuizWorld, quiz_id: &str) -> (StatusCode, Value) {
    common::request(
        &world.app,
        "POST",
        &format!("/api/quizzes/{}/attempts", quiz_id),
        Some(&world.student_token),
        None,
    )
    .await
}

async fn answer(
    world: &QuizWorld,
    quiz_id: &str,
    question_index: usize,
    option_index: u32,
) -> (StatusCode, Value) {
    common::request(
        &world.app,
        "PUT",
        &format!("/api/quizzes/{}/attempts/answer", quiz_id),
        Some(&world.student_token),
        Some(json!({
            "question_index": question_index,
            "option_index": option_index
        })),
    )
    .await
}

async fn submit(world: &QuizWorld, quiz_id: &str) -> (StatusCode, Value) {
    common::request(
        &world.app,
        "POST",
        &format!("/api/quizzes/{}/attempts/submit", quiz_id),
        Some(&world.student_token),
        None,
    )
    .await
}

async fn history(world: &QuizWorld, quiz_id: &str) -> (StatusCode, Value) {
    common::request(
        &world.app,
        "GET",
        &format!("/api/quizzes/{}/attempts", quiz_id),
        Some(&world.student_token),
        None,
    )
    .await
}

/// Answers the first `correct_count` lightning-round questions correctly and
/// submits, returning the reported percentage and best score.
async fn lightning_attempt(world: &QuizWorld, correct_count: usize) -> (u64, u64) {
    let (status, _) = start(world, &world.lightning).await;
    assert_eq!(status, StatusCode::CREATED);

    for index in 0..correct_count {
        let (status, _) = answer(world, &world.lightning, index, 0).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, json) = submit(world, &world.lightning).await;
    assert_eq!(status, StatusCode::OK, "submit failed: {}", json);
    (
        json["result"]["percentage"].as_u64().unwrap(),
        json["result"]["best_score"].as_u64().unwrap(),
    )
}

#[tokio::test]
async fn test_start_requires_enrollment() {
    let world = setup().await;

    let (_, outsider_token) = common::register_and_login(&world.app, "student").await;
    let (status, _) = common::request(
        &world.app,
        "POST",
        &format!("/api/quizzes/{}/attempts", world.fundamentals),
        Some(&outsider_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_start_returns_unanswered_session_without_answer_keys() {
    let world = setup().await;

    let (status, json) = start(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["session"]["answered"], 0);
    assert_eq!(json["session"]["quiz"]["question_count"], 5);
    assert_eq!(json["session"]["quiz"]["questions"].as_array().unwrap().len(), 5);
    assert!(json["session"]["quiz"]["questions"][0]
        .get("correct_option")
        .is_none());
    assert!(json["session"]["deadline"].is_string());
}

#[tokio::test]
async fn test_answer_overwrites_prior_answer_for_the_slot() {
    let world = setup().await;
    start(&world, &world.fundamentals).await;

    let (status, json) = answer(&world, &world.fundamentals, 0, 3).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["answered"], 1);

    // Changing the answer keeps the answered count at one
    let (status, json) = answer(&world, &world.fundamentals, 0, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["session"]["answered"], 1);
}

#[tokio::test]
async fn test_answer_rejects_out_of_range_question_index() {
    let world = setup().await;
    start(&world, &world.fundamentals).await;

    let (status, json) = answer(&world, &world.fundamentals, 5, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("question_index"));
}

#[tokio::test]
async fn test_answer_without_session_returns_404() {
    let world = setup().await;

    let (status, _) = answer(&world, &world.fundamentals, 0, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_perfect_answers_score_one_hundred_percent() {
    let world = setup().await;
    start(&world, &world.fundamentals).await;

    for (index, option) in [0, 1, 2, 3, 0].iter().enumerate() {
        answer(&world, &world.fundamentals, index, *option).await;
    }

    let (status, json) = submit(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["score"], 5);
    assert_eq!(json["result"]["percentage"], 100);
    assert_eq!(json["result"]["total_questions"], 5);
    assert_eq!(json["result"]["timed_out"], false);
}

#[tokio::test]
async fn test_unanswered_question_counts_wrong() {
    let world = setup().await;
    start(&world, &world.fundamentals).await;

    // Four correct, fifth left blank
    for (index, option) in [0, 1, 2, 3].iter().enumerate() {
        answer(&world, &world.fundamentals, index, *option).await;
    }

    let (status, json) = submit(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["score"], 4);
    assert_eq!(json["result"]["percentage"], 80);
}

#[tokio::test]
async fn test_best_score_is_monotonic_max_across_attempts() {
    let world = setup().await;

    let (percentage, best) = lightning_attempt(&world, 6).await;
    assert_eq!((percentage, best), (60, 60));

    // A worse second attempt does not lower the best score
    let (percentage, best) = lightning_attempt(&world, 4).await;
    assert_eq!((percentage, best), (40, 60));

    let (percentage, best) = lightning_attempt(&world, 9).await;
    assert_eq!((percentage, best), (90, 90));

    let (status, json) = history(&world, &world.lightning).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempted"], true);
    assert_eq!(json["best_score"], 90);
    assert_eq!(json["attempts"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_second_submit_fails_because_session_is_consumed() {
    let world = setup().await;
    start(&world, &world.fundamentals).await;

    let (status, _) = submit(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = submit(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_abandoned_unexpired_sessions_leave_no_attempt_records() {
    let world = setup().await;

    // Start twice without ever submitting: the first session is discarded
    let (status, _) = start(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = start(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = history(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempted"], false);
    assert_eq!(json["best_score"], 0);
    assert_eq!(json["attempts"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_expired_session_is_finalized_on_answer() {
    let world = setup().await;

    // Zero-minute limit: the deadline has passed by the first observation
    let (status, _) = start(&world, &world.instant).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = answer(&world, &world.instant, 0, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["message"].as_str().unwrap().contains("Time expired"));

    // The timeout produced a durable attempt with nothing answered
    let (status, json) = history(&world, &world.instant).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempted"], true);
    assert_eq!(json["best_score"], 0);

    let attempts = json["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["timed_out"], true);
    assert_eq!(attempts[0]["percentage"], 0);
    assert_eq!(attempts[0]["answers"], json!([null, null]));
}

#[tokio::test]
async fn test_expired_session_is_finalized_on_restart() {
    let world = setup().await;

    let (status, _) = start(&world, &world.instant).await;
    assert_eq!(status, StatusCode::CREATED);

    // Restarting past the deadline first converts the stale session into a
    // timed-out attempt, then opens a fresh one
    let (status, _) = start(&world, &world.instant).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = history(&world, &world.instant).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["attempts"].as_array().unwrap().len(), 1);
    assert_eq!(json["attempts"][0]["timed_out"], true);
}

#[tokio::test]
async fn test_submit_after_deadline_marks_timeout_and_caps_time_spent() {
    let world = setup().await;

    start(&world, &world.instant).await;

    let (status, json) = submit(&world, &world.instant).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"]["timed_out"], true);
    // time_spent is capped at the (zero-minute) limit
    assert_eq!(json["result"]["time_spent_seconds"], 0);
}

#[tokio::test]
async fn test_submit_without_session_returns_404() {
    let world = setup().await;

    let (status, _) = submit(&world, &world.fundamentals).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_quiz_returns_404() {
    let world = setup().await;

    let (status, _) = common::request(
        &world.app,
        "POST",
        "/api/quizzes/no-such-quiz/attempts",
        Some(&world.student_token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::round_one_decimal;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CourseCategory {
    WebDevelopment,
    MobileDevelopment,
    DataScience,
    Design,
    Business,
    Marketing,
}

impl CourseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CourseCategory::WebDevelopment => "web-development",
            CourseCategory::MobileDevelopment => "mobile-development",
            CourseCategory::DataScience => "data-science",
            CourseCategory::Design => "design",
            CourseCategory::Business => "business",
            CourseCategory::Marketing => "marketing",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
    #[default]
    #[serde(rename = "All Levels")]
    AllLevels,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
    Pdf,
    Doc,
    Zip,
    #[default]
    Link,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lecture {
    pub id: String,
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub duration_minutes: u32,
    pub order: u32,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    pub order: u32,
    pub lectures: Vec<Lecture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub kind: MaterialKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub title: String,
    pub description: String,
    pub points: u32,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    /// Index into `options`. Never serialized to students; see
    /// [`QuizView::for_student`].
    pub correct_option: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: String,
    pub rating: u8,
    #[serde(default)]
    pub review: String,
    pub created_at: DateTime<Utc>,
}

/// Course record stored under `course_<id>`. Derived fields are rebuilt by
/// [`Course::rebuild_derived`] on every catalog write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub instructor_id: String,
    pub category: CourseCategory,
    pub price: f64,
    pub original_price: Option<f64>,
    pub is_free: bool,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub level: CourseLevel,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub seat_limit: Option<u32>,
    pub total_hours: f64,
    pub is_published: bool,
    pub is_approved: bool,
    pub average_rating: f64,
    pub total_ratings: u32,
    pub total_students: u32,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub assignments: Vec<Assignment>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_language() -> String {
    "English".to_string()
}

impl Course {
    pub fn lectures(&self) -> impl Iterator<Item = &Lecture> {
        self.sections.iter().flat_map(|section| section.lectures.iter())
    }

    pub fn lecture_count(&self) -> usize {
        self.lectures().count()
    }

    pub fn find_lecture(&self, lecture_id: &str) -> Option<&Lecture> {
        self.lectures().find(|lecture| lecture.id == lecture_id)
    }

    pub fn find_assignment(&self, assignment_id: &str) -> Option<&Assignment> {
        self.assignments
            .iter()
            .find(|assignment| assignment.id == assignment_id)
    }

    pub fn find_quiz(&self, quiz_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|quiz| quiz.id == quiz_id)
    }

    pub fn seats_available(&self) -> Option<u32> {
        self.seat_limit
            .map(|limit| limit.saturating_sub(self.total_students))
    }

    pub fn discount_percentage(&self) -> u32 {
        match self.original_price {
            Some(original) if original > self.price && original > 0.0 => {
                (((original - self.price) / original) * 100.0).round() as u32
            }
            _ => 0,
        }
    }

    /// Recomputes every derived field that depends on course content:
    /// total_hours from the lecture set, is_free from the price, and the
    /// rating aggregates. total_students is owned by the enrollment side.
    pub fn rebuild_derived(&mut self) {
        let total_minutes: u32 = self.lectures().map(|lecture| lecture.duration_minutes).sum();
        self.total_hours = round_one_decimal(f64::from(total_minutes) / 60.0);

        self.is_free = self.price == 0.0;

        self.total_ratings = self.ratings.len() as u32;
        self.average_rating = if self.ratings.is_empty() {
            0.0
        } else {
            let sum: u32 = self.ratings.iter().map(|r| u32::from(r.rating)).sum();
            round_one_decimal(f64::from(sum) / self.ratings.len() as f64)
        };

        self.updated_at = Utc::now();
    }

    /// One rating per user: an existing rating by the same user is replaced,
    /// otherwise the rating is appended. Aggregates are rebuilt afterwards.
    pub fn upsert_rating(&mut self, user_id: &str, rating: u8, review: String) {
        let now = Utc::now();
        match self.ratings.iter_mut().find(|r| r.user_id == user_id) {
            Some(existing) => {
                existing.rating = rating;
                existing.review = review;
                existing.created_at = now;
            }
            None => self.ratings.push(Rating {
                user_id: user_id.to_string(),
                rating,
                review,
                created_at: now,
            }),
        }
        self.rebuild_derived();
    }
}

// ---------------------------------------------------------------------------
// Client views

/// Catalog listing entry (the fields the original exposed on its course list)
#[derive(Debug, Serialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub instructor_id: String,
    pub category: CourseCategory,
    pub price: f64,
    pub original_price: Option<f64>,
    pub is_free: bool,
    pub discount_percentage: u32,
    pub thumbnail: String,
    pub level: CourseLevel,
    pub total_hours: f64,
    pub average_rating: f64,
    pub total_ratings: u32,
    pub total_students: u32,
    pub seats_available: Option<u32>,
    pub is_published: bool,
    pub is_approved: bool,
}

impl CourseSummary {
    pub fn from_course(course: &Course) -> Self {
        Self {
            id: course.id.clone(),
            title: course.title.clone(),
            subtitle: course.subtitle.clone(),
            instructor_id: course.instructor_id.clone(),
            category: course.category,
            price: course.price,
            original_price: course.original_price,
            is_free: course.is_free,
            discount_percentage: course.discount_percentage(),
            thumbnail: course.thumbnail.clone(),
            level: course.level,
            total_hours: course.total_hours,
            average_rating: course.average_rating,
            total_ratings: course.total_ratings,
            total_students: course.total_students,
            seats_available: course.seats_available(),
            is_published: course.is_published,
            is_approved: course.is_approved,
        }
    }
}

/// Quiz as shown to students: no correct options on the wire.
#[derive(Debug, Serialize)]
pub struct QuestionView {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QuizView {
    pub id: String,
    pub title: String,
    pub time_limit_minutes: u32,
    pub question_count: usize,
    pub questions: Vec<QuestionView>,
}

impl QuizView {
    pub fn for_student(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id.clone(),
            title: quiz.title.clone(),
            time_limit_minutes: quiz.time_limit_minutes,
            question_count: quiz.questions.len(),
            questions: quiz
                .questions
                .iter()
                .map(|question| QuestionView {
                    text: question.text.clone(),
                    options: question.options.clone(),
                })
                .collect(),
        }
    }
}

/// Full course detail. Quiz answer keys are only included for the owning
/// instructor or an admin.
#[derive(Debug, Serialize)]
pub struct CourseDetail {
    #[serde(flatten)]
    pub summary: CourseSummary,
    pub description: String,
    pub language: String,
    pub requirements: Vec<String>,
    pub learning_outcomes: Vec<String>,
    pub tags: Vec<String>,
    pub sections: Vec<Section>,
    pub assignments: Vec<Assignment>,
    pub materials: Vec<Material>,
    pub quizzes: Vec<QuizView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quizzes_with_answers: Option<Vec<Quiz>>,
    pub ratings: Vec<Rating>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseDetail {
    pub fn from_course(course: &Course, include_answers: bool) -> Self {
        Self {
            summary: CourseSummary::from_course(course),
            description: course.description.clone(),
            language: course.language.clone(),
            requirements: course.requirements.clone(),
            learning_outcomes: course.learning_outcomes.clone(),
            tags: course.tags.clone(),
            sections: course.sections.clone(),
            assignments: course.assignments.clone(),
            materials: course.materials.clone(),
            quizzes: course.quizzes.iter().map(QuizView::for_student).collect(),
            quizzes_with_answers: include_answers.then(|| course.quizzes.clone()),
            ratings: course.ratings.clone(),
            created_at: course.created_at,
            updated_at: course.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests

#[derive(Debug, Clone, Deserialize)]
pub struct LectureInput {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_preview: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    pub title: String,
    pub lectures: Vec<LectureInput>,
}

impl SectionInput {
    pub fn into_section(self, order: u32) -> Section {
        Section {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            order,
            lectures: self
                .lectures
                .into_iter()
                .enumerate()
                .map(|(index, lecture)| Lecture {
                    id: Uuid::new_v4().to_string(),
                    title: lecture.title,
                    description: lecture.description,
                    video_url: lecture.video_url,
                    duration_minutes: lecture.duration_minutes,
                    order: index as u32,
                    is_preview: lecture.is_preview,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignmentInput {
    pub title: String,
    pub description: String,
    pub points: u32,
    pub due_date: Option<DateTime<Utc>>,
}

impl AssignmentInput {
    pub fn into_assignment(self) -> Assignment {
        Assignment {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            description: self.description,
            points: self.points,
            due_date: self.due_date,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionInput {
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuizInput {
    pub title: String,
    pub time_limit_minutes: u32,
    pub questions: Vec<QuestionInput>,
}

impl QuizInput {
    pub fn into_quiz(self) -> Quiz {
        Quiz {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            time_limit_minutes: self.time_limit_minutes,
            questions: self
                .questions
                .into_iter()
                .map(|question| Question {
                    text: question.text,
                    options: question.options,
                    correct_option: question.correct_option,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaterialInput {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub kind: MaterialKind,
}

impl MaterialInput {
    pub fn into_material(self) -> Material {
        Material {
            id: Uuid::new_v4().to_string(),
            title: self.title,
            url: self.url,
            kind: self.kind,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 200, message = "Subtitle must be 1-200 characters"))]
    pub subtitle: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    pub category: CourseCategory,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    pub original_price: Option<f64>,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub level: CourseLevel,
    pub language: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub learning_outcomes: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub seat_limit: Option<u32>,
    #[serde(default)]
    pub sections: Vec<SectionInput>,
    #[serde(default)]
    pub assignments: Vec<AssignmentInput>,
    #[serde(default)]
    pub quizzes: Vec<QuizInput>,
    #[serde(default)]
    pub materials: Vec<MaterialInput>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCourseRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Subtitle must be 1-200 characters"))]
    pub subtitle: Option<String>,

    pub description: Option<String>,
    pub category: Option<CourseCategory>,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    pub original_price: Option<f64>,
    pub thumbnail: Option<String>,
    pub level: Option<CourseLevel>,
    pub language: Option<String>,
    pub requirements: Option<Vec<String>>,
    pub learning_outcomes: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub seat_limit: Option<u32>,
    pub sections: Option<Vec<SectionInput>>,
    pub assignments: Option<Vec<AssignmentInput>>,
    pub quizzes: Option<Vec<QuizInput>>,
    pub materials: Option<Vec<MaterialInput>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RateCourseRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: u8,

    #[validate(length(max = 500, message = "Review cannot be more than 500 characters"))]
    #[serde(default)]
    pub review: String,
}

/// Course-to-course index records (`assignment_index_<id>`, `quiz_index_<id>`)
/// so assignment and quiz routes can resolve their owning course without a
/// catalog scan.
#[derive(Debug, Serialize, Deserialize)]
pub struct CourseRef {
    pub course_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course_with_lectures(durations: &[u32]) -> Course {
        let lectures = durations
            .iter()
            .enumerate()
            .map(|(index, minutes)| Lecture {
                id: format!("lecture-{}", index),
                title: format!("Lecture {}", index),
                description: String::new(),
                video_url: String::new(),
                duration_minutes: *minutes,
                order: index as u32,
                is_preview: false,
            })
            .collect();

        let now = Utc::now();
        Course {
            id: "course-1".to_string(),
            title: "Test Course".to_string(),
            subtitle: "Subtitle".to_string(),
            description: "Description".to_string(),
            instructor_id: "instructor-1".to_string(),
            category: CourseCategory::WebDevelopment,
            price: 0.0,
            original_price: None,
            is_free: true,
            thumbnail: String::new(),
            level: CourseLevel::AllLevels,
            language: "English".to_string(),
            requirements: Vec::new(),
            learning_outcomes: Vec::new(),
            tags: Vec::new(),
            seat_limit: None,
            total_hours: 0.0,
            is_published: false,
            is_approved: false,
            average_rating: 0.0,
            total_ratings: 0,
            total_students: 0,
            sections: vec![Section {
                id: "section-1".to_string(),
                title: "Section".to_string(),
                order: 0,
                lectures,
            }],
            assignments: Vec::new(),
            quizzes: Vec::new(),
            materials: Vec::new(),
            ratings: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_hours_rounds_to_one_decimal() {
        let mut course = course_with_lectures(&[45, 30]);
        course.rebuild_derived();
        assert_eq!(course.total_hours, 1.3);
    }

    #[test]
    fn is_free_follows_price() {
        let mut course = course_with_lectures(&[]);
        course.price = 19.99;
        course.rebuild_derived();
        assert!(!course.is_free);

        course.price = 0.0;
        course.rebuild_derived();
        assert!(course.is_free);
    }

    #[test]
    fn average_rating_is_mean_rounded_to_one_decimal() {
        let mut course = course_with_lectures(&[]);
        course.upsert_rating("u1", 5, String::new());
        course.upsert_rating("u2", 3, String::new());
        course.upsert_rating("u3", 4, String::new());

        assert_eq!(course.average_rating, 4.0);
        assert_eq!(course.total_ratings, 3);
    }

    #[test]
    fn same_user_rating_replaces_instead_of_appending() {
        let mut course = course_with_lectures(&[]);
        course.upsert_rating("u1", 5, String::new());
        course.upsert_rating("u2", 3, String::new());
        course.upsert_rating("u3", 4, String::new());
        course.upsert_rating("u2", 5, "much better".to_string());

        assert_eq!(course.total_ratings, 3);
        assert_eq!(course.average_rating, 4.7);
    }

    #[test]
    fn discount_percentage_requires_higher_original_price() {
        let mut course = course_with_lectures(&[]);
        course.price = 80.0;
        course.original_price = Some(100.0);
        assert_eq!(course.discount_percentage(), 20);

        course.original_price = Some(50.0);
        assert_eq!(course.discount_percentage(), 0);

        course.original_price = None;
        assert_eq!(course.discount_percentage(), 0);
    }

    #[test]
    fn student_quiz_view_omits_correct_options() {
        let quiz = Quiz {
            id: "quiz-1".to_string(),
            title: "Quiz".to_string(),
            time_limit_minutes: 10,
            questions: vec![Question {
                text: "2+2?".to_string(),
                options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
                correct_option: 1,
            }],
        };

        let view = QuizView::for_student(&quiz);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json["questions"][0].get("correct_option").is_none());
        assert_eq!(json["question_count"], 1);
    }
}

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use super::{ApiError, CourseLocks};
use crate::middlewares::auth::JwtClaims;
use crate::models::course::{
    Course, CourseDetail, CourseRef, CourseSummary, CreateCourseRequest, RateCourseRequest,
    UpdateCourseRequest,
};
use crate::models::enrollment::Enrollment;
use crate::store::{self, keys, DocumentStore};

pub struct CatalogService {
    store: Arc<dyn DocumentStore>,
    locks: Arc<CourseLocks>,
}

fn ensure_instructor_role(claims: &JwtClaims) -> Result<(), ApiError> {
    if claims.role == "instructor" || claims.role == "admin" {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "Access denied. Instructor role required.",
        ))
    }
}

fn is_owner_or_admin(course: &Course, claims: &JwtClaims) -> bool {
    claims.role == "admin" || course.instructor_id == claims.sub
}

impl CatalogService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<CourseLocks>) -> Self {
        Self { store, locks }
    }

    pub async fn create_course(
        &self,
        claims: &JwtClaims,
        req: CreateCourseRequest,
    ) -> Result<CourseDetail, ApiError> {
        ensure_instructor_role(claims)?;
        req.validate()
            .map_err(|e| ApiError::validation(format!("Validation error: {}", e)))?;

        // Original price defaults to 20% above the asking price for paid
        // courses when the instructor does not provide one.
        let original_price = req.original_price.or_else(|| {
            (req.price > 0.0).then(|| (req.price * 1.2).round())
        });

        let now = Utc::now();
        let mut course = Course {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            subtitle: req.subtitle,
            description: req.description,
            instructor_id: claims.sub.clone(),
            category: req.category,
            price: req.price,
            original_price,
            is_free: req.price == 0.0,
            thumbnail: req.thumbnail,
            level: req.level,
            language: req.language.unwrap_or_else(|| "English".to_string()),
            requirements: req.requirements,
            learning_outcomes: req.learning_outcomes,
            tags: req.tags,
            seat_limit: req.seat_limit,
            total_hours: 0.0,
            is_published: false,
            is_approved: false,
            average_rating: 0.0,
            total_ratings: 0,
            total_students: 0,
            sections: req
                .sections
                .into_iter()
                .enumerate()
                .map(|(order, section)| section.into_section(order as u32))
                .collect(),
            assignments: req
                .assignments
                .into_iter()
                .map(|assignment| assignment.into_assignment())
                .collect(),
            quizzes: req.quizzes.into_iter().map(|quiz| quiz.into_quiz()).collect(),
            materials: req
                .materials
                .into_iter()
                .map(|material| material.into_material())
                .collect(),
            ratings: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        course.rebuild_derived();

        store::save(self.store.as_ref(), &keys::course(&course.id), &course).await?;
        self.write_index_records(&course).await?;

        tracing::info!(
            "Course created: {} by instructor {}",
            course.id,
            course.instructor_id
        );

        Ok(CourseDetail::from_course(&course, true))
    }

    pub async fn update_course(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: UpdateCourseRequest,
    ) -> Result<CourseDetail, ApiError> {
        req.validate()
            .map_err(|e| ApiError::validation(format!("Validation error: {}", e)))?;

        let _guard = self.locks.acquire(course_id).await;

        let mut course = self.load_course(course_id).await?;
        if !is_owner_or_admin(&course, claims) {
            return Err(ApiError::forbidden(
                "Access denied. You can only update your own courses.",
            ));
        }

        let old_assignment_ids: HashSet<String> =
            course.assignments.iter().map(|a| a.id.clone()).collect();
        let old_quiz_ids: HashSet<String> = course.quizzes.iter().map(|q| q.id.clone()).collect();

        if let Some(title) = req.title {
            course.title = title;
        }
        if let Some(subtitle) = req.subtitle {
            course.subtitle = subtitle;
        }
        if let Some(description) = req.description {
            course.description = description;
        }
        if let Some(category) = req.category {
            course.category = category;
        }
        if let Some(price) = req.price {
            course.price = price;
        }
        if req.original_price.is_some() {
            course.original_price = req.original_price;
        }
        if let Some(thumbnail) = req.thumbnail {
            course.thumbnail = thumbnail;
        }
        if let Some(level) = req.level {
            course.level = level;
        }
        if let Some(language) = req.language {
            course.language = language;
        }
        if let Some(requirements) = req.requirements {
            course.requirements = requirements;
        }
        if let Some(learning_outcomes) = req.learning_outcomes {
            course.learning_outcomes = learning_outcomes;
        }
        if let Some(tags) = req.tags {
            course.tags = tags;
        }
        if req.seat_limit.is_some() {
            course.seat_limit = req.seat_limit;
        }
        if let Some(sections) = req.sections {
            course.sections = sections
                .into_iter()
                .enumerate()
                .map(|(order, section)| section.into_section(order as u32))
                .collect();
        }
        if let Some(assignments) = req.assignments {
            course.assignments = assignments
                .into_iter()
                .map(|assignment| assignment.into_assignment())
                .collect();
        }
        if let Some(quizzes) = req.quizzes {
            course.quizzes = quizzes.into_iter().map(|quiz| quiz.into_quiz()).collect();
        }
        if let Some(materials) = req.materials {
            course.materials = materials
                .into_iter()
                .map(|material| material.into_material())
                .collect();
        }

        course.rebuild_derived();
        store::save(self.store.as_ref(), &keys::course(&course.id), &course).await?;

        // Reconcile assignment/quiz index records: removed content loses its
        // lookup entry, new content gains one.
        for removed in old_assignment_ids
            .iter()
            .filter(|id| course.find_assignment(id).is_none())
        {
            self.store.delete(&keys::assignment_index(removed)).await?;
        }
        for removed in old_quiz_ids
            .iter()
            .filter(|id| course.find_quiz(id).is_none())
        {
            self.store.delete(&keys::quiz_index(removed)).await?;
        }
        self.write_index_records(&course).await?;

        tracing::info!("Course updated: {}", course.id);

        Ok(CourseDetail::from_course(&course, true))
    }

    pub async fn get_course(
        &self,
        claims: Option<&JwtClaims>,
        course_id: &str,
    ) -> Result<CourseDetail, ApiError> {
        let course = self.load_course(course_id).await?;

        let privileged = claims.is_some_and(|claims| is_owner_or_admin(&course, claims));
        if !(course.is_published && course.is_approved) && !privileged {
            return Err(ApiError::forbidden("Course is not available"));
        }

        Ok(CourseDetail::from_course(&course, privileged))
    }

    pub async fn list_published(&self) -> Result<Vec<CourseSummary>, ApiError> {
        let mut courses: Vec<Course> =
            store::load_prefix(self.store.as_ref(), keys::COURSE_PREFIX).await?;
        courses.retain(|course| course.is_published && course.is_approved);
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses.iter().map(CourseSummary::from_course).collect())
    }

    pub async fn list_by_instructor(
        &self,
        claims: &JwtClaims,
    ) -> Result<Vec<CourseSummary>, ApiError> {
        ensure_instructor_role(claims)?;

        let mut courses: Vec<Course> =
            store::load_prefix(self.store.as_ref(), keys::COURSE_PREFIX).await?;
        courses.retain(|course| course.instructor_id == claims.sub);
        courses.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(courses.iter().map(CourseSummary::from_course).collect())
    }

    /// Publishing controls catalog visibility only; already-enrolled students
    /// keep access through their enrollment records.
    pub async fn set_published(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        published: bool,
    ) -> Result<CourseSummary, ApiError> {
        let _guard = self.locks.acquire(course_id).await;

        let mut course = self.load_course(course_id).await?;
        if !is_owner_or_admin(&course, claims) {
            return Err(ApiError::forbidden(
                "Access denied. You can only publish your own courses.",
            ));
        }

        course.is_published = published;
        course.updated_at = Utc::now();
        store::save(self.store.as_ref(), &keys::course(&course.id), &course).await?;

        tracing::info!(
            "Course {}: {}",
            if published { "published" } else { "unpublished" },
            course.id
        );

        Ok(CourseSummary::from_course(&course))
    }

    pub async fn approve(
        &self,
        claims: &JwtClaims,
        course_id: &str,
    ) -> Result<CourseSummary, ApiError> {
        if claims.role != "admin" {
            return Err(ApiError::forbidden("Access denied. Admin role required."));
        }

        let _guard = self.locks.acquire(course_id).await;

        let mut course = self.load_course(course_id).await?;
        course.is_approved = true;
        course.updated_at = Utc::now();
        store::save(self.store.as_ref(), &keys::course(&course.id), &course).await?;

        tracing::info!("Course approved: {}", course.id);

        Ok(CourseSummary::from_course(&course))
    }

    /// Rating upsert: one rating per user, latest replaces prior. Runs under
    /// the course lock so concurrent raters cannot clobber the aggregates.
    pub async fn rate(
        &self,
        claims: &JwtClaims,
        course_id: &str,
        req: RateCourseRequest,
    ) -> Result<CourseSummary, ApiError> {
        req.validate()
            .map_err(|e| ApiError::validation(format!("Validation error: {}", e)))?;

        let enrollment = store::load::<Enrollment>(
            self.store.as_ref(),
            &keys::enrollment(&claims.sub, course_id),
        )
        .await?;
        if enrollment.is_none() {
            return Err(ApiError::NotEnrolled);
        }

        let _guard = self.locks.acquire(course_id).await;

        let mut course = self.load_course(course_id).await?;
        course.upsert_rating(&claims.sub, req.rating, req.review);
        store::save(self.store.as_ref(), &keys::course(&course.id), &course).await?;

        Ok(CourseSummary::from_course(&course))
    }

    async fn load_course(&self, course_id: &str) -> Result<Course, ApiError> {
        store::load::<Course>(self.store.as_ref(), &keys::course(course_id))
            .await?
            .ok_or_else(|| ApiError::not_found("Course not found"))
    }

    async fn write_index_records(&self, course: &Course) -> Result<(), ApiError> {
        for assignment in &course.assignments {
            store::save(
                self.store.as_ref(),
                &keys::assignment_index(&assignment.id),
                &CourseRef {
                    course_id: course.id.clone(),
                },
            )
            .await?;
        }
        for quiz in &course.quizzes {
            store::save(
                self.store.as_ref(),
                &keys::quiz_index(&quiz.id),
                &CourseRef {
                    course_id: course.id.clone(),
                },
            )
            .await?;
        }
        Ok(())
    }
}

// src/repository/postgres.rs

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        common::{ListParams, Page},
        course::{Course, CourseRequest},
        quiz::{
            AnswerOption, CreateQuizRequest, Quiz, QuizListItem, QuizType, QuizWithOptions,
            UpdateQuizRequest, check_correct_options,
        },
        test_record::{NewTestRecord, TestRecord, TestRecordSummary},
        user::User,
    },
    repository::Repository,
};

/// Quizzes with their options aggregated in one statement, so a read is one snapshot.
const QUIZ_SELECT: &str = r#"
    SELECT
        q.id, q.title, q.course_id, q.chapter, q.type, q.remark, q.created_at, q.updated_at,
        c.title AS course_title,
        COALESCE(
            json_agg(
                json_build_object('id', o.id, 'quiz_id', o.quiz_id, 'content', o.content, 'is_correct', o.is_correct)
                ORDER BY o.id
            ) FILTER (WHERE o.id IS NOT NULL),
            '[]'::json
        )::jsonb AS answer_options
    FROM quizzes q
    LEFT JOIN courses c ON c.id = q.course_id
    LEFT JOIN answer_options o ON o.quiz_id = q.id
"#;

const QUIZ_GROUP_BY: &str = " GROUP BY q.id, c.title ORDER BY q.id";

const RECORD_COLUMNS: &str = r#"
    id, user_id, title, quiz_ids, answer_options_ids, answered_ids, correct_ratio, created_at, updated_at
"#;

/// Helper struct for reading one aggregated quiz row.
#[derive(FromRow)]
struct QuizRow {
    #[sqlx(flatten)]
    quiz: Quiz,
    course_title: Option<String>,
    answer_options: Json<Vec<AnswerOption>>,
}

impl QuizRow {
    fn into_quiz(self) -> QuizWithOptions {
        QuizWithOptions {
            quiz: self.quiz,
            answer_options: self.answer_options.0,
        }
    }

    fn into_list_item(self) -> QuizListItem {
        let QuizRow {
            quiz,
            course_title,
            answer_options,
        } = self;
        QuizListItem {
            quiz: QuizWithOptions {
                quiz,
                answer_options: answer_options.0,
            },
            course_title,
        }
    }
}

/// Maps constraint violations to client errors; everything else is a 500.
fn map_write_error(err: sqlx::Error, context: &str) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_foreign_key_violation() {
            return AppError::BadRequest(format!("{}: referenced row does not exist", context));
        }
        if db_err.is_unique_violation() {
            return AppError::Conflict(format!("{}: already exists", context));
        }
    }
    tracing::error!("{}: {:?}", context, err);
    AppError::InternalServerError(err.to_string())
}

fn like_pattern(keyword: &str) -> String {
    format!("%{}%", keyword)
}

/// Postgres implementation of [`Repository`].
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password, role)
            VALUES ($1, $2, $3)
            RETURNING id, username, password, role, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e, "Failed to create user") {
            AppError::Conflict(_) => {
                AppError::Conflict(format!("Username '{}' already exists", username))
            }
            other => other,
        })
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, parent_id, remark, created_at, updated_at FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO categories (name, parent_id, remark) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&req.name)
        .bind(req.parent_id)
        .bind(&req.remark)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create category"))?;

        Ok(id)
    }

    async fn update_category(&self, id: i64, req: &UpdateCategoryRequest) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET name = $1, parent_id = $2, remark = $3, updated_at = NOW()
            WHERE id = $4
            "#,
        )
        .bind(&req.name)
        .bind(req.parent_id)
        .bind(&req.remark)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update category"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to delete category"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        Ok(())
    }

    async fn list_courses(&self, params: &ListParams) -> Result<Page<Course>, AppError> {
        let pattern = params.keyword().map(like_pattern);

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM courses
            WHERE ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1)
            "#,
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, description, cover, category_id, created_at, updated_at
            FROM courses
            WHERE ($1::TEXT IS NULL OR title ILIKE $1 OR description ILIKE $1)
            ORDER BY id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { rows, count })
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, title, description, cover, category_id, created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    async fn create_course(&self, req: &CourseRequest) -> Result<i64, AppError> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO courses (title, description, cover, category_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.cover)
        .bind(req.category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to create course"))?;

        Ok(id)
    }

    async fn update_course(&self, id: i64, req: &CourseRequest) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE courses
            SET title = $1, description = $2, cover = $3, category_id = $4, updated_at = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&req.title)
        .bind(&req.description)
        .bind(&req.cover)
        .bind(req.category_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to update course"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
        Ok(())
    }

    async fn delete_course(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM courses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to delete course"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
        Ok(())
    }

    async fn list_quizzes(&self, params: &ListParams) -> Result<Page<QuizListItem>, AppError> {
        let pattern = params.keyword().map(like_pattern);

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM quizzes WHERE ($1::TEXT IS NULL OR title ILIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(QUIZ_SELECT);
        if let Some(pattern) = pattern {
            builder.push(" WHERE q.title ILIKE ");
            builder.push_bind(pattern);
        }
        builder.push(QUIZ_GROUP_BY);
        builder.push(" LIMIT ");
        builder.push_bind(params.limit());
        builder.push(" OFFSET ");
        builder.push_bind(params.offset());

        let rows: Vec<QuizRow> = builder.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page {
            rows: rows.into_iter().map(QuizRow::into_list_item).collect(),
            count,
        })
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<QuizWithOptions>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(QUIZ_SELECT);
        builder.push(" WHERE q.id = ");
        builder.push_bind(id);
        builder.push(QUIZ_GROUP_BY);

        let row: Option<QuizRow> = builder.build_query_as().fetch_optional(&self.pool).await?;
        Ok(row.map(QuizRow::into_quiz))
    }

    async fn find_quizzes_by_course(&self, course_id: i64) -> Result<Vec<QuizWithOptions>, AppError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(QUIZ_SELECT);
        builder.push(" WHERE q.course_id = ");
        builder.push_bind(course_id);
        builder.push(QUIZ_GROUP_BY);

        let rows: Vec<QuizRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(QuizRow::into_quiz).collect())
    }

    async fn find_quizzes_by_ids(&self, ids: &[i64]) -> Result<Vec<QuizWithOptions>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(QUIZ_SELECT);
        builder.push(" WHERE q.id = ANY(");
        builder.push_bind(ids.to_vec());
        builder.push(")");
        builder.push(QUIZ_GROUP_BY);

        let rows: Vec<QuizRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(QuizRow::into_quiz).collect())
    }

    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<i64, AppError> {
        // Dropping `tx` on any early return rolls the whole insert back.
        let mut tx = self.pool.begin().await?;

        let quiz_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO quizzes (title, course_id, chapter, type, remark)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&req.title)
        .bind(req.course_id)
        .bind(&req.chapter)
        .bind(req.quiz_type)
        .bind(&req.remark)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_write_error(e, "Failed to create quiz"))?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO answer_options (quiz_id, content, is_correct) ");
        builder.push_values(&req.options, |mut b, option| {
            b.push_bind(quiz_id)
                .push_bind(&option.content)
                .push_bind(option.is_correct);
        });
        let inserted = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "Failed to create answer options"))?;

        if inserted.rows_affected() == 0 {
            return Err(AppError::BadRequest("A quiz needs at least one answer option".to_string()));
        }

        tx.commit().await?;
        tracing::info!("Created quiz {} with {} options", quiz_id, req.options.len());
        Ok(quiz_id)
    }

    async fn update_quiz(&self, id: i64, req: &UpdateQuizRequest) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let current_type =
            sqlx::query_scalar::<_, QuizType>("SELECT type FROM quizzes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppError::NotFound("Quiz not found".to_string()))?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("UPDATE quizzes SET updated_at = NOW()");
        if let Some(title) = &req.title {
            builder.push(", title = ");
            builder.push_bind(title);
        }
        if let Some(course_id) = req.course_id {
            builder.push(", course_id = ");
            builder.push_bind(course_id);
        }
        if let Some(quiz_type) = req.quiz_type {
            builder.push(", type = ");
            builder.push_bind(quiz_type);
        }
        if let Some(chapter) = &req.chapter {
            builder.push(", chapter = ");
            builder.push_bind(chapter);
        }
        if let Some(remark) = &req.remark {
            builder.push(", remark = ");
            builder.push_bind(remark);
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| map_write_error(e, "Failed to update quiz"))?;

        for option in req.options.iter().flatten() {
            match option.id {
                Some(option_id) => {
                    let result = sqlx::query(
                        r#"
                        UPDATE answer_options
                        SET content = $1, is_correct = $2, updated_at = NOW()
                        WHERE id = $3 AND quiz_id = $4
                        "#,
                    )
                    .bind(&option.content)
                    .bind(option.is_correct)
                    .bind(option_id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;

                    if result.rows_affected() == 0 {
                        return Err(AppError::NotFound(format!(
                            "Answer option {} does not belong to quiz {}",
                            option_id, id
                        )));
                    }
                }
                None => {
                    sqlx::query(
                        "INSERT INTO answer_options (quiz_id, content, is_correct) VALUES ($1, $2, $3)",
                    )
                    .bind(id)
                    .bind(&option.content)
                    .bind(option.is_correct)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        let flags =
            sqlx::query_scalar::<_, bool>("SELECT is_correct FROM answer_options WHERE quiz_id = $1 ORDER BY id")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
        check_correct_options(req.quiz_type.unwrap_or(current_type), &flags)
            .map_err(AppError::BadRequest)?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_quiz(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, "Failed to delete quiz"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    async fn insert_test_record(&self, record: &NewTestRecord) -> Result<i64, AppError> {
        // A single INSERT, so the parallel lists and the ratio land together or not at all.
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO test_records
            (user_id, title, quiz_ids, answer_options_ids, answered_ids, correct_ratio)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(record.user_id)
        .bind(&record.title)
        .bind(&record.quiz_ids)
        .bind(Json(&record.answer_options_ids))
        .bind(Json(&record.answered_ids))
        .bind(Json(record.correct_ratio))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to insert test record"))?;

        Ok(id)
    }

    async fn get_test_record(&self, id: i64) -> Result<Option<TestRecord>, AppError> {
        let record = sqlx::query_as::<_, TestRecord>(&format!(
            "SELECT {} FROM test_records WHERE id = $1",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list_test_records(
        &self,
        user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<Page<TestRecordSummary>, AppError> {
        let pattern = params.keyword().map(like_pattern);

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM test_records
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
              AND ($2::TEXT IS NULL OR title ILIKE $2)
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, TestRecordSummary>(
            r#"
            SELECT r.id, r.user_id, u.username, r.title, r.correct_ratio, r.created_at
            FROM test_records r
            LEFT JOIN users u ON u.id = r.user_id
            WHERE ($1::BIGINT IS NULL OR r.user_id = $1)
              AND ($2::TEXT IS NULL OR r.title ILIKE $2)
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page { rows, count })
    }
}

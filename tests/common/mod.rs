// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use quizdeck::{
    config::Config,
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
        user::{ROLE_ADMIN, ROLE_USER, User},
    },
    repository::Repository,
    routes,
    services::category::descendant_ids,
    state::AppState,
    utils::{hash::hash_password, jwt::sign_jwt},
};
use sqlx::types::Json;

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

#[derive(Default)]
struct Store {
    next_id: i64,
    users: Vec<User>,
    categories: Vec<Category>,
    courses: Vec<Course>,
    quizzes: Vec<Quiz>,
    options: Vec<AnswerOption>,
    records: Vec<TestRecord>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn quiz_with_options(&self, quiz: &Quiz) -> QuizWithOptions {
        let mut answer_options: Vec<AnswerOption> = self
            .options
            .iter()
            .filter(|o| o.quiz_id == quiz.id)
            .cloned()
            .collect();
        answer_options.sort_by_key(|o| o.id);
        QuizWithOptions {
            quiz: quiz.clone(),
            answer_options,
        }
    }

    fn remove_quizzes(&mut self, ids: &[i64]) {
        self.quizzes.retain(|q| !ids.contains(&q.id));
        self.options.retain(|o| !ids.contains(&o.quiz_id));
    }
}

fn page<T: Clone>(rows: Vec<T>, params: &ListParams) -> Page<T> {
    let count = rows.len() as i64;
    let rows = rows
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit() as usize)
        .collect();
    Page { rows, count }
}

fn matches_keyword(text: &str, params: &ListParams) -> bool {
    params
        .keyword()
        .is_none_or(|k| text.to_lowercase().contains(&k.to_lowercase()))
}

/// In-process stand-in for Postgres, with the same cascade and rollback rules.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    store: Arc<Mutex<Store>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.store.lock().unwrap().records.len()
    }

    pub fn user_id(&self, username: &str) -> Option<i64> {
        let store = self.store.lock().unwrap();
        store.users.iter().find(|u| u.username == username).map(|u| u.id)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.users.iter().find(|u| u.username == username).cloned())
    }

    async fn create_user(&self, username: &str, password_hash: &str, role: &str) -> Result<User, AppError> {
        let mut store = self.store.lock().unwrap();
        if store.users.iter().any(|u| u.username == username) {
            return Err(AppError::Conflict(format!("Username '{}' already exists", username)));
        }
        let user = User {
            id: store.next_id(),
            username: username.to_string(),
            password: password_hash.to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        };
        store.users.push(user.clone());
        Ok(user)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        Ok(self.store.lock().unwrap().categories.clone())
    }

    async fn create_category(&self, req: &CreateCategoryRequest) -> Result<i64, AppError> {
        let mut store = self.store.lock().unwrap();
        if let Some(parent_id) = req.parent_id {
            if !store.categories.iter().any(|c| c.id == parent_id) {
                return Err(AppError::BadRequest("Failed to create category: referenced row does not exist".to_string()));
            }
        }
        let id = store.next_id();
        store.categories.push(Category {
            id,
            name: req.name.clone(),
            parent_id: req.parent_id,
            remark: req.remark.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_category(&self, id: i64, req: &UpdateCategoryRequest) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        if let Some(parent_id) = req.parent_id {
            if !store.categories.iter().any(|c| c.id == parent_id) {
                return Err(AppError::BadRequest("Failed to update category: referenced row does not exist".to_string()));
            }
        }
        let category = store
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound("Category not found".to_string()))?;
        category.name = req.name.clone();
        category.parent_id = req.parent_id;
        category.remark = req.remark.clone();
        category.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_category(&self, id: i64) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        if !store.categories.iter().any(|c| c.id == id) {
            return Err(AppError::NotFound("Category not found".to_string()));
        }
        let mut removed = descendant_ids(&store.categories, id);
        removed.push(id);
        store.categories.retain(|c| !removed.contains(&c.id));
        for course in store.courses.iter_mut() {
            if course.category_id.is_some_and(|c| removed.contains(&c)) {
                course.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_courses(&self, params: &ListParams) -> Result<Page<Course>, AppError> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<Course> = store
            .courses
            .iter()
            .filter(|c| matches_keyword(&c.title, params))
            .cloned()
            .collect();
        rows.sort_by_key(|c| std::cmp::Reverse(c.id));
        Ok(page(rows, params))
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn create_course(&self, req: &CourseRequest) -> Result<i64, AppError> {
        let mut store = self.store.lock().unwrap();
        if let Some(category_id) = req.category_id {
            if !store.categories.iter().any(|c| c.id == category_id) {
                return Err(AppError::BadRequest("Failed to create course: referenced row does not exist".to_string()));
            }
        }
        let id = store.next_id();
        store.courses.push(Course {
            id,
            title: req.title.clone(),
            description: req.description.clone(),
            cover: req.cover.clone(),
            category_id: req.category_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Ok(id)
    }

    async fn update_course(&self, id: i64, req: &CourseRequest) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        let course = store
            .courses
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(AppError::NotFound("Course not found".to_string()))?;
        course.title = req.title.clone();
        course.description = req.description.clone();
        course.cover = req.cover.clone();
        course.category_id = req.category_id;
        course.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_course(&self, id: i64) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        if !store.courses.iter().any(|c| c.id == id) {
            return Err(AppError::NotFound("Course not found".to_string()));
        }
        store.courses.retain(|c| c.id != id);
        let quiz_ids: Vec<i64> = store
            .quizzes
            .iter()
            .filter(|q| q.course_id == id)
            .map(|q| q.id)
            .collect();
        store.remove_quizzes(&quiz_ids);
        Ok(())
    }

    async fn list_quizzes(&self, params: &ListParams) -> Result<Page<QuizListItem>, AppError> {
        let store = self.store.lock().unwrap();
        let rows: Vec<QuizListItem> = store
            .quizzes
            .iter()
            .filter(|q| matches_keyword(&q.title, params))
            .map(|q| QuizListItem {
                quiz: store.quiz_with_options(q),
                course_title: store
                    .courses
                    .iter()
                    .find(|c| c.id == q.course_id)
                    .map(|c| c.title.clone()),
            })
            .collect();
        Ok(page(rows, params))
    }

    async fn get_quiz(&self, id: i64) -> Result<Option<QuizWithOptions>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .quizzes
            .iter()
            .find(|q| q.id == id)
            .map(|q| store.quiz_with_options(q)))
    }

    async fn find_quizzes_by_course(&self, course_id: i64) -> Result<Vec<QuizWithOptions>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .quizzes
            .iter()
            .filter(|q| q.course_id == course_id)
            .map(|q| store.quiz_with_options(q))
            .collect())
    }

    async fn find_quizzes_by_ids(&self, ids: &[i64]) -> Result<Vec<QuizWithOptions>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store
            .quizzes
            .iter()
            .filter(|q| ids.contains(&q.id))
            .map(|q| store.quiz_with_options(q))
            .collect())
    }

    async fn create_quiz(&self, req: &CreateQuizRequest) -> Result<i64, AppError> {
        let mut store = self.store.lock().unwrap();
        if !store.courses.iter().any(|c| c.id == req.course_id) {
            return Err(AppError::BadRequest("Failed to create quiz: referenced row does not exist".to_string()));
        }
        let quiz_id = store.next_id();
        store.quizzes.push(Quiz {
            id: quiz_id,
            title: req.title.clone(),
            course_id: req.course_id,
            chapter: req.chapter.clone(),
            quiz_type: req.quiz_type,
            remark: req.remark.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        for option in &req.options {
            let id = store.next_id();
            store.options.push(AnswerOption {
                id,
                quiz_id,
                content: option.content.clone(),
                is_correct: option.is_correct,
            });
        }
        Ok(quiz_id)
    }

    async fn update_quiz(&self, id: i64, req: &UpdateQuizRequest) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        // Work on a copy so a failed check leaves the store untouched.
        let mut quizzes = store.quizzes.clone();
        let mut options = store.options.clone();
        let mut next_id = store.next_id;

        let quiz = quizzes
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        if let Some(course_id) = req.course_id {
            if !store.courses.iter().any(|c| c.id == course_id) {
                return Err(AppError::BadRequest("Failed to update quiz: referenced row does not exist".to_string()));
            }
            quiz.course_id = course_id;
        }
        if let Some(title) = &req.title {
            quiz.title = title.clone();
        }
        if let Some(quiz_type) = req.quiz_type {
            quiz.quiz_type = quiz_type;
        }
        if let Some(chapter) = &req.chapter {
            quiz.chapter = chapter.clone();
        }
        if let Some(remark) = &req.remark {
            quiz.remark = remark.clone();
        }
        quiz.updated_at = Utc::now();
        let quiz_type: QuizType = quiz.quiz_type;

        for option in req.options.iter().flatten() {
            match option.id {
                Some(option_id) => {
                    let existing = options
                        .iter_mut()
                        .find(|o| o.id == option_id && o.quiz_id == id)
                        .ok_or(AppError::NotFound(format!(
                            "Answer option {} does not belong to quiz {}",
                            option_id, id
                        )))?;
                    existing.content = option.content.clone();
                    existing.is_correct = option.is_correct;
                }
                None => {
                    next_id += 1;
                    options.push(AnswerOption {
                        id: next_id,
                        quiz_id: id,
                        content: option.content.clone(),
                        is_correct: option.is_correct,
                    });
                }
            }
        }

        let flags: Vec<bool> = options
            .iter()
            .filter(|o| o.quiz_id == id)
            .map(|o| o.is_correct)
            .collect();
        check_correct_options(quiz_type, &flags).map_err(AppError::BadRequest)?;

        store.quizzes = quizzes;
        store.options = options;
        store.next_id = next_id;
        Ok(())
    }

    async fn delete_quiz(&self, id: i64) -> Result<(), AppError> {
        let mut store = self.store.lock().unwrap();
        if !store.quizzes.iter().any(|q| q.id == id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        store.remove_quizzes(&[id]);
        Ok(())
    }

    async fn insert_test_record(&self, record: &NewTestRecord) -> Result<i64, AppError> {
        let mut store = self.store.lock().unwrap();
        if !store.users.iter().any(|u| u.id == record.user_id) {
            return Err(AppError::BadRequest("Failed to insert test record: referenced row does not exist".to_string()));
        }
        let id = store.next_id();
        store.records.push(TestRecord {
            id,
            user_id: record.user_id,
            title: record.title.clone(),
            quiz_ids: record.quiz_ids.clone(),
            answer_options_ids: Json(record.answer_options_ids.clone()),
            answered_ids: Json(record.answered_ids.clone()),
            correct_ratio: Json(record.correct_ratio),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_test_record(&self, id: i64) -> Result<Option<TestRecord>, AppError> {
        let store = self.store.lock().unwrap();
        Ok(store.records.iter().find(|r| r.id == id).cloned())
    }

    async fn list_test_records(
        &self,
        user_id: Option<i64>,
        params: &ListParams,
    ) -> Result<Page<TestRecordSummary>, AppError> {
        let store = self.store.lock().unwrap();
        let mut rows: Vec<TestRecordSummary> = store
            .records
            .iter()
            .filter(|r| user_id.is_none_or(|u| r.user_id == u))
            .filter(|r| matches_keyword(&r.title, params))
            .map(|r| TestRecordSummary {
                id: r.id,
                user_id: r.user_id,
                username: store
                    .users
                    .iter()
                    .find(|u| u.id == r.user_id)
                    .map(|u| u.username.clone()),
                title: r.title.clone(),
                correct_ratio: Json(r.correct_ratio.0),
                created_at: r.created_at,
            })
            .collect();
        rows.sort_by_key(|r| std::cmp::Reverse(r.id));
        Ok(page(rows, params))
    }
}

pub struct TestApp {
    pub address: String,
    pub repo: MemoryRepository,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Creates a user straight in the store and returns a bearer token for it.
    pub async fn token_for(&self, role: &str) -> (i64, String) {
        let username = format!("u_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let hashed = hash_password("password123").unwrap();
        let user = self.repo.create_user(&username, &hashed, role).await.unwrap();
        let token = sign_jwt(user.id, &user.role, JWT_SECRET, 600).unwrap();
        (user.id, token)
    }

    pub async fn admin_token(&self) -> String {
        self.token_for(ROLE_ADMIN).await.1
    }

    pub async fn user_token(&self) -> (i64, String) {
        self.token_for(ROLE_USER).await
    }
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    let repo = MemoryRepository::new();

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        server_port: 0,
        admin_username: None,
        admin_password: None,
    };

    let state = AppState {
        repo: Arc::new(repo.clone()),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        repo,
        client: reqwest::Client::new(),
    }
}

/// Creates a course through the admin API.
pub async fn create_course(app: &TestApp, admin_token: &str, title: &str) -> i64 {
    let response = app
        .client
        .post(app.url("/api/admin/courses"))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({ "title": title }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    body["id"].as_i64().unwrap()
}

/// Creates a quiz through the admin API and returns its id with its option ids in catalog order.
pub async fn create_quiz(
    app: &TestApp,
    admin_token: &str,
    course_id: i64,
    quiz_type: &str,
    title: &str,
    chapter: Option<&str>,
    options: &[(&str, bool)],
) -> (i64, Vec<i64>) {
    let options: Vec<serde_json::Value> = options
        .iter()
        .map(|(content, is_correct)| serde_json::json!({ "content": content, "is_correct": is_correct }))
        .collect();

    let response = app
        .client
        .post(app.url("/api/admin/quizzes"))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({
            "title": title,
            "course_id": course_id,
            "type": quiz_type,
            "chapter": chapter,
            "options": options,
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 201);
    let body: serde_json::Value = response.json().await.unwrap();
    let quiz_id = body["id"].as_i64().unwrap();

    let quiz = app.repo.get_quiz(quiz_id).await.unwrap().unwrap();
    (quiz_id, quiz.answer_options.iter().map(|o| o.id).collect())
}

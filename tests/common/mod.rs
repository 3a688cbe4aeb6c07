#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use homework_tracker::db::{
    models::{Class, Homework, NewHomework, NewStudent, RosterStudent, Student, Teacher},
    CreateClassOutcome, Db,
};
use homework_tracker::{router, AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const CALLBACK_SECRET: &str = "test-callback-secret";

pub async fn create_test_db() -> Db {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "homework_tracker_test_{}_{}.db",
        std::process::id(),
        id
    ));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("sqlite://{}", path.display());
    Db::new(&url).await.expect("failed to create test database")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        auth_callback_secret: Some(CALLBACK_SECRET.to_string()),
        ..AppConfig::default()
    }
}

pub fn app(db: Db) -> Router {
    router(AppState::new(db, test_config()))
}

/// A teacher with an open session.
pub async fn signed_in_teacher(db: &Db, email: &str) -> (Teacher, String) {
    let teacher = db.ensure_teacher(email, "Teacher").await.expect("create teacher");
    let token = db
        .create_teacher_session(teacher.id)
        .await
        .expect("create session");
    (teacher, token)
}

/// Two questions worth 2 and 3 points.
pub fn two_question_content() -> Value {
    json!({
        "metadata": { "title": "Fractions" },
        "questions": [
            {
                "question": "1/2 + 1/4?",
                "options": ["3/4", "2/6"],
                "correct_answer": "3/4",
                "correct_option_index": 0,
                "explanation": "common denominator",
                "score": 2
            },
            {
                "question": "2/3 of 9?",
                "correct_answer": 6,
                "explanation": "multiply",
                "score": 3
            }
        ]
    })
}

pub async fn seed_homework(db: &Db, teacher: &Teacher, name: &str) -> Homework {
    db.create_homework(
        NewHomework {
            name: name.to_string(),
            subject: "Math".to_string(),
            bloom_taxonomy: vec!["remember".to_string(), "apply".to_string()],
            exercise_type: "multiple_choice".to_string(),
            content: two_question_content(),
        },
        &teacher.email,
    )
    .await
    .expect("create homework")
}

pub async fn seed_student(db: &Db, teacher: &Teacher, name: &str, email: &str) -> Student {
    db.create_student(
        &NewStudent {
            full_name: name.to_string(),
            email: email.to_string(),
            username: String::new(),
            gender: String::new(),
            age: 11,
        },
        teacher.id,
    )
    .await
    .expect("create student")
}

/// A class whose roster holds `students`.
pub async fn seed_class(db: &Db, teacher: &Teacher, name: &str, students: &[Student]) -> Class {
    let CreateClassOutcome::Created(class) = db
        .create_class(name, None, teacher.id)
        .await
        .expect("create class")
    else {
        panic!("class name {name} already taken");
    };

    for student in students {
        let added = db
            .add_student_to_class(
                class.id,
                RosterStudent {
                    id: student.id,
                    full_name: student.full_name.clone(),
                    email: student.email.clone(),
                },
                teacher.id,
            )
            .await
            .expect("add student");
        assert!(added);
    }

    db.find_owned_class(class.id, teacher.id)
        .await
        .expect("load class")
        .expect("class exists")
}

/// Send a request with a bearer token and return the status and JSON body.
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(body) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let resp = app
        .clone()
        .oneshot(req.body(body).expect("request build should succeed"))
        .await
        .expect("router should respond");

    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body is JSON")
    };
    (status, json)
}

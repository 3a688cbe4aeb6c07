mod common;

use axum::http::{Method, StatusCode};
use common::{app, call, create_test_db, seed_homework, signed_in_teacher, two_question_content};
use homework_tracker::names;
use serde_json::json;

#[tokio::test]
async fn class_roster_is_built_through_the_api() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);
    let token = Some(token.as_str());

    let (status, body) = call(
        &app,
        Method::POST,
        names::CLASSES_URL,
        token,
        Some(json!({ "name": "  5A  ", "banner_path": "1/1700000000.png" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "5A");
    let class_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        names::STUDENTS_URL,
        token,
        Some(json!({ "full_name": "Sam", "email": "Sam@School.test", "age": 11 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "sam@school.test");
    let student_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::POST,
        &names::class_students_url(class_id),
        token,
        Some(json!({ "student_id": student_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["roster"][0]["id"], student_id);
    assert_eq!(body["data"]["roster"][0]["full_name"], "Sam");

    let (status, _) = call(
        &app,
        Method::POST,
        &names::class_students_url(class_id),
        token,
        Some(json!({ "student_id": student_id + 50 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_class_name_is_a_conflict() {
    let db = create_test_db().await;
    let (_, ana) = signed_in_teacher(&db, "ana@school.test").await;
    let (_, bo) = signed_in_teacher(&db, "bo@school.test").await;
    let app = app(db);

    let (status, _) = call(&app, Method::POST, names::CLASSES_URL, Some(&ana), Some(json!({ "name": "5A" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::POST, names::CLASSES_URL, Some(&bo), Some(json!({ "name": "5A" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn empty_names_are_rejected() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    let (status, body) = call(&app, Method::POST, names::CLASSES_URL, Some(&token), Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INPUT_ERROR");
}

#[tokio::test]
async fn homework_is_created_with_derived_score() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    let (status, body) = call(
        &app,
        Method::POST,
        names::HOMEWORK_URL,
        Some(&token),
        Some(json!({
            "name": "Fractions",
            "subject": "Math",
            "bloom_taxonomy": ["remember", "apply"],
            "exercise_type": "multiple_choice",
            "content": two_question_content()
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 5);
    assert_eq!(body["data"]["bloom_taxonomy"], "remember,apply");

    let (_, body) = call(&app, Method::GET, names::HOMEWORK_URL, Some(&token), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn homework_whose_total_overflows_is_rejected() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    let (status, body) = call(
        &app,
        Method::POST,
        names::HOMEWORK_URL,
        Some(&token),
        Some(json!({
            "name": "Huge",
            "subject": "Math",
            "content": { "questions": [
                { "question": "a", "score": i64::MAX },
                { "question": "b", "score": 1 }
            ] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"]["code"], "INPUT_ERROR");

    let (_, body) = call(&app, Method::GET, names::HOMEWORK_URL, Some(&token), None).await;
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn numeric_options_and_lenient_scores_are_accepted() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    let (status, body) = call(
        &app,
        Method::POST,
        names::HOMEWORK_URL,
        Some(&token),
        Some(json!({
            "name": "Times tables",
            "subject": "Math",
            "content": { "questions": [
                { "question": "3 * 4?", "options": [12, 15, 18], "correct_option_index": "0", "score": 2.0 },
                { "question": "2 * 5?", "options": [10, 7], "score": "3" }
            ] }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["score"], 5);
    assert_eq!(body["data"]["content"]["questions"][0]["options"], json!([12, 15, 18]));
}

#[tokio::test]
async fn malformed_content_is_rejected() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    for content in [
        json!({ "metadata": {} }),
        json!({ "questions": [{ "question": "q", "score": 0 }] }),
    ] {
        let (status, _) = call(
            &app,
            Method::POST,
            names::HOMEWORK_URL,
            Some(&token),
            Some(json!({ "name": "Bad", "subject": "Math", "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn question_score_update_recomputes_total() {
    let db = create_test_db().await;
    let (teacher, token) = signed_in_teacher(&db, "ana@school.test").await;
    let homework = seed_homework(&db, &teacher, "Fractions").await;
    let app = app(db.clone());

    let (status, body) = call(
        &app,
        Method::PATCH,
        &format!("/homework/{}/questions/1/score", homework.id),
        Some(&token),
        Some(json!({ "score": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 12);

    let stored = db
        .find_owned_homework(homework.id, &teacher.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, 12);
    assert_eq!(stored.content["questions"][1]["score"], 10);

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/homework/{}/questions/9/score", homework.id),
        Some(&token),
        Some(json!({ "score": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/homework/{}/questions/0/score", homework.id),
        Some(&token),
        Some(json!({ "score": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(
        &app,
        Method::PATCH,
        &format!("/homework/{}/questions/0/score", homework.id),
        Some(&token),
        Some(json!({ "score": i64::MAX })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let stored = db
        .find_owned_homework(homework.id, &teacher.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.score, 12);
}

#[tokio::test]
async fn content_replacement_is_owner_only() {
    let db = create_test_db().await;
    let (teacher, _) = signed_in_teacher(&db, "ana@school.test").await;
    let (_, other) = signed_in_teacher(&db, "bo@school.test").await;
    let homework = seed_homework(&db, &teacher, "Fractions").await;
    let app = app(db);

    let (status, _) = call(
        &app,
        Method::PUT,
        &format!("/homework/{}/content", homework.id),
        Some(&other),
        Some(json!({ "content": { "questions": [{ "question": "x", "score": 1 }] } })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn generation_without_api_key_stores_placeholders() {
    let db = create_test_db().await;
    let (_, token) = signed_in_teacher(&db, "ana@school.test").await;
    let app = app(db);

    let (status, body) = call(
        &app,
        Method::POST,
        names::GENERATE_HOMEWORK_URL,
        Some(&token),
        Some(json!({
            "subject": "Math",
            "topic": "Fractions",
            "bloom_levels": ["apply"],
            "question_count": 50
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["is_placeholder"], true);
    assert_eq!(body["data"]["homework"]["name"], "Math: Fractions");
    assert_eq!(body["data"]["homework"]["score"], 20);
    assert_eq!(
        body["data"]["homework"]["content"]["questions"].as_array().unwrap().len(),
        20
    );
}

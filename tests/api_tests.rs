// tests/api_tests.rs

use std::sync::Arc;
use std::time::Duration;

use classroom_quiz::{
    config::{Config, MAX_UPLOAD_BYTES},
    routes,
    state::AppState,
    store::{MemoryStore, Store},
    utils::hash::hash_password,
};
use reqwest::{Client, StatusCode, multipart, redirect};
use serde_json::{Value, json};
use tempfile::TempDir;

struct TestApp {
    address: String,
    store: Arc<dyn Store>,
    client: Client,
    _upload_dir: TempDir,
    export_dir: TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Each app gets its own in-memory store and scratch directories.
async fn spawn_app() -> TestApp {
    let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");
    let export_dir = tempfile::tempdir().expect("Failed to create export dir");

    let config = Config {
        database_url: None,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        upload_dir: upload_dir.path().to_path_buf(),
        export_dir: export_dir.path().to_path_buf(),
        max_upload_bytes: MAX_UPLOAD_BYTES,
        export_utc_offset_hours: 7,
        teacher_username: None,
        teacher_password: None,
        teacher_full_name: None,
    };

    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let app = routes::create_router(AppState::new(store.clone(), config));

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: Client::builder()
            .redirect(redirect::Policy::none())
            .build()
            .unwrap(),
        _upload_dir: upload_dir,
        export_dir,
    }
}

async fn register_and_login_teacher(app: &TestApp) -> String {
    let response = app
        .client
        .post(app.url("/api/teacher/register"))
        .json(&json!({
            "username": "teacher",
            "password": "secret123",
            "fullName": "Nguyen Thi Lan"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    login_teacher(app, "teacher", "secret123").await
}

async fn login_teacher(app: &TestApp, username: &str, password: &str) -> String {
    let response = app
        .client
        .post(app.url("/api/teacher/login"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn register_student(app: &TestApp, name: &str, class_name: &str) -> String {
    let response = app
        .client
        .post(app.url("/api/student/register"))
        .json(&json!({ "name": name, "className": class_name }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn sample_quiz() -> Value {
    json!({
        "title": "Fractions",
        "description": "Week 3",
        "questions": [
            {
                "type": "multiple_choice",
                "text": "1/2 + 1/2 = ?",
                "options": ["0", "1", "2"],
                "correctOptionIndex": 1
            },
            {
                "type": "short_answer",
                "text": "Capital of France?",
                "shortAnswer": "Paris"
            },
            {
                "type": "matching",
                "text": "Match the halves",
                "matchingPairs": [
                    { "left": "1/2", "right": "0.5" },
                    { "left": "1/4", "right": "0.25" }
                ]
            }
        ]
    })
}

async fn create_quiz(app: &TestApp, token: &str) -> String {
    let response = app
        .client
        .post(app.url("/api/teacher/quizzes"))
        .bearer_auth(token)
        .json(&sample_quiz())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    body["id"].as_str().unwrap().to_string()
}

async fn submit(app: &TestApp, token: &str, quiz_id: &str, answers: &[(&str, &str)]) -> reqwest::Response {
    app.client
        .post(app.url(&format!("/api/student/quizzes/{}/submit", quiz_id)))
        .bearer_auth(token)
        .form(answers)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn second_teacher_registration_conflicts() {
    let app = spawn_app().await;
    register_and_login_teacher(&app).await;

    let response = app
        .client
        .post(app.url("/api/teacher/register"))
        .json(&json!({
            "username": "another",
            "password": "secret123",
            "fullName": "Someone Else"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_rejects_wrong_password_and_unknown_user() {
    let app = spawn_app().await;
    register_and_login_teacher(&app).await;

    for (username, password) in [("teacher", "wrong"), ("nobody", "secret123")] {
        let response = app
            .client
            .post(app.url("/api/teacher/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username that is too short
    let response = app
        .client
        .post(app.url("/api/teacher/register"))
        .json(&json!({ "username": "yo", "password": "secret123", "fullName": "A" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Blank student class
    let response = app
        .client
        .post(app.url("/api/student/register"))
        .json(&json!({ "name": "An", "className": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_questions_are_rejected() {
    let app = spawn_app().await;
    let token = register_and_login_teacher(&app).await;

    let response = app
        .client
        .post(app.url("/api/teacher/quizzes"))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Broken",
            "questions": [{ "text": "Pick", "options": ["a"], "correctOptionIndex": 3 }]
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("out of range"));
}

#[tokio::test]
async fn quiz_crud_flow() {
    let app = spawn_app().await;
    let token = register_and_login_teacher(&app).await;
    let quiz_id = create_quiz(&app, &token).await;

    // Listed for the owner and publicly while active
    let own: Value = app
        .client
        .get(app.url("/api/teacher/quizzes"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["questions"][0]["correctOptionIndex"], 1);

    let active: Value = app
        .client
        .get(app.url("/api/quizzes/active"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active[0]["id"], quiz_id.as_str());

    // Public view carries no answer keys
    let public: Value = app
        .client
        .get(app.url(&format!("/api/quizzes/{}", quiz_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let public_text = public.to_string();
    assert!(!public_text.contains("correctOptionIndex"));
    assert!(!public_text.contains("Paris"));

    // Update replaces the content
    let mut updated = sample_quiz();
    updated["title"] = json!("Fractions v2");
    let response = app
        .client
        .put(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&token)
        .json(&updated)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fetched: Value = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["title"], "Fractions v2");

    // Deactivated quizzes disappear from the public surface
    let toggled: Value = app
        .client
        .post(app.url(&format!("/api/teacher/quizzes/{}/toggle-status", quiz_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(toggled["isActive"], false);

    let response = app
        .client
        .get(app.url(&format!("/api/quizzes/{}", quiz_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Delete, then it is gone
    let response = app
        .client
        .delete(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn teachers_cannot_touch_each_others_quizzes() {
    let app = spawn_app().await;
    let owner = register_and_login_teacher(&app).await;
    let quiz_id = create_quiz(&app, &owner).await;

    let hashed = hash_password("other123").unwrap();
    app.store
        .create_teacher("other", &hashed, "Other Teacher")
        .await
        .unwrap();
    let intruder = login_teacher(&app, "other", "other123").await;

    let paths = [
        format!("/api/teacher/quizzes/{}", quiz_id),
        format!("/api/teacher/quizzes/{}/stats", quiz_id),
        format!("/api/teacher/quizzes/{}/results", quiz_id),
        format!("/api/teacher/quizzes/{}/export", quiz_id),
    ];
    for path in &paths {
        let response = app.client.get(app.url(path)).bearer_auth(&intruder).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }

    let response = app
        .client
        .delete(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Still there for the owner
    let response = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}", quiz_id)))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_ids_and_missing_tokens() {
    let app = spawn_app().await;
    let token = register_and_login_teacher(&app).await;

    for id in ["undefined", "123", "zzzzzzzzzzzzzzzzzzzzzzzz"] {
        let response = app
            .client
            .get(app.url(&format!("/api/teacher/quizzes/{}", id)))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", id);
    }

    let response = app.client.get(app.url("/api/teacher/quizzes")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/api/student/quizzes"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn student_takes_quiz_exactly_once() {
    let app = spawn_app().await;
    let teacher = register_and_login_teacher(&app).await;
    let quiz_id = create_quiz(&app, &teacher).await;
    let student = register_student(&app, "Tran Van An", "3B").await;
    let result_path = format!("/api/student/quizzes/{}/result", quiz_id);

    // No attempt yet: the result page sends the student to the quiz
    let response = app.client.get(app.url(&result_path)).bearer_auth(&student).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = submit(
        &app,
        &student,
        &quiz_id,
        &[
            ("question_0", "1"),
            ("question_1", "  paris "),
            ("question_2", r#"{"0":"0","1":"0"}"#),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let attempt: Value = response.json().await.unwrap();
    assert_eq!(attempt["totalCorrect"], 2);
    assert_eq!(attempt["totalQuestions"], 3);
    assert_eq!(attempt["percentageScore"], 67);
    assert_eq!(attempt["answers"][2]["correctPairs"], 1);
    assert_eq!(attempt["answers"][2]["percentageCorrect"], 0.5);

    // Second submission is redirected and does not overwrite the first
    let response = submit(&app, &student, &quiz_id, &[("question_0", "0")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], result_path.as_str());

    let response = app
        .client
        .get(app.url(&format!("/api/student/quizzes/{}", quiz_id)))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let result: Value = app
        .client
        .get(app.url(&result_path))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["attempt"]["totalCorrect"], 2);
    assert_eq!(result["studentClass"], "3B");

    let listing: Value = app
        .client
        .get(app.url("/api/student/quizzes"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["attemptedQuizIds"][0], quiz_id.as_str());
    assert_eq!(listing["studentName"], "Tran Van An");

    // Registering again resumes the same student
    let again = register_student(&app, "Tran Van An", "3B").await;
    let response = submit(&app, &again, &quiz_id, &[("question_0", "1")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn stats_and_results_report() {
    let app = spawn_app().await;
    let teacher = register_and_login_teacher(&app).await;
    let quiz_id = create_quiz(&app, &teacher).await;

    let an = register_student(&app, "An", "3B").await;
    let binh = register_student(&app, "Binh", "4A").await;
    let all_right = [
        ("question_0", "1"),
        ("question_1", "Paris"),
        ("question_2", r#"{"0":"0","1":"1"}"#),
    ];
    assert_eq!(submit(&app, &an, &quiz_id, &all_right).await.status(), StatusCode::CREATED);
    assert_eq!(
        submit(&app, &binh, &quiz_id, &[("question_0", "2")]).await.status(),
        StatusCode::CREATED
    );

    let stats: Value = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}/stats", quiz_id)))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["totalAttempts"], 2);
    assert_eq!(stats["averageScore"], 1.5);
    assert_eq!(stats["questionStats"][0]["correct"], 1);
    assert_eq!(stats["questionStats"][0]["percentageCorrect"], 50.0);

    let results: Value = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}/results?class=4A", quiz_id)))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let report = &results["report"];
    assert_eq!(report["summary"]["totalAttempts"], 2);
    assert_eq!(report["summary"]["highestScore"], 100);
    assert_eq!(report["summary"]["lowestScore"], 0);
    assert_eq!(report["results"].as_array().unwrap().len(), 1);
    assert_eq!(report["results"][0]["studentName"], "Binh");
    assert_eq!(report["classNames"], json!(["3B", "4A"]));
    assert_eq!(report["classes"].as_array().unwrap().len(), 55);
}

async fn wait_until_empty(dir: &std::path::Path) -> bool {
    for _ in 0..50 {
        if std::fs::read_dir(dir).unwrap().next().is_none() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn csv_export_streams_and_cleans_up() {
    let app = spawn_app().await;
    let teacher = register_and_login_teacher(&app).await;
    let quiz_id = create_quiz(&app, &teacher).await;

    let an = register_student(&app, "An, Tran", "3B").await;
    let binh = register_student(&app, "Binh", "4A").await;
    submit(&app, &an, &quiz_id, &[("question_0", "1"), ("question_1", "Paris")]).await;
    submit(&app, &binh, &quiz_id, &[("question_0", "0")]).await;

    let response = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}/export", quiz_id)))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/csv; charset=utf-8");
    let disposition = response.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"results-Fractions-"));

    let csv = response.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "No.,Full Name,Class,Score,Percentage,Correct,Wrong,Completed At");
    assert!(lines[1].starts_with("1,\"An, Tran\",3B,2/3,67%,2,1,"));
    assert!(lines[2].starts_with("2,Binh,4A,0/3,0%,0,3,"));
    assert!(wait_until_empty(app.export_dir.path()).await);

    let response = app
        .client
        .get(app.url(&format!("/api/teacher/quizzes/{}/export/4A", quiz_id)))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let csv = response.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "No.,Full Name,Score,Percentage,Correct,Wrong,Completed At");
    assert!(lines[1].starts_with("1,Binh,0/3,0%,0,3,"));
    assert!(wait_until_empty(app.export_dir.path()).await);
}

#[tokio::test]
async fn image_upload_accepts_images_only() {
    let app = spawn_app().await;
    let teacher = register_and_login_teacher(&app).await;

    let image = multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("diagram.png")
        .mime_str("image/png")
        .unwrap();
    let response = app
        .client
        .post(app.url("/api/teacher/upload-image"))
        .bearer_auth(&teacher)
        .multipart(multipart::Form::new().part("image", image))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    let image_path = body["imagePath"].as_str().unwrap().to_string();
    assert!(image_path.starts_with("/uploads/") && image_path.ends_with(".png"));

    // Served back as a static file
    let served = app.client.get(app.url(&image_path)).send().await.unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.bytes().await.unwrap().as_ref(), &[0x89, b'P', b'N', b'G']);

    let text = multipart::Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let response = app
        .client
        .post(app.url("/api/teacher/upload-image"))
        .bearer_auth(&teacher)
        .multipart(multipart::Form::new().part("image", text))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .client
        .post(app.url("/api/teacher/upload-image"))
        .bearer_auth(&teacher)
        .multipart(multipart::Form::new().text("caption", "no file"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

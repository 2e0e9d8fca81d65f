use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

#[tokio::test]
async fn submit_returns_success_for_a_valid_email() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let response = test_app.get_submit(Some("student@csie.cool")).await;

    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body, serde_json::json!({ "success": true, "error": "" }));
}

#[tokio::test]
async fn submit_persists_the_new_subscriber() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    test_app.submit(Some("student@csie.cool")).await;

    let (email, date): (String, String) = sqlx::query_as("SELECT email, date FROM EMAILS")
        .fetch_one(&test_app.db_pool)
        .await
        .expect("Failed to fetch saved subscriber.");

    assert_eq!(email, "student@csie.cool");
    assert!(chrono::DateTime::parse_from_rfc3339(&date).is_ok());
    assert!(date.ends_with('Z'));
}

#[tokio::test]
async fn submit_works_against_a_database_created_at_startup() {
    let test_app = TestApp::spawn_app_with_fresh_database().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    let response = test_app.submit(Some("student@csie.cool")).await;

    assert!(response.success);
    assert_eq!(test_app.stored_emails().await, vec!["student@csie.cool"]);
}

#[tokio::test]
async fn submit_sends_one_confirmation_email_to_the_subscriber() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    test_app.submit(Some("student@csie.cool")).await;

    let sent_emails = test_app.sent_emails().await;

    assert_eq!(sent_emails.len(), 1);
    assert_eq!(sent_emails[0]["to"], serde_json::json!(["student@csie.cool"]));
    assert_eq!(sent_emails[0]["from"]["email"], "camp@csie.cool");
    assert_eq!(sent_emails[0]["subject"], "師大資工營事前登錄成功！");
    assert_eq!(sent_emails[0]["content"]["template"], "simple");
    assert_eq!(sent_emails[0]["content"]["params"]["greeting"], "恭喜");
}

#[tokio::test]
async fn submit_rejects_missing_or_empty_email() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    // This is a common practice and it is called table-driven tests.
    let test_cases = vec![(None, "missing email parameter"), (Some(""), "empty email")];

    for (email, description) in test_cases {
        let response = test_app.submit(email).await;

        assert!(
            !response.success,
            "The API did not fail when the request had {}",
            description
        );
        assert_eq!(response.error, "請輸入電子郵件");
    }

    assert!(test_app.stored_emails().await.is_empty());
    assert!(test_app.sent_emails().await.is_empty());
}

#[tokio::test]
async fn submit_rejects_malformed_email() {
    let test_app = TestApp::spawn_app().await;
    let too_long = format!("{}@{}.com", "a".repeat(61), "b".repeat(63));
    let test_cases = vec![
        ("camp.csie.cool", "missing @"),
        ("@csie.cool", "missing local part"),
        ("student@", "missing domain"),
        (too_long.as_str(), "longer than 128 characters"),
    ];

    for (email, description) in test_cases {
        let response = test_app.submit(Some(email)).await;

        assert!(
            !response.success,
            "The API did not fail when the email was {}",
            description
        );
        assert_eq!(response.error, "電子郵件格式錯誤");
    }

    assert!(test_app.stored_emails().await.is_empty());
    assert!(test_app.sent_emails().await.is_empty());
}

#[tokio::test]
async fn submitting_the_same_email_twice_is_reported_as_already_subscribed() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let first = test_app.submit(Some("student@csie.cool")).await;
    let second = test_app.submit(Some("student@csie.cool")).await;

    assert!(first.success);
    assert!(!second.success);
    assert_eq!(second.error, "已經訂閱了");
    assert_eq!(test_app.stored_emails().await, vec!["student@csie.cool"]);
    assert_eq!(test_app.sent_emails().await.len(), 1);
}

#[tokio::test]
async fn submit_reports_an_unavailable_store() {
    let test_app = TestApp::spawn_app_without_store().await;

    Mock::given(path("/api/send"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.submit(Some("student@csie.cool")).await;

    assert!(!response.success);
    assert_eq!(response.error, "資料庫在鬧脾氣");
    assert!(test_app.stored_emails().await.is_empty());
}

#[tokio::test]
async fn submit_succeeds_even_if_the_confirmation_email_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/api/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.submit(Some("student@csie.cool")).await;

    assert!(response.success);
    assert_eq!(test_app.sent_emails().await.len(), 1);
    assert_eq!(test_app.stored_emails().await, vec!["student@csie.cool"]);
}

#[tokio::test]
async fn submit_answers_in_english_when_asked() {
    let test_app = TestApp::spawn_app().await;

    let response: camp_mailer::routes::SubmitResponse = test_app
        .get_submit_with_language(Some("not-an-email"), Some("en-US,en;q=0.9"))
        .await
        .json()
        .await
        .unwrap();

    assert!(!response.success);
    assert_eq!(response.error, "Invalid email format");
}

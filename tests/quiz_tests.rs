// tests/quiz_tests.rs

mod common;

use common::{TestApp, attempt_id, location, spawn_app};
use reqwest::Client;
use serde_json::{Value, json};

const TWO_QUESTIONS: &[&[(&str, bool)]] = &[
    &[("Paris", true), ("Rome", false), ("Oslo", false)],
    &[("4", true), ("5", false)],
];

async fn submit(app: &TestApp, client: &Client, quiz_id: i64, answers: Value) -> reqwest::Response {
    client
        .post(app.url(&format!("/quiz/{quiz_id}/")))
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .expect("Failed to submit quiz")
}

async fn result_page(app: &TestApp, client: &Client, attempt: i64) -> Value {
    let response = client
        .get(app.url(&format!("/result/{attempt}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn quiz_without_questions_is_not_found() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, _) = app.seed_quiz(true, &[]).await;

    let response = client.get(app.url(&format!("/quiz/{quiz_id}/"))).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = submit(&app, &client, quiz_id, json!({})).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn unpublished_quiz_is_not_found() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, _) = app.seed_quiz(false, TWO_QUESTIONS).await;

    let response = client.get(app.url(&format!("/quiz/{quiz_id}/"))).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_form_lists_every_question_without_answers() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, seeded) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let response = client.get(app.url(&format!("/quiz/{quiz_id}/"))).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let body: Value = response.json().await.unwrap();
    let questions = body["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 2);
    assert!(!body.to_string().contains("is_correct"));

    for (question_id, option_ids) in seeded {
        let question = questions
            .iter()
            .find(|q| q["id"] == question_id)
            .expect("question missing from form");
        assert_eq!(question["field"], format!("question_{question_id}"));
        let mut ids: Vec<i64> = question["choices"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, option_ids);
    }
}

#[tokio::test]
async fn score_counts_correct_choices_and_ignores_unanswered() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, seeded) = app
        .seed_quiz(
            true,
            &[
                &[("right", true), ("wrong", false)],
                &[("right", true), ("wrong", false)],
                &[("right", true), ("wrong", false)],
            ],
        )
        .await;

    // First right, second wrong, third unanswered
    let answers = json!({
        seeded[0].0.to_string(): seeded[0].1[0],
        seeded[1].0.to_string(): seeded[1].1[1],
    });
    let response = submit(&app, &client, quiz_id, answers).await;
    assert_eq!(response.status().as_u16(), 303);

    let page = result_page(&app, &client, attempt_id(&response)).await;
    assert_eq!(page["attempt"]["score"], 1);
    assert_eq!(page["attempt"]["total"], 3);
    assert_eq!(page["position"], 1);
    assert_eq!(page["participant_name"], "ada");
}

#[tokio::test]
async fn choice_from_another_question_is_a_field_error() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, seeded) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let (first_question, _) = &seeded[0];
    let (_, second_options) = &seeded[1];
    let response = submit(
        &app,
        &client,
        quiz_id,
        json!({ first_question.to_string(): second_options[0] }),
    )
    .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["fields"][format!("question_{first_question}")].is_array());

    let (attempts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM quiz_attempts")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(attempts, 0);
}

#[tokio::test]
async fn leaderboard_uses_dense_rank_with_earliest_first() {
    let app = spawn_app().await;
    let (quiz_id, seeded) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let both_right = json!({
        seeded[0].0.to_string(): seeded[0].1[0],
        seeded[1].0.to_string(): seeded[1].1[0],
    });
    let one_right = json!({ seeded[0].0.to_string(): seeded[0].1[0] });

    // Scores in submission order: 2, 2, 1, 0
    let mut attempts = Vec::new();
    for (name, answers) in [
        ("alice", both_right.clone()),
        ("bob", both_right),
        ("carol", one_right),
        ("dave", json!({})),
    ] {
        let client = app.participant(name).await;
        let response = submit(&app, &client, quiz_id, answers).await;
        assert_eq!(response.status().as_u16(), 303);
        attempts.push((client, attempt_id(&response)));
    }

    let (carol, carol_attempt) = &attempts[2];
    let page = result_page(&app, carol, *carol_attempt).await;
    assert_eq!(page["position"], 2);

    let rows: Vec<(String, i64, i64)> = page["leaderboard"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["participant_name"].as_str().unwrap().to_string(),
                row["rank"].as_i64().unwrap(),
                row["score"].as_i64().unwrap(),
            )
        })
        .collect();

    assert_eq!(
        rows,
        vec![
            ("alice".to_string(), 1, 2),
            ("bob".to_string(), 1, 2),
            ("carol".to_string(), 2, 1),
            ("dave".to_string(), 3, 0),
        ]
    );

    let (bob, bob_attempt) = &attempts[1];
    assert_eq!(result_page(&app, bob, *bob_attempt).await["position"], 1);
}

#[tokio::test]
async fn repeated_attempts_are_allowed_and_leaderboard_shows_ten() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let (quiz_id, _) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let mut last = 0;
    for _ in 0..12 {
        let response = submit(&app, &client, quiz_id, json!({})).await;
        assert_eq!(response.status().as_u16(), 303);
        last = attempt_id(&response);
    }

    let page = result_page(&app, &client, last).await;
    assert_eq!(page["leaderboard"].as_array().unwrap().len(), 10);
    assert_eq!(page["position"], 1);
}

#[tokio::test]
async fn results_are_private_to_their_participant() {
    let app = spawn_app().await;
    let owner = app.participant("owner").await;
    let other = app.participant("other").await;
    let (quiz_id, _) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let response = submit(&app, &owner, quiz_id, json!({})).await;
    let attempt = attempt_id(&response);

    let response = other
        .get(app.url(&format!("/result/{attempt}/")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"]["text"], "Result not found for your account.");
}

#[tokio::test]
async fn dashboard_shows_published_quizzes_and_own_attempts() {
    let app = spawn_app().await;
    let client = app.participant("ada").await;
    let other = app.participant("bob").await;
    let (published, _) = app.seed_quiz(true, TWO_QUESTIONS).await;
    let (_hidden, _) = app.seed_quiz(false, TWO_QUESTIONS).await;

    submit(&app, &client, published, json!({})).await;
    submit(&app, &other, published, json!({})).await;

    let response = client.get(app.url("/")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();

    let quizzes = body["quizzes"].as_array().unwrap();
    assert_eq!(quizzes.len(), 1);
    assert_eq!(quizzes[0]["id"], published);

    let attempts = body["attempts"].as_array().unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0]["quiz_title"], "Seeded");
}

#[tokio::test]
async fn profile_is_required_before_taking_quizzes() {
    let app = spawn_app().await;
    let client = app.client();
    app.register(&client, "noprofile@example.com", None).await;
    let (quiz_id, _) = app.seed_quiz(true, TWO_QUESTIONS).await;

    let response = client.get(app.url(&format!("/quiz/{quiz_id}/"))).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/participant-profile/");

    let response = client
        .post(app.url("/participant-profile/"))
        .json(&json!({
            "name": "",
            "student_class": "10",
            "age": -3,
            "gender": "robot",
            "institution": "School",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    for field in ["name", "age", "gender"] {
        assert!(body["fields"][field].is_array(), "{field}");
    }
}

#[tokio::test]
async fn wrongly_typed_profile_field_is_a_field_error() {
    let app = spawn_app().await;
    let client = app.client();
    app.register(&client, "typed@example.com", None).await;

    let response = client
        .post(app.url("/participant-profile/"))
        .json(&json!({
            "name": "Ada",
            "student_class": "10",
            "age": "fifteen",
            "gender": "female",
            "institution": "School",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["fields"]["age"][0], "Enter a valid value.");
}

// tests/common/mod.rs
#![allow(dead_code)]

use std::str::FromStr;

use quiz_portal::{config::Config, routes, state::AppState, utils::hash::hash_password};
use reqwest::{Client, Response, header::LOCATION, redirect::Policy};
use serde_json::json;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
}

/// Spawns the app on a random port against a fresh in-memory database.
pub async fn spawn_app() -> TestApp {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("Invalid SQLite URL")
        .foreign_keys(true);

    // One connection that never recycles, so the in-memory database lives
    // as long as the pool.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:5173".to_string()],
        admin_username: None,
        admin_password: None,
        admin_email: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { address, pool }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// A browser-like client: keeps cookies, does not follow redirects.
    pub fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client")
    }

    pub async fn register(
        &self,
        client: &Client,
        email: &str,
        username: Option<&str>,
    ) -> Response {
        client
            .post(self.url("/register/"))
            .json(&json!({
                "username": username,
                "email": email,
                "password1": PASSWORD,
                "password2": PASSWORD,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, client: &Client, username: &str) -> Response {
        client
            .post(self.url("/login/"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// A signed-in participant with a completed profile.
    pub async fn participant(&self, name: &str) -> Client {
        let client = self.client();
        let email = format!("{}_{}@example.com", name, &uuid::Uuid::new_v4().to_string()[..8]);

        let resp = self.register(&client, &email, None).await;
        assert_eq!(resp.status().as_u16(), 303);

        let resp = client
            .post(self.url("/participant-profile/"))
            .json(&json!({
                "name": name,
                "student_class": "10",
                "age": 15,
                "gender": "other",
                "institution": "Central High",
            }))
            .send()
            .await
            .expect("Failed to save profile");
        assert_eq!(location(&resp), "/");

        client
    }

    /// A signed-in staff account.
    pub async fn staff(&self) -> Client {
        let username = format!("staff_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        let hashed = hash_password(PASSWORD).unwrap();

        sqlx::query(
            "INSERT INTO users (username, email, password, is_staff, created_at) VALUES (?, NULL, ?, TRUE, ?)",
        )
        .bind(&username)
        .bind(hashed)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .unwrap();

        let client = self.client();
        let resp = self.login(&client, &username).await;
        assert_eq!(resp.status().as_u16(), 303);
        client
    }

    /// Inserts a quiz directly. Each question is a list of
    /// `(option_text, is_correct)`. Returns the quiz id and, per question,
    /// its id and option ids in the given order.
    pub async fn seed_quiz(
        &self,
        published: bool,
        questions: &[&[(&str, bool)]],
    ) -> (i64, Vec<(i64, Vec<i64>)>) {
        let (quiz_id,): (i64,) = sqlx::query_as(
            "INSERT INTO quizzes (title, description, is_published) VALUES ('Seeded', '', ?) RETURNING id",
        )
        .bind(published)
        .fetch_one(&self.pool)
        .await
        .unwrap();

        let mut seeded = Vec::new();
        for (index, options) in questions.iter().enumerate() {
            let (question_id,): (i64,) = sqlx::query_as(
                "INSERT INTO questions (quiz_id, question_text) VALUES (?, ?) RETURNING id",
            )
            .bind(quiz_id)
            .bind(format!("Question {}", index + 1))
            .fetch_one(&self.pool)
            .await
            .unwrap();

            let mut option_ids = Vec::new();
            for (text, is_correct) in options.iter() {
                let (option_id,): (i64,) = sqlx::query_as(
                    "INSERT INTO options (question_id, option_text, is_correct) VALUES (?, ?, ?) RETURNING id",
                )
                .bind(question_id)
                .bind(*text)
                .bind(*is_correct)
                .fetch_one(&self.pool)
                .await
                .unwrap();
                option_ids.push(option_id);
            }
            seeded.push((question_id, option_ids));
        }

        (quiz_id, seeded)
    }
}

/// `Location` header of a redirect, empty if absent.
pub fn location(resp: &Response) -> String {
    resp.headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Attempt id from a `/result/<id>/` redirect.
pub fn attempt_id(resp: &Response) -> i64 {
    location(resp)
        .trim_start_matches("/result/")
        .trim_end_matches('/')
        .parse()
        .expect("Not a result redirect")
}

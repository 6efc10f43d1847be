use chrono::Local;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct Outcome {
    accepted: bool,
    message: String,
}

#[derive(Debug, Deserialize)]
struct Progress {
    days_completed: usize,
    total_days: usize,
    rounded_percentage: u32,
}

#[derive(Debug, Deserialize)]
struct Entry {
    date: String,
    focus_score: Option<i64>,
    sales_activity_count: i64,
    core_habit_done: bool,
}

#[derive(Debug, Deserialize)]
struct Draft {
    date: String,
    focus_score: String,
    top_priority: String,
}

#[derive(Debug, Deserialize)]
struct Session {
    phase: String,
    user_id: Option<String>,
    core_habit: Option<String>,
    habit_setup_open: bool,
    draft: Draft,
}

struct TestServer {
    base_url: String,
    child: Child,
    data_dir: PathBuf,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

#[cfg(unix)]
mod cleanup {
    use once_cell::sync::Lazy;
    use std::sync::{Mutex, Once};

    static REGISTER: Once = Once::new();
    static PIDS: Lazy<Mutex<Vec<i32>>> = Lazy::new(|| Mutex::new(Vec::new()));

    pub fn register(pid: u32) {
        if let Ok(mut pids) = PIDS.lock() {
            pids.push(pid as i32);
        }
        REGISTER.call_once(|| unsafe {
            libc::atexit(on_exit);
        });
    }

    extern "C" fn on_exit() {
        if let Ok(pids) = PIDS.lock() {
            for pid in pids.iter().copied().filter(|pid| *pid > 0) {
                unsafe {
                    libc::kill(pid, libc::SIGTERM);
                }
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("achievers_journal_http_{}_{}", std::process::id(), nanos));
    path
}

async fn get_session(base_url: &str) -> Option<Session> {
    let resp = Client::new().get(format!("{base_url}/api/session")).send().await.ok()?;
    resp.json().await.ok()
}

async fn wait_for(base_url: &str, what: &str, check: impl Fn(&Session) -> bool) -> Session {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(session) = get_session(base_url).await {
            if check(&session) {
                return session;
            }
        }
        if Instant::now() > deadline {
            panic!("server never reached: {what}");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_dir = unique_data_dir();
    let child = Command::new(env!("CARGO_BIN_EXE_achievers_journal"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_dir.join("journal.json"))
        .env("APP_CREDENTIAL_PATH", data_dir.join("credential.json"))
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_for(&base_url, "signed-in user", |session| {
        session.phase == "ready" && session.user_id.is_some()
    })
    .await;

    TestServer {
        base_url,
        child,
        data_dir,
    }
}

async fn set_habit(server: &TestServer, description: &str) -> Outcome {
    Client::new()
        .post(format!("{}/api/habit", server.base_url))
        .json(&serde_json::json!({ "description": description }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn submit(server: &TestServer, draft: serde_json::Value) -> Outcome {
    Client::new()
        .post(format!("{}/api/entries", server.base_url))
        .json(&draft)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn scenario_draft() -> serde_json::Value {
    serde_json::json!({
        "date": "2025-06-01",
        "focus_score": "5",
        "top_priority": "X",
        "sales_activity_count": "3",
        "core_habit_done": false,
        "win_of_the_day": "Y",
        "lesson_learned": "Z"
    })
}

#[tokio::test]
async fn http_new_user_is_prompted_for_habit() {
    let server = spawn_server().await;

    let session = wait_for(&server.base_url, "setup prompt", |s| s.habit_setup_open).await;
    assert!(session.core_habit.is_none());

    let page = Client::new().get(&server.base_url).send().await.unwrap();
    assert!(page.status().is_success());
    let html = page.text().await.unwrap();
    assert!(html.contains("Define Your Core Habit"));
    assert!(html.contains("Day 0 of 21"));
}

#[tokio::test]
async fn http_submission_requires_habit() {
    let server = spawn_server().await;

    let outcome = submit(&server, scenario_draft()).await;
    assert!(!outcome.accepted);
    assert_eq!(
        outcome.message,
        "Please define your Core Habit before submitting a daily entry!"
    );

    let entries: Vec<Entry> = Client::new()
        .get(format!("{}/api/entries", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn http_habit_then_entry_updates_progress() {
    let server = spawn_server().await;

    let outcome = set_habit(&server, "  call 10 leads  ").await;
    assert!(outcome.accepted, "{}", outcome.message);
    let session = wait_for(&server.base_url, "habit", |s| s.core_habit.is_some()).await;
    assert_eq!(session.core_habit.as_deref(), Some("call 10 leads"));
    assert!(!session.habit_setup_open);

    let outcome = submit(&server, scenario_draft()).await;
    assert!(outcome.accepted, "{}", outcome.message);

    let session = get_session(&server.base_url).await.unwrap();
    assert!(session.draft.focus_score.is_empty());
    assert!(session.draft.top_priority.is_empty());
    let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(session.draft.date, today);

    let deadline = Instant::now() + Duration::from_secs(3);
    let entries: Vec<Entry> = loop {
        let entries: Vec<Entry> = Client::new()
            .get(format!("{}/api/entries", server.base_url))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if !entries.is_empty() || Instant::now() > deadline {
            break entries;
        }
        sleep(Duration::from_millis(50)).await;
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].date, "2025-06-01");
    assert_eq!(entries[0].focus_score, Some(5));
    assert_eq!(entries[0].sales_activity_count, 3);
    assert!(!entries[0].core_habit_done);

    let progress: Progress = Client::new()
        .get(format!("{}/api/progress", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(progress.days_completed, 1);
    assert_eq!(progress.total_days, 21);
    assert_eq!(progress.rounded_percentage, 5);
}

#[tokio::test]
async fn http_out_of_range_focus_is_rejected() {
    let server = spawn_server().await;
    assert!(set_habit(&server, "stretch").await.accepted);

    let mut draft = scenario_draft();
    draft["focus_score"] = "6".into();
    let outcome = submit(&server, draft).await;
    assert!(!outcome.accepted);
    assert_eq!(outcome.message, "Focus Score must be a number between 1 and 5.");
}

#[tokio::test]
async fn http_form_post_redirects_home() {
    let server = spawn_server().await;
    let client = Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let response = client
        .post(format!("{}/habit", server.base_url))
        .header("content-type", "application/x-www-form-urlencoded")
        .body("description=read+10+pages")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()["location"], "/");

    let session = wait_for(&server.base_url, "habit", |s| s.core_habit.is_some()).await;
    assert_eq!(session.core_habit.as_deref(), Some("read 10 pages"));
}

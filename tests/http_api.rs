//! End-to-end tests for the HTTP API.
//!
//! Each test writes a scratch config, builds the full application state
//! (SQLite database included), binds the router on an ephemeral port,
//! and exercises it over real HTTP. The embedding provider stays
//! disabled, so every test also runs with a degraded knowledge pipeline,
//! the mode in which complaint endpoints must keep working.

use std::fs;
use tempfile::TempDir;

use complaint_desk::{config, server};

async fn spawn_server() -> (String, TempDir) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[db]
path = "{}/data/complaints.sqlite"

[server]
bind = "127.0.0.1:0"

[knowledge]
path = "{}/kb.txt"
chunk_chars = 1000
overlap_chars = 100
"#,
        root.display(),
        root.display()
    );
    let config_path = root.join("desk.toml");
    fs::write(&config_path, config_content).unwrap();

    let cfg = config::load_config(&config_path).unwrap();
    let state = server::build_state(&cfg).await.unwrap();
    let app = server::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), tmp)
}

fn valid_payload() -> serde_json::Value {
    serde_json::json!({
        "name": "Jane Doe",
        "phone_number": "5551234567",
        "email": "jane@x.com",
        "complaint_details": "widget broken"
    })
}

#[tokio::test]
async fn test_create_then_get_roundtrip() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/complaints", base))
        .json(&valid_payload())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let ack: serde_json::Value = res.json().await.unwrap();
    assert_eq!(ack["message"], "Complaint created successfully");
    let id = ack["complaint_id"].as_str().unwrap();
    assert_eq!(id.len(), 8);

    let res = client
        .get(format!("{}/complaints/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["complaint_id"], id);
    assert_eq!(record["name"], "Jane Doe");
    assert_eq!(record["phone_number"], "5551234567");
    assert_eq!(record["email"], "jane@x.com");
    assert_eq!(record["complaint_details"], "widget broken");
    assert!(record["created_at"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_invalid_phone_is_422_with_field() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let mut payload = valid_payload();
    payload["phone_number"] = serde_json::json!("555-1234");

    let res = client
        .post(format!("{}/complaints", base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(body["error"]["field"], "phone_number");
}

#[tokio::test]
async fn test_invalid_email_is_422() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let mut payload = valid_payload();
    payload["email"] = serde_json::json!("not-an-email");

    let res = client
        .post(format!("{}/complaints", base))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 422);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["field"], "email");
}

#[tokio::test]
async fn test_unknown_id_is_404() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/complaints/FFFFFFFF", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn test_lookup_is_case_insensitive() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let ack: serde_json::Value = client
        .post(format!("{}/complaints", base))
        .json(&valid_payload())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = ack["complaint_id"].as_str().unwrap().to_lowercase();

    let res = client
        .get(format!("{}/complaints/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
}

#[tokio::test]
async fn test_identical_payloads_get_distinct_ids() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let ack: serde_json::Value = client
            .post(format!("{}/complaints", base))
            .json(&valid_payload())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        ids.push(ack["complaint_id"].as_str().unwrap().to_string());
    }
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_chat_filing_dialogue_over_the_wire() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let mut session_id: Option<String> = None;
    let mut last_reply = String::new();

    for message in [
        "file",
        "Jane Doe",
        "5551234567",
        "jane@x.com",
        "widget broken",
    ] {
        let res: serde_json::Value = client
            .post(format!("{}/chat", base))
            .json(&serde_json::json!({
                "session_id": session_id,
                "message": message,
            }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        session_id = Some(res["session_id"].as_str().unwrap().to_string());
        last_reply = res["reply"].as_str().unwrap().to_string();
    }

    assert!(last_reply.contains("Complaint filed!"), "{}", last_reply);
    let id = last_reply.split_whitespace().last().unwrap();

    // The dialogue produced a real record.
    let res = client
        .get(format!("{}/complaints/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let record: serde_json::Value = res.json().await.unwrap();
    assert_eq!(record["name"], "Jane Doe");
}

#[tokio::test]
async fn test_chat_eight_char_input_is_lookup() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let res: serde_json::Value = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "message": "FILECOMP" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Treated as an id lookup, never a filing trigger.
    assert!(res["reply"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_chat_question_degrades_without_pipeline() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let res: serde_json::Value = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "message": "what is the refund policy?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(res["reply"].as_str().unwrap().contains("unavailable"));
    assert_eq!(res["history"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_chat_sessions_are_independent() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    // Session A starts filing.
    let a: serde_json::Value = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "message": "file" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(a["reply"].as_str().unwrap().contains("enter your name"));

    // Session B's 8-char input is still a lookup, not a name capture.
    let b: serde_json::Value = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "message": "AAAA1111" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(a["session_id"], b["session_id"]);
    assert!(b["reply"].as_str().unwrap().contains("not found"));
}

#[tokio::test]
async fn test_chat_empty_message_is_400() {
    let (base, _tmp) = spawn_server().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/chat", base))
        .json(&serde_json::json!({ "message": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn test_health() {
    let (base, _tmp) = spawn_server().await;

    let res: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(res["status"], "ok");
}

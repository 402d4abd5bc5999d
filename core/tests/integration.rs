//! Full tool lifecycle against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives every operation
//! through `HabiticaTools` with the real `ureq` transport, checking envelopes
//! end-to-end.

use std::net::SocketAddr;

use habitica_core::{Envelope, HabiticaConfig, HabiticaTools, DEFAULT_TAG_ID};
use mock_server::{MOCK_API_TOKEN, MOCK_PASSWORD, MOCK_USERNAME, MOCK_USER_ID};
use serde_json::{json, Value};

fn start_mock_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });
    addr
}

fn tools_for(addr: SocketAddr) -> HabiticaTools {
    let config = HabiticaConfig::new(MOCK_USER_ID, "mock-key")
        .unwrap()
        .with_base_url(format!("http://{addr}"))
        .unwrap();
    HabiticaTools::new(config)
}

fn data(envelope: Envelope) -> Value {
    assert!(envelope.success, "expected success, got {:?}", envelope.error);
    envelope.data.unwrap()
}

#[test]
fn tool_lifecycle() {
    let tools = tools_for(start_mock_server());

    // Step 1: login and profile.
    let user = data(tools.user_login(&json!({"username": MOCK_USERNAME, "password": MOCK_PASSWORD})));
    assert_eq!(user["apiToken"], MOCK_API_TOKEN);

    let env = tools.user_login(&json!({"username": MOCK_USERNAME, "password": "wrong"}));
    assert_eq!(
        env.error.as_deref(),
        Some("Request failed: HTTP 401: Invalid username or password")
    );

    let profile = data(tools.get_user_profile(&json!({"user_fields": "stats"})));
    assert_eq!(profile["id"], MOCK_USER_ID);
    assert!(profile.get("stats").is_some());
    assert!(profile.get("preferences").is_none());

    // Step 2: groups, including the paginated public listing.
    let groups = data(tools.get_groups(&json!({"type": ["party", "tavern"]})));
    assert_eq!(groups.as_array().unwrap().len(), 2);

    let public = data(tools.get_groups(&json!({"type": "publicGuilds", "paginate": true, "page": 0})));
    assert_eq!(public[0]["id"], "guild-public-1");

    // Step 3: export comes back as raw text, not parsed.
    let export = data(tools.export_user_data(&Value::Null));
    let text = export.as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed["id"], MOCK_USER_ID);

    let xml = data(tools.export_user_data(&json!({"format": "xml"})));
    assert!(xml.as_str().unwrap().starts_with("<user>"));

    // Step 4: tags.
    let tag = data(tools.create_tag(&json!({"name": "agent"})));
    assert_eq!(tag["name"], "agent");
    let tags = data(tools.list_tags());
    assert_eq!(tags.as_array().unwrap().len(), 1);

    // Step 5: skills.
    let cast = data(tools.cast_skill(&json!({"spell_id": "earth", "target_id": "party-1"})));
    assert_eq!(cast["spell"], "earth");
    assert_eq!(cast["targetId"], "party-1");

    // Step 6: create a task; the default tag is attached.
    let task = data(tools.create_task(&json!({
        "text": "Write report",
        "type": "todo",
        "notes": "quarterly",
        "tags": [tag["id"]],
    })));
    assert_eq!(task["tags"], json!([tag["id"], DEFAULT_TAG_ID]));
    let task_id = task["id"].as_str().unwrap().to_string();

    // Step 7: get and list.
    let fetched = data(tools.get_task(&json!({"task_id": task_id})));
    assert_eq!(fetched["text"], "Write report");

    let todos = data(tools.list_tasks(&json!({"type": "todos"})));
    assert_eq!(todos.as_array().unwrap().len(), 1);
    let habits = data(tools.list_tasks(&json!({"type": "habits"})));
    assert!(habits.as_array().unwrap().is_empty());

    // Step 8: update.
    let updated = data(tools.update_task(&json!({"task_id": task_id, "updates": {"text": "Write final report"}})));
    assert_eq!(updated["text"], "Write final report");

    // Step 9: checklist add and update.
    let with_item = data(tools.add_checklist_item(&json!({"task_id": task_id, "text": "Draft"})));
    let item_id = with_item["checklist"][0]["id"].as_str().unwrap().to_string();

    let checked = data(tools.update_checklist_item(&json!({
        "task_id": task_id,
        "item_id": item_id,
        "updates": {"completed": true},
    })));
    assert_eq!(checked["checklist"][0]["completed"], true);

    let env = tools.update_checklist_item(&json!({
        "task_id": task_id,
        "item_id": "no-such-item",
        "updates": {"completed": true},
    }));
    assert_eq!(env, Envelope::err("Checklist item not found."));

    // Step 10: score up completes the todo.
    let scored = data(tools.score_task(&json!({"task_id": task_id, "direction": "up"})));
    assert_eq!(scored["delta"], 1.0);
    let done = data(tools.list_tasks(&json!({"type": "completedTodos"})));
    assert_eq!(done.as_array().unwrap().len(), 1);

    // Step 11: delete, then everything task-scoped is not found.
    data(tools.delete_task(&json!({"task_id": task_id})));
    assert_eq!(tools.get_task(&json!({"task_id": task_id})), Envelope::err("Task not found."));
    assert_eq!(tools.delete_task(&json!({"task_id": task_id})), Envelope::err("Task not found."));
    assert_eq!(
        tools.add_checklist_item(&json!({"task_id": task_id, "text": "late"})),
        Envelope::err("Task not found.")
    );
}

#[test]
fn name_dispatch_reaches_the_server() {
    let tools = tools_for(start_mock_server());
    let env = tools.call_by_name("create_tag", &json!({"name": "by-name"}));
    assert_eq!(data(env)["name"], "by-name");
}

#[test]
fn connection_refused_is_a_request_failure() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let env = tools_for(addr).list_tags();
    assert!(!env.success);
    assert!(env.error.unwrap().starts_with("Request failed: "));
}

#[test]
fn silent_server_times_out() {
    // Accepts connections (kernel backlog) but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let mut config = HabiticaConfig::new("u", "k")
        .unwrap()
        .with_base_url(format!("http://{addr}"))
        .unwrap();
    config.timeout_secs = 1;
    let tools = HabiticaTools::new(config);

    let started = std::time::Instant::now();
    let env = tools.list_tags();
    assert!(!env.success);
    assert!(env.error.unwrap().starts_with("Request failed: "));
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    drop(listener);
}

//! In-memory stand-in for the subset of Habitica's API the tools call.
//!
//! Bodies follow Habitica's shape: `{"success":true,"data":...}` on success,
//! `{"success":false,"error":"<Kind>","message":"..."}` on failure. Every
//! route except login requires non-empty `x-api-user` and `x-api-key`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const MOCK_USER_ID: &str = "00000000-0000-4000-8000-000000000001";
pub const MOCK_API_TOKEN: &str = "00000000-0000-4000-8000-0000000000aa";
pub const MOCK_USERNAME: &str = "hero";
pub const MOCK_PASSWORD: &str = "hunter2";
pub const TAVERN_ID: &str = "habitrpg";

const TASK_TYPES: &[&str] = &["habit", "daily", "todo", "reward"];
const PAGE_SIZE: usize = 30;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub task_type: String,
    pub text: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub checklist: Vec<ChecklistItem>,
    pub priority: f64,
    pub value: f64,
    pub completed: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub privacy: String,
}

impl Group {
    fn new(id: &str, name: &str, group_type: &str, privacy: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            group_type: group_type.to_string(),
            privacy: privacy.to_string(),
        }
    }

    /// Whether this group is selected by one of Habitica's group-type filters.
    fn matches(&self, filter: &str) -> bool {
        let guild = self.group_type == "guild" && self.id != TAVERN_ID;
        match filter {
            "party" => self.group_type == "party",
            "tavern" => self.id == TAVERN_ID,
            "guilds" => guild,
            "publicGuilds" => guild && self.privacy == "public",
            "privateGuilds" => guild && self.privacy == "private",
            _ => false,
        }
    }
}

#[derive(Debug)]
pub struct Store {
    pub tags: Vec<Tag>,
    pub tasks: Vec<Task>,
    pub groups: Vec<Group>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            tags: Vec::new(),
            tasks: Vec::new(),
            groups: vec![
                Group::new("party-1", "Mock Party", "party", "private"),
                Group::new(TAVERN_ID, "Tavern", "guild", "public"),
                Group::new("guild-public-1", "Mock Public Guild", "guild", "public"),
                Group::new("guild-private-1", "Mock Private Guild", "guild", "private"),
            ],
        }
    }
}

pub type Db = Arc<RwLock<Store>>;

type Reply = (StatusCode, Json<Value>);

fn ok(status: StatusCode, data: impl Serialize) -> Reply {
    (status, Json(json!({ "success": true, "data": data })))
}

fn fail(status: StatusCode, error: &str, message: &str) -> Reply {
    (
        status,
        Json(json!({ "success": false, "error": error, "message": message })),
    )
}

fn task_not_found() -> Reply {
    fail(StatusCode::NOT_FOUND, "NotFound", "Task not found.")
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));

    let protected = Router::new()
        .route("/api/v3/user", get(get_user))
        .route("/api/v3/groups", get(get_groups))
        .route("/api/v3/tags", get(list_tags).post(create_tag))
        .route("/api/v3/user/class/cast/{spell_id}", post(cast_skill))
        .route("/api/v3/tasks/user", get(list_tasks).post(create_task))
        .route(
            "/api/v3/tasks/{task_id}",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/api/v3/tasks/{task_id}/score/{direction}", post(score_task))
        .route("/api/v3/tasks/{task_id}/checklist", post(add_checklist_item))
        .route(
            "/api/v3/tasks/{task_id}/checklist/{item_id}",
            put(update_checklist_item),
        )
        .route("/export/{file}", get(export_user_data))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/api/v3/user/auth/local/login", post(login))
        .merge(protected)
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn header_present(request: &Request, name: &str) -> bool {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.trim().is_empty())
}

async fn require_auth(request: Request, next: Next) -> Response {
    let authed = header_present(&request, "x-api-user") && header_present(&request, "x-api-key");
    if !authed {
        return fail(
            StatusCode::UNAUTHORIZED,
            "NotAuthorized",
            "Missing authentication headers.",
        )
        .into_response();
    }
    next.run(request).await
}

// --- user ---

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

async fn login(Json(body): Json<LoginBody>) -> Reply {
    if body.username != MOCK_USERNAME || body.password != MOCK_PASSWORD {
        return fail(
            StatusCode::UNAUTHORIZED,
            "NotAuthorized",
            "Invalid username or password",
        );
    }
    ok(
        StatusCode::OK,
        json!({
            "id": MOCK_USER_ID,
            "apiToken": MOCK_API_TOKEN,
            "username": body.username,
            "newUser": false,
        }),
    )
}

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userFields")]
    pub user_fields: Option<String>,
}

fn profile() -> Value {
    json!({
        "id": MOCK_USER_ID,
        "profile": { "name": "Mock Hero" },
        "stats": { "hp": 50, "mp": 32, "exp": 12, "gp": 4.5, "lvl": 11, "class": "wizard" },
        "preferences": { "dayStart": 0, "timezoneOffset": 0 },
        "items": { "gear": { "equipped": {} } },
    })
}

async fn get_user(Query(query): Query<UserQuery>) -> Reply {
    let full = profile();
    let Some(fields) = query.user_fields else {
        return ok(StatusCode::OK, full);
    };
    let wanted: Vec<&str> = fields
        .split(',')
        .map(|f| f.trim().split('.').next().unwrap_or_default())
        .collect();
    let mut filtered = serde_json::Map::new();
    if let Value::Object(map) = full {
        for (key, value) in map {
            if key == "id" || wanted.contains(&key.as_str()) {
                filtered.insert(key, value);
            }
        }
    }
    ok(StatusCode::OK, filtered)
}

async fn export_user_data(Path(file): Path<String>) -> Response {
    match file.as_str() {
        "userdata.json" => (
            [(header::CONTENT_TYPE, "application/json")],
            profile().to_string(),
        )
            .into_response(),
        "userdata.xml" => (
            [(header::CONTENT_TYPE, "application/xml")],
            format!("<user><id>{MOCK_USER_ID}</id></user>"),
        )
            .into_response(),
        _ => fail(StatusCode::NOT_FOUND, "NotFound", "Export format not found.").into_response(),
    }
}

// --- groups ---

#[derive(Deserialize)]
pub struct GroupsQuery {
    #[serde(rename = "type")]
    pub group_types: Option<String>,
    #[serde(default)]
    pub paginate: bool,
    pub page: Option<usize>,
}

async fn get_groups(State(db): State<Db>, Query(query): Query<GroupsQuery>) -> Reply {
    let Some(types) = query.group_types.filter(|t| !t.is_empty()) else {
        return fail(StatusCode::BAD_REQUEST, "BadRequest", "Group types are required.");
    };
    let filters: Vec<&str> = types.split(',').map(str::trim).collect();
    if query.paginate && !filters.contains(&"publicGuilds") {
        return fail(
            StatusCode::BAD_REQUEST,
            "BadRequest",
            "Only public guilds support pagination.",
        );
    }

    let store = db.read().await;
    let mut groups: Vec<Group> = Vec::new();
    for group in &store.groups {
        if filters.iter().any(|f| group.matches(f)) && !groups.iter().any(|g| g.id == group.id) {
            groups.push(group.clone());
        }
    }
    if query.paginate {
        let page = query.page.unwrap_or(0);
        groups = groups.into_iter().skip(page * PAGE_SIZE).take(PAGE_SIZE).collect();
    }
    ok(StatusCode::OK, groups)
}

// --- tags ---

#[derive(Deserialize)]
pub struct CreateTag {
    pub name: String,
}

async fn create_tag(State(db): State<Db>, Json(input): Json<CreateTag>) -> Reply {
    let tag = Tag {
        id: Uuid::new_v4(),
        name: input.name,
    };
    db.write().await.tags.push(tag.clone());
    ok(StatusCode::CREATED, tag)
}

async fn list_tags(State(db): State<Db>) -> Reply {
    ok(StatusCode::OK, db.read().await.tags.clone())
}

// --- skills ---

#[derive(Deserialize)]
pub struct CastQuery {
    #[serde(rename = "targetId")]
    pub target_id: Option<String>,
}

async fn cast_skill(Path(spell_id): Path<String>, Query(query): Query<CastQuery>) -> Reply {
    ok(
        StatusCode::OK,
        json!({
            "spell": spell_id,
            "targetId": query.target_id,
            "user": { "stats": { "mp": 22 } },
        }),
    )
}

// --- tasks ---

#[derive(Deserialize)]
pub struct CreateTask {
    pub text: String,
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<f64>,
}

#[derive(Deserialize)]
pub struct UpdateTask {
    pub text: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    pub priority: Option<f64>,
    pub completed: Option<bool>,
}

#[derive(Deserialize)]
pub struct TaskQuery {
    #[serde(rename = "type")]
    pub filter: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateChecklistItem {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Deserialize)]
pub struct UpdateChecklistItem {
    pub text: Option<String>,
    pub completed: Option<bool>,
}

fn find_task<'a>(tasks: &'a mut [Task], task_id: &str) -> Option<&'a mut Task> {
    tasks.iter_mut().find(|t| t.id.to_string() == task_id)
}

async fn create_task(State(db): State<Db>, Json(input): Json<CreateTask>) -> Reply {
    if input.text.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "BadRequest", "Task text is required.");
    }
    if !TASK_TYPES.contains(&input.task_type.as_str()) {
        return fail(StatusCode::BAD_REQUEST, "BadRequest", "Invalid task type.");
    }
    let task = Task {
        id: Uuid::new_v4(),
        task_type: input.task_type,
        text: input.text,
        notes: input.notes,
        tags: input.tags,
        checklist: Vec::new(),
        priority: input.priority.unwrap_or(1.0),
        value: 0.0,
        completed: false,
    };
    db.write().await.tasks.push(task.clone());
    ok(StatusCode::CREATED, task)
}

async fn list_tasks(State(db): State<Db>, Query(query): Query<TaskQuery>) -> Reply {
    let store = db.read().await;
    let selected: Vec<Task> = store
        .tasks
        .iter()
        .filter(|t| match query.filter.as_deref() {
            None => !(t.task_type == "todo" && t.completed),
            Some("habits") => t.task_type == "habit",
            Some("dailys") => t.task_type == "daily",
            Some("todos") => t.task_type == "todo" && !t.completed,
            Some("completedTodos") => t.task_type == "todo" && t.completed,
            Some("rewards") => t.task_type == "reward",
            Some(_) => false,
        })
        .cloned()
        .collect();
    ok(StatusCode::OK, selected)
}

async fn get_task(State(db): State<Db>, Path(task_id): Path<String>) -> Reply {
    let mut store = db.write().await;
    match find_task(&mut store.tasks, &task_id) {
        Some(task) => ok(StatusCode::OK, task.clone()),
        None => task_not_found(),
    }
}

async fn update_task(
    State(db): State<Db>,
    Path(task_id): Path<String>,
    Json(input): Json<UpdateTask>,
) -> Reply {
    let mut store = db.write().await;
    let Some(task) = find_task(&mut store.tasks, &task_id) else {
        return task_not_found();
    };
    if let Some(text) = input.text {
        task.text = text;
    }
    if let Some(notes) = input.notes {
        task.notes = notes;
    }
    if let Some(tags) = input.tags {
        task.tags = tags;
    }
    if let Some(priority) = input.priority {
        task.priority = priority;
    }
    if let Some(completed) = input.completed {
        task.completed = completed;
    }
    ok(StatusCode::OK, task.clone())
}

async fn delete_task(State(db): State<Db>, Path(task_id): Path<String>) -> Reply {
    let mut store = db.write().await;
    let before = store.tasks.len();
    store.tasks.retain(|t| t.id.to_string() != task_id);
    if store.tasks.len() == before {
        return task_not_found();
    }
    ok(StatusCode::OK, json!({}))
}

async fn score_task(
    State(db): State<Db>,
    Path((task_id, direction)): Path<(String, String)>,
) -> Reply {
    let delta = match direction.as_str() {
        "up" => 1.0,
        "down" => -1.0,
        _ => return fail(StatusCode::BAD_REQUEST, "BadRequest", "Invalid score direction."),
    };
    let mut store = db.write().await;
    let Some(task) = find_task(&mut store.tasks, &task_id) else {
        return task_not_found();
    };
    task.value += delta;
    if matches!(task.task_type.as_str(), "todo" | "daily") {
        task.completed = delta > 0.0;
    }
    ok(StatusCode::OK, json!({ "delta": delta, "value": task.value }))
}

async fn add_checklist_item(
    State(db): State<Db>,
    Path(task_id): Path<String>,
    Json(input): Json<CreateChecklistItem>,
) -> Reply {
    let mut store = db.write().await;
    let Some(task) = find_task(&mut store.tasks, &task_id) else {
        return task_not_found();
    };
    task.checklist.push(ChecklistItem {
        id: Uuid::new_v4(),
        text: input.text,
        completed: input.completed,
    });
    ok(StatusCode::OK, task.clone())
}

async fn update_checklist_item(
    State(db): State<Db>,
    Path((task_id, item_id)): Path<(String, String)>,
    Json(input): Json<UpdateChecklistItem>,
) -> Reply {
    let mut store = db.write().await;
    let Some(task) = find_task(&mut store.tasks, &task_id) else {
        return task_not_found();
    };
    let Some(item) = task.checklist.iter_mut().find(|i| i.id.to_string() == item_id) else {
        return fail(StatusCode::NOT_FOUND, "NotFound", "Checklist item not found.");
    };
    if let Some(text) = input.text {
        item.text = text;
    }
    if let Some(completed) = input.completed {
        item.completed = completed;
    }
    ok(StatusCode::OK, task.clone())
}

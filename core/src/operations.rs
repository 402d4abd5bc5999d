//! The call-site table.
//!
//! # Design
//! Each tool operation is one `CallSite` row: verb, path template, required
//! fields, enumerated choices, response shape and 404 handling. The generic
//! checks (`required`, `choices`) run for every operation straight off the
//! table; `prepare` then applies the few rules that need code (type checks,
//! query mapping, default tagging, the pagination gate) and yields the
//! path parameters, query pairs and body for `HabiticaClient::build`.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::http::HttpMethod;
use crate::validate::{one_of, Args};

/// Tag attached to every task created through this adapter.
pub const DEFAULT_TAG_ID: &str = "5e1f4f0d-6a3b-4c55-9d2e-1a7b8c9d0e21";

pub const GROUP_TYPES: &[&str] = &["party", "guilds", "privateGuilds", "publicGuilds", "tavern"];
pub const TASK_TYPES: &[&str] = &["habit", "daily", "todo", "reward"];
/// Habitica's plural filter names for `GET /tasks/user`. Not the same
/// vocabulary as `TASK_TYPES`.
pub const TASK_LIST_TYPES: &[&str] = &["habits", "dailys", "todos", "rewards", "completedTodos"];
pub const SPELLS: &[&str] = &[
    // mage
    "fireball",
    "mpheal",
    "earth",
    "frost",
    // warrior
    "smash",
    "defensiveStance",
    "valorousPresence",
    "intimidate",
    // rogue
    "pickPocket",
    "backStab",
    "toolsOfTrade",
    "stealth",
    // healer
    "heal",
    "protectAura",
    "brightness",
    "healAll",
    // transformation items
    "snowball",
    "spookySparkles",
    "seafoam",
    "shinySeed",
];
pub const SCORE_DIRECTIONS: &[&str] = &["up", "down"];
pub const EXPORT_FORMATS: &[&str] = &["json", "xml"];

/// How a successful body becomes envelope `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Parse JSON and unwrap a top-level `data` key if present.
    Unwrap,
    /// Return the body text untouched as a JSON string.
    Text,
}

/// An enumerated argument.
#[derive(Debug)]
pub struct Choice {
    pub field: &'static str,
    pub allowed: &'static [&'static str],
    /// Accept a comma-separated string or list, checking every entry.
    pub multi: bool,
}

#[derive(Debug)]
pub struct CallSite {
    pub operation: Operation,
    pub method: HttpMethod,
    /// Relative to the base URL; `{name}` segments are path parameters.
    pub path: &'static str,
    pub required: &'static [&'static str],
    pub choices: &'static [Choice],
    pub response: ResponseShape,
    /// Fallback message for a 404 when the upstream body has none. `None`
    /// means 404 is reported like any other failed status.
    pub not_found: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    UserLogin,
    GetUserProfile,
    GetGroups,
    ExportUserData,
    CreateTag,
    ListTags,
    CastSkill,
    CreateTask,
    GetTask,
    ListTasks,
    UpdateTask,
    DeleteTask,
    ScoreTask,
    AddChecklistItem,
    UpdateChecklistItem,
}

const TASK_NOT_FOUND: Option<&str> = Some("Task not found.");

static CALL_SITES: &[CallSite] = &[
    CallSite {
        operation: Operation::UserLogin,
        method: HttpMethod::Post,
        path: "/api/v3/user/auth/local/login",
        required: &["username", "password"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::GetUserProfile,
        method: HttpMethod::Get,
        path: "/api/v3/user",
        required: &[],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::GetGroups,
        method: HttpMethod::Get,
        path: "/api/v3/groups",
        required: &["type"],
        choices: &[Choice { field: "type", allowed: GROUP_TYPES, multi: true }],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::ExportUserData,
        method: HttpMethod::Get,
        path: "/export/userdata.{format}",
        required: &[],
        choices: &[Choice { field: "format", allowed: EXPORT_FORMATS, multi: false }],
        response: ResponseShape::Text,
        not_found: None,
    },
    CallSite {
        operation: Operation::CreateTag,
        method: HttpMethod::Post,
        path: "/api/v3/tags",
        required: &["name"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::ListTags,
        method: HttpMethod::Get,
        path: "/api/v3/tags",
        required: &[],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::CastSkill,
        method: HttpMethod::Post,
        path: "/api/v3/user/class/cast/{spellId}",
        required: &["spell_id"],
        choices: &[Choice { field: "spell_id", allowed: SPELLS, multi: false }],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::CreateTask,
        method: HttpMethod::Post,
        path: "/api/v3/tasks/user",
        required: &["text", "type"],
        choices: &[Choice { field: "type", allowed: TASK_TYPES, multi: false }],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::GetTask,
        method: HttpMethod::Get,
        path: "/api/v3/tasks/{taskId}",
        required: &["task_id"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: TASK_NOT_FOUND,
    },
    CallSite {
        operation: Operation::ListTasks,
        method: HttpMethod::Get,
        path: "/api/v3/tasks/user",
        required: &[],
        choices: &[Choice { field: "type", allowed: TASK_LIST_TYPES, multi: false }],
        response: ResponseShape::Unwrap,
        not_found: None,
    },
    CallSite {
        operation: Operation::UpdateTask,
        method: HttpMethod::Put,
        path: "/api/v3/tasks/{taskId}",
        required: &["task_id", "updates"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: TASK_NOT_FOUND,
    },
    CallSite {
        operation: Operation::DeleteTask,
        method: HttpMethod::Delete,
        path: "/api/v3/tasks/{taskId}",
        required: &["task_id"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: TASK_NOT_FOUND,
    },
    CallSite {
        operation: Operation::ScoreTask,
        method: HttpMethod::Post,
        path: "/api/v3/tasks/{taskId}/score/{direction}",
        required: &["task_id", "direction"],
        choices: &[Choice { field: "direction", allowed: SCORE_DIRECTIONS, multi: false }],
        response: ResponseShape::Unwrap,
        not_found: TASK_NOT_FOUND,
    },
    CallSite {
        operation: Operation::AddChecklistItem,
        method: HttpMethod::Post,
        path: "/api/v3/tasks/{taskId}/checklist",
        required: &["task_id", "text"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: TASK_NOT_FOUND,
    },
    CallSite {
        operation: Operation::UpdateChecklistItem,
        method: HttpMethod::Put,
        path: "/api/v3/tasks/{taskId}/checklist/{itemId}",
        required: &["task_id", "item_id", "updates"],
        choices: &[],
        response: ResponseShape::Unwrap,
        not_found: Some("Checklist item not found."),
    },
];

impl Operation {
    pub const ALL: [Operation; 15] = [
        Operation::UserLogin,
        Operation::GetUserProfile,
        Operation::GetGroups,
        Operation::ExportUserData,
        Operation::CreateTag,
        Operation::ListTags,
        Operation::CastSkill,
        Operation::CreateTask,
        Operation::GetTask,
        Operation::ListTasks,
        Operation::UpdateTask,
        Operation::DeleteTask,
        Operation::ScoreTask,
        Operation::AddChecklistItem,
        Operation::UpdateChecklistItem,
    ];

    /// The tool name a host framework calls this operation by.
    pub fn name(self) -> &'static str {
        match self {
            Operation::UserLogin => "user_login",
            Operation::GetUserProfile => "get_user_profile",
            Operation::GetGroups => "get_groups",
            Operation::ExportUserData => "export_user_data",
            Operation::CreateTag => "create_tag",
            Operation::ListTags => "list_tags",
            Operation::CastSkill => "cast_skill",
            Operation::CreateTask => "create_task",
            Operation::GetTask => "get_task",
            Operation::ListTasks => "list_tasks",
            Operation::UpdateTask => "update_task",
            Operation::DeleteTask => "delete_task",
            Operation::ScoreTask => "score_task",
            Operation::AddChecklistItem => "add_checklist_item",
            Operation::UpdateChecklistItem => "update_checklist_item",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| ValidationError::UnknownOperation(name.to_string()))
    }

    pub fn call_site(self) -> &'static CallSite {
        // The table holds exactly one row per variant, in `ALL` order.
        &CALL_SITES[self as usize]
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated request parts, ready to be rendered into an `HttpRequest`.
#[derive(Debug, Default)]
pub struct Prepared {
    pub path_params: Vec<(&'static str, String)>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl CallSite {
    /// Machine-readable summary for hosts that register tools from the table.
    pub fn describe(&self) -> Value {
        let choices: Map<String, Value> = self
            .choices
            .iter()
            .map(|c| (c.field.to_string(), Value::from(c.allowed.to_vec())))
            .collect();
        serde_json::json!({
            "name": self.operation.name(),
            "method": self.method.as_str(),
            "path": self.path,
            "required": self.required,
            "choices": choices,
        })
    }

    /// Run the table-driven checks, then the operation-specific ones.
    pub fn prepare(&self, args: &Args<'_>) -> Result<Prepared, ValidationError> {
        for field in self.required {
            if !args.contains(field) {
                return Err(ValidationError::missing(field));
            }
        }
        for choice in self.choices {
            check_choice(args, choice)?;
        }
        prepare_operation(self.operation, args)
    }

    /// Substitute `{name}` segments in one pass over the template, so a value
    /// is never itself scanned for placeholders.
    pub fn render_path(&self, params: &[(&'static str, String)]) -> Result<String, ValidationError> {
        for (name, value) in params {
            check_segment(name, value)?;
        }
        let mut path = String::with_capacity(self.path.len());
        let mut rest = self.path;
        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let Some(close) = rest[open..].find('}') else {
                path.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let name = &rest[open + 1..open + close];
            let value = params
                .iter()
                .find(|(param, _)| *param == name)
                .map(|(_, value)| value)
                .ok_or_else(|| ValidationError::Constraint(format!("Path parameter '{name}' is not set.")))?;
            path.push_str(value);
            rest = &rest[open + close + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }
}

/// Path values are used verbatim, so only RFC 3986 unreserved characters are
/// accepted and dot segments are refused.
fn check_segment(name: &str, value: &str) -> Result<(), ValidationError> {
    let unreserved = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'));
    if !unreserved || value == "." || value == ".." {
        return Err(ValidationError::Constraint(format!(
            "Path parameter '{name}' may only contain letters, digits, '-', '_', '.' and '~'."
        )));
    }
    Ok(())
}

fn check_choice(args: &Args<'_>, choice: &Choice) -> Result<(), ValidationError> {
    if choice.multi {
        if let Some(values) = args.str_set(choice.field)? {
            for value in values {
                one_of(choice.field, value, choice.allowed)?;
            }
        }
        return Ok(());
    }
    if let Some(value) = args.optional_str(choice.field)? {
        one_of(choice.field, value, choice.allowed)?;
    }
    Ok(())
}

fn prepare_operation(op: Operation, args: &Args<'_>) -> Result<Prepared, ValidationError> {
    let mut prepared = Prepared::default();
    match op {
        Operation::UserLogin => {
            let username = args.required_str("username")?;
            let password = args.required_str("password")?;
            prepared.body = Some(serde_json::json!({ "username": username, "password": password }));
        }
        Operation::GetUserProfile => {
            if let Some(fields) = args.optional_str("user_fields")? {
                prepared.query.push(("userFields".to_string(), fields.to_string()));
            }
        }
        Operation::GetGroups => {
            let types = args.str_set("type")?.unwrap_or_default();
            let paginate = args.optional_bool("paginate")?.unwrap_or(false);
            let page = args.optional_index("page")?;
            if paginate && !types.contains(&"publicGuilds") {
                return Err(ValidationError::Constraint(
                    "Pagination is only supported when 'publicGuilds' is among the requested group types."
                        .to_string(),
                ));
            }
            if page.is_some() && !paginate {
                return Err(ValidationError::Constraint(
                    "Field 'page' requires 'paginate' to be true.".to_string(),
                ));
            }
            prepared.query.push(("type".to_string(), types.join(",")));
            if paginate {
                prepared.query.push(("paginate".to_string(), "true".to_string()));
            }
            if let Some(page) = page {
                prepared.query.push(("page".to_string(), page.to_string()));
            }
        }
        Operation::ExportUserData => {
            let format = args.optional_str("format")?.unwrap_or("json");
            prepared.path_params.push(("format", format.to_string()));
        }
        Operation::CreateTag => {
            let name = args.required_str("name")?;
            prepared.body = Some(serde_json::json!({ "name": name }));
        }
        Operation::ListTags => {}
        Operation::CastSkill => {
            let spell = args.required_str("spell_id")?;
            prepared.path_params.push(("spellId", spell.to_string()));
            if let Some(target) = args.optional_str("target_id")? {
                prepared.query.push(("targetId".to_string(), target.to_string()));
            }
        }
        Operation::CreateTask => {
            args.required_str("text")?;
            args.optional_str("notes")?;
            let tags = args.optional_str_list("tags")?.unwrap_or_default();

            let mut body: Map<String, Value> = args
                .entries()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            body.insert("tags".to_string(), Value::from(with_default_tag(&tags)));
            prepared.body = Some(Value::Object(body));
        }
        Operation::GetTask | Operation::DeleteTask => {
            prepared.path_params.push(("taskId", args.required_str("task_id")?.to_string()));
        }
        Operation::ListTasks => {
            if let Some(filter) = args.optional_str("type")? {
                prepared.query.push(("type".to_string(), filter.to_string()));
            }
        }
        Operation::UpdateTask => {
            prepared.path_params.push(("taskId", args.required_str("task_id")?.to_string()));
            prepared.body = Some(Value::Object(args.required_map("updates")?.clone()));
        }
        Operation::ScoreTask => {
            prepared.path_params.push(("taskId", args.required_str("task_id")?.to_string()));
            prepared.path_params.push(("direction", args.required_str("direction")?.to_string()));
        }
        Operation::AddChecklistItem => {
            prepared.path_params.push(("taskId", args.required_str("task_id")?.to_string()));
            let mut body = Map::new();
            body.insert("text".to_string(), Value::from(args.required_str("text")?));
            if let Some(completed) = args.optional_bool("completed")? {
                body.insert("completed".to_string(), Value::from(completed));
            }
            prepared.body = Some(Value::Object(body));
        }
        Operation::UpdateChecklistItem => {
            prepared.path_params.push(("taskId", args.required_str("task_id")?.to_string()));
            prepared.path_params.push(("itemId", args.required_str("item_id")?.to_string()));
            prepared.body = Some(Value::Object(args.required_map("updates")?.clone()));
        }
    }
    Ok(prepared)
}

/// `tags` plus `DEFAULT_TAG_ID` at the end, unless it is already present.
pub fn with_default_tag(tags: &[&str]) -> Vec<String> {
    let mut out: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
    if !tags.contains(&DEFAULT_TAG_ID) {
        out.push(DEFAULT_TAG_ID.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn prepare(op: Operation, value: Value) -> Result<Prepared, ValidationError> {
        let args = Args::new(&value)?;
        op.call_site().prepare(&args)
    }

    #[test]
    fn table_rows_line_up_with_variants() {
        for op in Operation::ALL {
            assert_eq!(op.call_site().operation, op, "{op}");
        }
        assert_eq!(CALL_SITES.len(), Operation::ALL.len());
    }

    #[test]
    fn names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_name(op.name()).unwrap(), op);
        }
        assert!(matches!(
            Operation::from_name("delete_everything"),
            Err(ValidationError::UnknownOperation(_))
        ));
    }

    #[test]
    fn describe_lists_required_fields_and_choices() {
        let described = Operation::ScoreTask.call_site().describe();
        assert_eq!(described["name"], "score_task");
        assert_eq!(described["method"], "POST");
        assert_eq!(described["required"], json!(["task_id", "direction"]));
        assert_eq!(described["choices"]["direction"], json!(["up", "down"]));
    }

    #[test]
    fn there_are_twenty_spells() {
        assert_eq!(SPELLS.len(), 20);
    }

    #[test]
    fn default_tag_is_appended_once() {
        assert_eq!(with_default_tag(&[]), vec![DEFAULT_TAG_ID.to_string()]);
        assert_eq!(with_default_tag(&[DEFAULT_TAG_ID]), vec![DEFAULT_TAG_ID.to_string()]);
        assert_eq!(
            with_default_tag(&["x", "y"]),
            vec!["x".to_string(), "y".to_string(), DEFAULT_TAG_ID.to_string()]
        );
        assert_eq!(
            with_default_tag(&[DEFAULT_TAG_ID, "x"]),
            vec![DEFAULT_TAG_ID.to_string(), "x".to_string()]
        );
    }

    #[test]
    fn create_task_passes_extra_fields_through() {
        let prepared = prepare(
            Operation::CreateTask,
            json!({"text": "Read", "type": "todo", "priority": 2, "date": null}),
        )
        .unwrap();
        let body = prepared.body.unwrap();
        assert_eq!(body["priority"], 2);
        assert!(body.get("date").is_none());
        assert_eq!(body["tags"], json!([DEFAULT_TAG_ID]));
    }

    #[test]
    fn create_and_list_use_their_own_vocabularies() {
        assert!(prepare(Operation::CreateTask, json!({"text": "x", "type": "todo"})).is_ok());
        assert!(prepare(Operation::CreateTask, json!({"text": "x", "type": "todos"})).is_err());
        assert!(prepare(Operation::ListTasks, json!({"type": "todos"})).is_ok());
        assert!(prepare(Operation::ListTasks, json!({"type": "todo"})).is_err());
    }

    #[test]
    fn every_group_type_is_accepted() {
        for group_type in GROUP_TYPES {
            assert!(prepare(Operation::GetGroups, json!({ "type": group_type })).is_ok(), "{group_type}");
        }
    }

    #[test]
    fn pagination_requires_public_guilds() {
        let err = prepare(Operation::GetGroups, json!({"type": "party,guilds", "paginate": true})).unwrap_err();
        assert!(matches!(err, ValidationError::Constraint(_)));

        let ok = prepare(
            Operation::GetGroups,
            json!({"type": ["party", "publicGuilds"], "paginate": true, "page": 2}),
        )
        .unwrap();
        assert_eq!(
            ok.query,
            vec![
                ("type".to_string(), "party,publicGuilds".to_string()),
                ("paginate".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn page_without_paginate_is_rejected() {
        let err = prepare(Operation::GetGroups, json!({"type": "publicGuilds", "page": 1})).unwrap_err();
        assert!(matches!(err, ValidationError::Constraint(_)));
    }

    #[test]
    fn paths_are_rendered() {
        let site = Operation::UpdateChecklistItem.call_site();
        let path = site
            .render_path(&[("taskId", "t-1".to_string()), ("itemId", "i-9".to_string())])
            .unwrap();
        assert_eq!(path, "/api/v3/tasks/t-1/checklist/i-9");
    }

    #[test]
    fn path_params_cannot_escape_their_segment() {
        let site = Operation::GetTask.call_site();
        for value in ["../user", "a?b", "a#b", "..", "."] {
            assert!(site.render_path(&[("taskId", value.to_string())]).is_err(), "{value}");
        }
    }

    #[test]
    fn path_params_are_not_expanded_twice() {
        let site = Operation::UpdateChecklistItem.call_site();
        let err = site
            .render_path(&[("taskId", "{itemId}".to_string()), ("itemId", "other".to_string())])
            .unwrap_err();
        assert!(matches!(err, ValidationError::Constraint(_)));
    }

    #[test]
    fn path_params_outside_unreserved_set_are_rejected() {
        let site = Operation::GetTask.call_site();
        for value in ["has space", "caf\u{e9}", "100%", "a+b"] {
            let err = site.render_path(&[("taskId", value.to_string())]).unwrap_err();
            assert_eq!(
                err.to_string(),
                "Path parameter 'taskId' may only contain letters, digits, '-', '_', '.' and '~'."
            );
        }
        let ok = site.render_path(&[("taskId", "a1_b.c~d-e".to_string())]).unwrap();
        assert_eq!(ok, "/api/v3/tasks/a1_b.c~d-e");
    }

    #[test]
    fn export_defaults_to_json() {
        let prepared = prepare(Operation::ExportUserData, Value::Null).unwrap();
        assert_eq!(prepared.path_params, vec![("format", "json".to_string())]);
        assert!(prepare(Operation::ExportUserData, json!({"format": "csv"})).is_err());
    }

    #[test]
    fn checklist_item_body_keeps_completed_flag() {
        let prepared = prepare(
            Operation::AddChecklistItem,
            json!({"task_id": "t-1", "text": "step", "completed": true}),
        )
        .unwrap();
        assert_eq!(prepared.body.unwrap(), json!({"text": "step", "completed": true}));
    }
}

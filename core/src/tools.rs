//! Tool-call facade: one generic adapter plus a thin method per operation.
//!
//! `call` is the only place that performs I/O. It never panics and never
//! returns an error; every outcome is an `Envelope`. Each failed call emits
//! exactly one log line carrying the operation name.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, error, warn};

use crate::client::HabiticaClient;
use crate::config::HabiticaConfig;
use crate::envelope::Envelope;
use crate::error::{ApiError, ConfigError};
use crate::http::{Transport, UreqTransport};
use crate::operations::Operation;

#[derive(Clone)]
pub struct HabiticaTools {
    client: HabiticaClient,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for HabiticaTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HabiticaTools")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl HabiticaTools {
    /// Tools backed by the blocking `ureq` transport.
    pub fn new(config: HabiticaConfig) -> Self {
        Self::with_transport(config, Arc::new(UreqTransport))
    }

    /// Load credentials from `HABITICA_*` variables; fails fast if absent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(HabiticaConfig::from_env()?))
    }

    pub fn with_transport(config: HabiticaConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            client: HabiticaClient::new(config),
            transport,
        }
    }

    pub fn client(&self) -> &HabiticaClient {
        &self.client
    }

    /// Validate, dispatch once, normalize.
    pub fn call(&self, op: Operation, args: &Value) -> Envelope {
        let result = self.execute(op, args);
        if let Err(e) = &result {
            report_failure(op.name(), e);
        }
        result.into()
    }

    /// Dispatch by tool name, as a host framework does.
    pub fn call_by_name(&self, name: &str, args: &Value) -> Envelope {
        match Operation::from_name(name) {
            Ok(op) => self.call(op, args),
            Err(e) => failure(name, e.into()),
        }
    }

    fn execute(&self, op: Operation, args: &Value) -> Result<Value, ApiError> {
        let request = self.client.build(op, args)?;
        debug!(
            operation = op.name(),
            method = request.method.as_str(),
            url = %request.url,
            "dispatching habitica request"
        );
        let response = self.transport.execute(&request)?;
        debug!(operation = op.name(), status = response.status, "habitica response received");
        self.client.parse(op, response)
    }

    pub fn user_login(&self, args: &Value) -> Envelope {
        self.call(Operation::UserLogin, args)
    }

    pub fn get_user_profile(&self, args: &Value) -> Envelope {
        self.call(Operation::GetUserProfile, args)
    }

    pub fn get_groups(&self, args: &Value) -> Envelope {
        self.call(Operation::GetGroups, args)
    }

    pub fn export_user_data(&self, args: &Value) -> Envelope {
        self.call(Operation::ExportUserData, args)
    }

    pub fn create_tag(&self, args: &Value) -> Envelope {
        self.call(Operation::CreateTag, args)
    }

    pub fn list_tags(&self) -> Envelope {
        self.call(Operation::ListTags, &Value::Null)
    }

    pub fn cast_skill(&self, args: &Value) -> Envelope {
        self.call(Operation::CastSkill, args)
    }

    pub fn create_task(&self, args: &Value) -> Envelope {
        self.call(Operation::CreateTask, args)
    }

    pub fn get_task(&self, args: &Value) -> Envelope {
        self.call(Operation::GetTask, args)
    }

    pub fn list_tasks(&self, args: &Value) -> Envelope {
        self.call(Operation::ListTasks, args)
    }

    pub fn update_task(&self, args: &Value) -> Envelope {
        self.call(Operation::UpdateTask, args)
    }

    pub fn delete_task(&self, args: &Value) -> Envelope {
        self.call(Operation::DeleteTask, args)
    }

    pub fn score_task(&self, args: &Value) -> Envelope {
        self.call(Operation::ScoreTask, args)
    }

    pub fn add_checklist_item(&self, args: &Value) -> Envelope {
        self.call(Operation::AddChecklistItem, args)
    }

    pub fn update_checklist_item(&self, args: &Value) -> Envelope {
        self.call(Operation::UpdateChecklistItem, args)
    }
}

/// The one log line for a failed call: `warn` when the arguments were
/// rejected, `error` for everything after validation.
pub fn report_failure(operation: &str, error: &ApiError) {
    if error.is_validation() {
        warn!(operation, error = %error, "habitica tool call rejected");
    } else {
        error!(operation, error = %error, "habitica tool call failed");
    }
}

/// Log `error` once and turn it into a failed envelope.
pub fn failure(operation: &str, error: ApiError) -> Envelope {
    report_failure(operation, &error);
    Envelope::err(error.to_string())
}

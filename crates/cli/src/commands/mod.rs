pub mod catalog;
pub mod config;
pub mod generate;
pub mod migrate;
pub mod seed;

use serde::Serialize;
use serde_json::Value;
use solquote_core::config::AppConfig;
use solquote_db::{connect_with_settings, migrations, DbPool};

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_details(command, message, None)
    }

    pub fn success_with_details(
        command: &str,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            details,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            details: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Partial result: some work succeeded, the details say what did not.
    pub fn partial(
        command: &str,
        message: impl Into<String>,
        details: Value,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "partial".to_string(),
            error_class: Some("partial_failure".to_string()),
            message: message.into(),
            details: Some(details),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Builds the current-thread runtime every command runs on.
pub(crate) fn runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Error class, message and exit code of a failed command step.
pub(crate) type StepError = (&'static str, String, u8);

/// Opens the configured database and applies pending migrations.
pub(crate) async fn open_database(config: &AppConfig) -> Result<DbPool, StepError> {
    let pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
    migrations::run_pending(&pool)
        .await
        .map_err(|error| ("migration", error.to_string(), 5u8))?;
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::CommandResult;

    fn parse(result: &CommandResult) -> Value {
        serde_json::from_str(&result.output).expect("json payload")
    }

    #[test]
    fn success_omits_details_when_absent() {
        let payload = parse(&CommandResult::success("migrate", "applied pending migrations"));

        assert_eq!(payload["status"], "ok");
        assert!(payload.get("details").is_none());
        assert!(payload["error_class"].is_null());
    }

    #[test]
    fn partial_keeps_details_and_exit_code() {
        let result = CommandResult::partial("generate", "1 of 2 offers", json!({"failures": 1}), 7);
        let payload = parse(&result);

        assert_eq!(result.exit_code, 7);
        assert_eq!(payload["status"], "partial");
        assert_eq!(payload["details"]["failures"], 1);
    }
}

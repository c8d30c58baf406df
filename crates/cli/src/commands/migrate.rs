use serde_json::json;
use solquote_core::config::{AppConfig, LoadOptions};
use solquote_db::migrations::MIGRATOR;

use crate::commands::{open_database, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "migrate",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        pool.close().await;
        Ok::<(), crate::commands::StepError>(())
    });

    match result {
        Ok(()) => {
            let versions: Vec<i64> = MIGRATOR.iter().map(|migration| migration.version).collect();
            CommandResult::success_with_details(
                "migrate",
                format!("schema up to date ({} migrations)", versions.len()),
                Some(json!({ "versions": versions })),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}

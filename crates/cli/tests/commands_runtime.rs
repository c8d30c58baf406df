use std::env;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use solquote_cli::commands::generate::{self, GenerateArgs};
use solquote_cli::commands::{catalog, migrate, seed};

const JOB: &str = r#"{
    "project": {
        "customer": {
            "salutation": "Frau",
            "first_name": "Lena",
            "last_name": "Hoffmann",
            "street": "Lindenweg 4",
            "postal_code": "86199",
            "city": "Augsburg"
        },
        "project_details": {
            "module_quantity": 20,
            "annual_consumption_kwh": "5200",
            "electricity_price_eur_per_kwh": "0.34"
        }
    },
    "settings": {
        "module_id": 101,
        "inverter_id": 201,
        "storage_id": 301,
        "module_quantity": 20,
        "pdf": {
            "financing_details": true,
            "include_selected_product_datasheets": true
        }
    },
    "company_ids": [1, 2, 3]
}"#;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("SOLQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_rejects_non_sqlite_url() {
    with_env(&[("SOLQUOTE_DATABASE_URL", "postgres://localhost/solquote")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_reports_demo_catalog_counts() {
    with_env(
        &[("SOLQUOTE_DATABASE_URL", "sqlite::memory:"), ("SOLQUOTE_DATABASE_MAX_CONNECTIONS", "1")],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected seed success: {}", result.output);

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["details"]["products"], 9);
            assert_eq!(payload["details"]["companies"], 3);
        },
    );
}

#[test]
fn seed_then_catalog_share_a_file_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = sqlite_url(dir.path());

    with_env(&[("SOLQUOTE_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);
        assert_eq!(seed::run().exit_code, 0, "seeding twice must succeed");

        let result = catalog::run();
        assert_eq!(result.exit_code, 0, "{}", result.output);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["details"]["products"]["module"].as_array().map(Vec::len), Some(4));
        assert_eq!(payload["details"]["companies"][0]["is_default"], true);
    });
}

#[test]
fn generate_writes_one_offer_per_company() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = sqlite_url(dir.path());
    let job_path = dir.path().join("job.json");
    std::fs::write(&job_path, JOB).expect("write job");
    let output_dir = dir.path().join("out");

    with_env(
        &[
            ("SOLQUOTE_DATABASE_URL", url.as_str()),
            ("SOLQUOTE_OUTPUT_DIR", output_dir.to_str().expect("utf8 path")),
        ],
        || {
            assert_eq!(seed::run().exit_code, 0);

            let args = GenerateArgs { job: job_path.clone(), output: None, charts_dir: None };
            let result = generate::run(args);
            assert_eq!(result.exit_code, 0, "{}", result.output);

            let payload = parse_payload(&result.output);
            let offers = payload["details"]["offers"].as_array().expect("offers");
            assert_eq!(offers.len(), 3);
            assert_eq!(offers[0]["company_name"], "Sonnenwerk Energietechnik GmbH");

            let archive = payload["details"]["archive"].as_str().expect("archive path");
            assert!(Path::new(archive).starts_with(&output_dir));
            assert!(std::fs::metadata(archive).expect("archive written").len() > 0);

            let summaries = payload["details"]["pdf_summaries"].as_array().expect("summaries");
            assert_eq!(summaries.len(), 3);
        },
    );
}

#[test]
fn generate_rejects_unknown_companies() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = sqlite_url(dir.path());
    let job_path = dir.path().join("job.json");
    std::fs::write(&job_path, r#"{"company_ids": [1, 42]}"#).expect("write job");

    with_env(&[("SOLQUOTE_DATABASE_URL", url.as_str())], || {
        assert_eq!(seed::run().exit_code, 0);

        let args = GenerateArgs { job: job_path.clone(), output: None, charts_dir: None };
        let result = generate::run(args);
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "domain_validation");
        assert!(payload["message"].as_str().unwrap_or("").contains("42"));
    });
}

#[test]
fn generate_reports_unreadable_job_file() {
    with_env(&[("SOLQUOTE_DATABASE_URL", "sqlite::memory:")], || {
        let result = generate::run(GenerateArgs {
            job: "/nonexistent/solquote-job.json".into(),
            output: None,
            charts_dir: None,
        });
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "generate");
        assert_eq!(payload["error_class"], "job_input");
    });
}

fn sqlite_url(dir: &Path) -> String {
    format!("sqlite://{}?mode=rwc", dir.join("solquote.db").display())
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid json")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "SOLQUOTE_DATABASE_URL",
        "SOLQUOTE_DATABASE_MAX_CONNECTIONS",
        "SOLQUOTE_DATABASE_TIMEOUT_SECS",
        "SOLQUOTE_DATASHEET_DIR",
        "SOLQUOTE_COMPANY_DOCS_BASE_DIR",
        "COMPANY_DOCS_BASE_DIR",
        "SOLQUOTE_OUTPUT_DIR",
        "SOLQUOTE_FINANCING_INTEREST_RATE_PERCENT",
        "SOLQUOTE_FINANCING_CREDIT_TERM_MONTHS",
        "SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE",
        "SOLQUOTE_PDF_CHART_LAYOUT",
        "SOLQUOTE_LOGGING_LEVEL",
        "SOLQUOTE_LOGGING_FORMAT",
        "SOLQUOTE_LOG_LEVEL",
        "SOLQUOTE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}

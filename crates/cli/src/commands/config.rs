use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use solquote_core::config::{AppConfig, LoadOptions};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field> {
    vec![
        Field {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["SOLQUOTE_DATABASE_URL"],
        },
        Field {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["SOLQUOTE_DATABASE_MAX_CONNECTIONS"],
        },
        Field {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["SOLQUOTE_DATABASE_TIMEOUT_SECS"],
        },
        Field {
            key: "paths.datasheet_dir",
            value: config.paths.datasheet_dir.display().to_string(),
            env_keys: &["SOLQUOTE_DATASHEET_DIR"],
        },
        Field {
            key: "paths.company_docs_base_dir",
            value: config.paths.company_docs_base_dir.display().to_string(),
            env_keys: &["SOLQUOTE_COMPANY_DOCS_BASE_DIR", "COMPANY_DOCS_BASE_DIR"],
        },
        Field {
            key: "paths.output_dir",
            value: config.paths.output_dir.display().to_string(),
            env_keys: &["SOLQUOTE_OUTPUT_DIR"],
        },
        Field {
            key: "financing.interest_rate_percent",
            value: config.financing.interest_rate_percent.to_string(),
            env_keys: &["SOLQUOTE_FINANCING_INTEREST_RATE_PERCENT"],
        },
        Field {
            key: "financing.credit_term_months",
            value: config.financing.credit_term_months.to_string(),
            env_keys: &["SOLQUOTE_FINANCING_CREDIT_TERM_MONTHS"],
        },
        Field {
            key: "financing.leasing_factor_percent",
            value: config.financing.leasing_factor_percent.to_string(),
            env_keys: &[],
        },
        Field {
            key: "financing.leasing_term_months",
            value: config.financing.leasing_term_months.to_string(),
            env_keys: &[],
        },
        Field {
            key: "financing.residual_value_percent",
            value: config.financing.residual_value_percent.to_string(),
            env_keys: &[],
        },
        Field {
            key: "pdf.chart_cache_max_size",
            value: config.pdf.chart_cache_max_size.to_string(),
            env_keys: &["SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE"],
        },
        Field {
            key: "pdf.default_chart_layout",
            value: format!("{:?}", config.pdf.default_chart_layout),
            env_keys: &["SOLQUOTE_PDF_CHART_LAYOUT"],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["SOLQUOTE_LOGGING_LEVEL", "SOLQUOTE_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["SOLQUOTE_LOGGING_FORMAT", "SOLQUOTE_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("solquote.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/solquote.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

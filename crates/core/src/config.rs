use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::settings::ChartLayout;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub paths: PathsConfig,
    pub financing: FinancingConfig,
    pub pdf: PdfConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct PathsConfig {
    pub datasheet_dir: PathBuf,
    pub company_docs_base_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Defaults for the financing pages. Rates are annual percentages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancingConfig {
    pub interest_rate_percent: Decimal,
    pub credit_term_months: u32,
    pub leasing_factor_percent: Decimal,
    pub leasing_term_months: u32,
    pub residual_value_percent: Decimal,
}

#[derive(Clone, Debug)]
pub struct PdfConfig {
    pub chart_cache_max_size: usize,
    pub default_chart_layout: ChartLayout,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub datasheet_dir: Option<PathBuf>,
    pub company_docs_base_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub chart_cache_max_size: Option<usize>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            interest_rate_percent: Decimal::new(45, 1),
            credit_term_months: 180,
            leasing_factor_percent: Decimal::new(12, 1),
            leasing_term_months: 120,
            residual_value_percent: Decimal::new(10, 0),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://solquote.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            paths: PathsConfig {
                datasheet_dir: PathBuf::from("data/product_datasheets"),
                company_docs_base_dir: PathBuf::from("data/company_docs"),
                output_dir: PathBuf::from("output"),
            },
            financing: FinancingConfig::default(),
            pdf: PdfConfig { chart_cache_max_size: 100, default_chart_layout: ChartLayout::OnePerPage },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("solquote.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(paths) = patch.paths {
            if let Some(datasheet_dir) = paths.datasheet_dir {
                self.paths.datasheet_dir = datasheet_dir;
            }
            if let Some(company_docs_base_dir) = paths.company_docs_base_dir {
                self.paths.company_docs_base_dir = company_docs_base_dir;
            }
            if let Some(output_dir) = paths.output_dir {
                self.paths.output_dir = output_dir;
            }
        }

        if let Some(financing) = patch.financing {
            if let Some(rate) = financing.interest_rate_percent {
                self.financing.interest_rate_percent = rate;
            }
            if let Some(term) = financing.credit_term_months {
                self.financing.credit_term_months = term;
            }
            if let Some(factor) = financing.leasing_factor_percent {
                self.financing.leasing_factor_percent = factor;
            }
            if let Some(term) = financing.leasing_term_months {
                self.financing.leasing_term_months = term;
            }
            if let Some(residual) = financing.residual_value_percent {
                self.financing.residual_value_percent = residual;
            }
        }

        if let Some(pdf) = patch.pdf {
            if let Some(size) = pdf.chart_cache_max_size {
                self.pdf.chart_cache_max_size = size;
            }
            if let Some(layout) = pdf.default_chart_layout {
                self.pdf.default_chart_layout = layout;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SOLQUOTE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("SOLQUOTE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("SOLQUOTE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("SOLQUOTE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SOLQUOTE_DATASHEET_DIR") {
            self.paths.datasheet_dir = PathBuf::from(value);
        }
        let docs_dir =
            read_env("SOLQUOTE_COMPANY_DOCS_BASE_DIR").or_else(|| read_env("COMPANY_DOCS_BASE_DIR"));
        if let Some(value) = docs_dir {
            self.paths.company_docs_base_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("SOLQUOTE_OUTPUT_DIR") {
            self.paths.output_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("SOLQUOTE_FINANCING_INTEREST_RATE_PERCENT") {
            self.financing.interest_rate_percent =
                parse_decimal("SOLQUOTE_FINANCING_INTEREST_RATE_PERCENT", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_FINANCING_CREDIT_TERM_MONTHS") {
            self.financing.credit_term_months =
                parse_u32("SOLQUOTE_FINANCING_CREDIT_TERM_MONTHS", &value)?;
        }

        if let Some(value) = read_env("SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE") {
            self.pdf.chart_cache_max_size =
                parse_usize("SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE", &value)?;
        }
        if let Some(value) = read_env("SOLQUOTE_PDF_CHART_LAYOUT") {
            self.pdf.default_chart_layout =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SOLQUOTE_PDF_CHART_LAYOUT".to_string(),
                    value: value.clone(),
                })?;
        }

        let log_level =
            read_env("SOLQUOTE_LOGGING_LEVEL").or_else(|| read_env("SOLQUOTE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SOLQUOTE_LOGGING_FORMAT").or_else(|| read_env("SOLQUOTE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(datasheet_dir) = overrides.datasheet_dir {
            self.paths.datasheet_dir = datasheet_dir;
        }
        if let Some(company_docs_base_dir) = overrides.company_docs_base_dir {
            self.paths.company_docs_base_dir = company_docs_base_dir;
        }
        if let Some(output_dir) = overrides.output_dir {
            self.paths.output_dir = output_dir;
        }
        if let Some(size) = overrides.chart_cache_max_size {
            self.pdf.chart_cache_max_size = size;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_financing(&self.financing)?;
        validate_pdf(&self.pdf)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("solquote.toml"), PathBuf::from("config/solquote.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_financing(financing: &FinancingConfig) -> Result<(), ConfigError> {
    if financing.interest_rate_percent.is_sign_negative()
        || financing.interest_rate_percent > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::Validation(
            "financing.interest_rate_percent must be in range 0..=100".to_string(),
        ));
    }
    if financing.leasing_factor_percent.is_sign_negative() {
        return Err(ConfigError::Validation(
            "financing.leasing_factor_percent must not be negative".to_string(),
        ));
    }
    if financing.residual_value_percent.is_sign_negative()
        || financing.residual_value_percent > Decimal::ONE_HUNDRED
    {
        return Err(ConfigError::Validation(
            "financing.residual_value_percent must be in range 0..=100".to_string(),
        ));
    }
    if financing.credit_term_months > 600 || financing.leasing_term_months > 600 {
        return Err(ConfigError::Validation(
            "financing term months must not exceed 600 (50 years)".to_string(),
        ));
    }
    Ok(())
}

fn validate_pdf(pdf: &PdfConfig) -> Result<(), ConfigError> {
    if pdf.chart_cache_max_size == 0 {
        return Err(ConfigError::Validation(
            "pdf.chart_cache_max_size must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_decimal(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.trim().parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    paths: Option<PathsPatch>,
    financing: Option<FinancingPatch>,
    pdf: Option<PdfPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct PathsPatch {
    datasheet_dir: Option<PathBuf>,
    company_docs_base_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FinancingPatch {
    interest_rate_percent: Option<Decimal>,
    credit_term_months: Option<u32>,
    leasing_factor_percent: Option<Decimal>,
    leasing_term_months: Option<u32>,
    residual_value_percent: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct PdfPatch {
    chart_cache_max_size: Option<usize>,
    default_chart_layout: Option<ChartLayout>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::domain::settings::ChartLayout;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid_without_any_file() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.pdf.chart_cache_max_size == 100, "chart cache defaults to 100 entries")?;
        ensure(
            config.paths.datasheet_dir == PathBuf::from("data/product_datasheets"),
            "datasheets default to data/product_datasheets",
        )?;
        ensure(
            matches!(config.logging.format, LogFormat::Compact),
            "default logging format should be compact",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_SOLQUOTE_DOCS", "/srv/company-docs");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("solquote.toml");
            fs::write(
                &path,
                r#"
[paths]
company_docs_base_dir = "${TEST_SOLQUOTE_DOCS}"

[financing]
interest_rate_percent = "3.9"
credit_term_months = 120

[pdf]
default_chart_layout = "two_per_page"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.paths.company_docs_base_dir == PathBuf::from("/srv/company-docs"),
                "docs dir should be interpolated from environment",
            )?;
            ensure(
                config.financing.interest_rate_percent == Decimal::new(39, 1),
                "interest rate should come from file",
            )?;
            ensure(config.financing.credit_term_months == 120, "credit term should come from file")?;
            ensure(
                config.pdf.default_chart_layout == ChartLayout::TwoPerPage,
                "chart layout should come from file",
            )
        })();

        clear_vars(&["TEST_SOLQUOTE_DOCS"]);
        result
    }

    #[test]
    fn legacy_company_docs_env_var_is_honoured() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMPANY_DOCS_BASE_DIR", "/legacy/docs");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.paths.company_docs_base_dir == PathBuf::from("/legacy/docs"),
                "legacy env var should set the company docs dir",
            )
        })();

        clear_vars(&["COMPANY_DOCS_BASE_DIR"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SOLQUOTE_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("SOLQUOTE_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("solquote.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[logging]
level = "warn"
format = "pretty"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-env.db",
                "env database url should win over file",
            )?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "env log format should win")
        })();

        clear_vars(&["SOLQUOTE_DATABASE_URL", "SOLQUOTE_LOG_FORMAT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("postgres://elsewhere".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("database.url")
        );
        ensure(has_message, "validation failure should mention database.url")
    }

    #[test]
    fn invalid_numeric_env_override_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE", "lots");

        let result = (|| -> Result<(), String> {
            let outcome = AppConfig::load(LoadOptions::default());
            ensure(
                matches!(
                    outcome,
                    Err(ConfigError::InvalidEnvOverride { ref key, .. })
                        if key == "SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE"
                ),
                "non-numeric cache size should be rejected",
            )
        })();

        clear_vars(&["SOLQUOTE_PDF_CHART_CACHE_MAX_SIZE"]);
        result
    }

    #[test]
    fn usurious_interest_rate_is_rejected() -> Result<(), String> {
        let mut config = AppConfig::default();
        config.financing.interest_rate_percent = Decimal::new(200, 0);
        config.financing.credit_term_months = 600;

        ensure(
            matches!(
                config.validate(),
                Err(ConfigError::Validation(ref message)) if message.contains("interest_rate_percent")
            ),
            "interest above 100 % should fail validation",
        )?;

        config.financing.interest_rate_percent = Decimal::ONE_HUNDRED;
        ensure(config.validate().is_ok(), "100 % is the inclusive upper bound")
    }

}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use restock_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let entries: Vec<(&str, String, String)> = vec![
        (
            "database.url",
            config.database.url.clone(),
            source("database.url", &["RESTOCK_DATABASE_URL"]),
        ),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            source("database.max_connections", &["RESTOCK_DATABASE_MAX_CONNECTIONS"]),
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            source("database.timeout_secs", &["RESTOCK_DATABASE_TIMEOUT_SECS"]),
        ),
        (
            "recommender.alpha",
            config.recommender.alpha.to_string(),
            source("recommender.alpha", &["RESTOCK_RECOMMENDER_ALPHA"]),
        ),
        (
            "recommender.top_n",
            config.recommender.top_n.to_string(),
            source("recommender.top_n", &["RESTOCK_RECOMMENDER_TOP_N"]),
        ),
        (
            "recommender.replenishment_threshold",
            config.recommender.replenishment_threshold.to_string(),
            source(
                "recommender.replenishment_threshold",
                &["RESTOCK_RECOMMENDER_REPLENISHMENT_THRESHOLD"],
            ),
        ),
        (
            "recommender.replenishment_boost",
            config.recommender.replenishment_boost.to_string(),
            source("recommender.replenishment_boost", &["RESTOCK_RECOMMENDER_REPLENISHMENT_BOOST"]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["RESTOCK_LOGGING_LEVEL", "RESTOCK_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            source("logging.format", &["RESTOCK_LOGGING_FORMAT", "RESTOCK_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("restock.toml"), PathBuf::from("config/restock.toml")]
        .into_iter()
        .find(|path| path.exists())
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_attributed_to_the_file() {
        let doc: Value = "[recommender]\nalpha = 0.3\n".parse().expect("toml");

        assert!(contains_path(&doc, "recommender.alpha"));
        assert!(!contains_path(&doc, "recommender.top_n"));
        assert_eq!(
            field_source("recommender.alpha", &["RESTOCK_TEST_UNSET_KEY"], Some(&doc), None),
            "file (config file)"
        );
        assert_eq!(field_source("recommender.top_n", &[], Some(&doc), None), "default");
    }
}

use std::env;
use std::sync::{Mutex, OnceLock};

use restock_cli::commands::{evaluate, migrate, popular, recommend, replenish, seed};
use restock_db::DEFAULT_SEED;
use serde_json::Value;

const AS_OF: &str = "2024-07-01T00:00:00Z";

#[test]
fn migrate_returns_success_on_fresh_database() {
    with_database(&[], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn seed_reports_summary_and_is_repeatable() {
    with_database(&[], || {
        let first = seed::run(DEFAULT_SEED);
        assert_eq!(first.exit_code, 0, "expected seed success: {}", first.output);
        let second = seed::run(DEFAULT_SEED);
        assert_eq!(second.exit_code, 0, "expected reseed success: {}", second.output);

        let first = parse_payload(&first.output);
        let second = parse_payload(&second.output);
        assert_eq!(first["command"], "seed");
        assert_eq!(first["data"]["requesters"], 41);
        assert_eq!(first["data"], second["data"]);
    });
}

#[test]
fn recommend_after_seed_returns_collaborative_ranking() {
    with_database(&[], || {
        assert_eq!(seed::run(DEFAULT_SEED).exit_code, 0);

        let result = recommend::run(recommend::RecommendOptions {
            requester: 1,
            top_n: Some(5),
            alpha: Some(0.5),
            as_of: Some(AS_OF.to_string()),
            json: true,
        });
        assert_eq!(result.exit_code, 0, "expected recommend success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["strategy"], "collaborative");
        let items = payload["data"]["items"].as_array().expect("items array");
        assert!(!items.is_empty());
        assert!(items.len() <= 5);
        assert_eq!(items[0]["rank"], 1);
    });
}

#[test]
fn recommend_for_unknown_requester_falls_back_to_popularity() {
    with_database(&[], || {
        assert_eq!(seed::run(DEFAULT_SEED).exit_code, 0);

        let result = recommend::run(recommend::RecommendOptions {
            requester: 9_999,
            top_n: Some(3),
            as_of: Some(AS_OF.to_string()),
            json: true,
            ..Default::default()
        });
        assert_eq!(result.exit_code, 0, "expected fallback success: {}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["strategy"], "popularity");
        assert_eq!(payload["data"]["fallback_reason"], "unknown_requester");
        assert_eq!(payload["data"]["items"].as_array().map(Vec::len), Some(3));
    });
}

#[test]
fn recommend_rejects_out_of_range_alpha() {
    with_database(&[], || {
        let result = recommend::run(recommend::RecommendOptions {
            requester: 1,
            alpha: Some(1.5),
            json: true,
            ..Default::default()
        });
        assert_eq!(result.exit_code, 6, "expected invalid request exit code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_request");
    });
}

#[test]
fn recommend_rejects_malformed_as_of() {
    with_database(&[], || {
        let result = recommend::run(recommend::RecommendOptions {
            requester: 1,
            as_of: Some("yesterday".to_string()),
            json: true,
            ..Default::default()
        });
        assert_eq!(result.exit_code, 6);
        assert_eq!(parse_payload(&result.output)["error_class"], "invalid_request");
    });
}

#[test]
fn popular_and_replenish_succeed_after_seed() {
    with_database(&[], || {
        assert_eq!(seed::run(DEFAULT_SEED).exit_code, 0);

        let popular = popular::run(Some(4), true);
        assert_eq!(popular.exit_code, 0, "expected popular success: {}", popular.output);
        let items = parse_payload(&popular.output)["data"].clone();
        assert_eq!(items.as_array().map(Vec::len), Some(4));

        let replenish = replenish::run(1, Some(AS_OF.to_string()), true);
        assert_eq!(replenish.exit_code, 0, "expected replenish success: {}", replenish.output);
        assert_eq!(parse_payload(&replenish.output)["command"], "replenish");
    });
}

#[test]
fn evaluate_after_seed_reports_metrics() {
    with_database(&[], || {
        assert_eq!(seed::run(DEFAULT_SEED).exit_code, 0);

        let result = evaluate::run(Some(10), Some(0.5), Some(AS_OF.to_string()), true);
        assert_eq!(result.exit_code, 0, "expected evaluate success: {}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert!(data["evaluated_requesters"].as_u64().unwrap_or_default() > 0);
        let f1 = data["f1"]["mean"].as_f64().expect("f1 mean");
        assert!((0.0..=1.0).contains(&f1));
    });
}

#[test]
fn evaluate_on_empty_database_reports_insufficient_data() {
    with_database(&[], || {
        let result = evaluate::run(None, None, None, true);
        assert_eq!(result.exit_code, 9);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "insufficient_data");
    });
}

#[test]
fn invalid_config_returns_config_failure() {
    with_database(&[("RESTOCK_RECOMMENDER_ALPHA", "2")], || {
        let result = popular::run(None, true);
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "popular");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn doctor_json_reports_pass_after_migrate() {
    with_database(&[], || {
        assert_eq!(migrate::run().exit_code, 0);

        let payload = parse_payload(&restock_cli::commands::doctor::run(true));
        assert_eq!(payload["overall_status"], "pass");
        let names: Vec<&str> = payload["checks"]
            .as_array()
            .expect("checks array")
            .iter()
            .filter_map(|check| check["name"].as_str())
            .collect();
        assert_eq!(names, ["config_validation", "database_connectivity", "schema_readiness"]);
    });
}

#[test]
fn doctor_flags_unmigrated_schema() {
    with_database(&[], || {
        let payload = parse_payload(&restock_cli::commands::doctor::run(true));
        assert_eq!(payload["overall_status"], "fail");
        assert_eq!(payload["checks"][2]["status"], "fail");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

/// Runs `test_fn` against a fresh on-disk database with the RESTOCK_* environment cleared.
fn with_database(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}", dir.path().join("restock.db").display());

    let mut all_vars = vec![("RESTOCK_DATABASE_URL", url.as_str())];
    all_vars.extend_from_slice(vars);
    with_env(&all_vars, test_fn);
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "RESTOCK_DATABASE_URL",
        "RESTOCK_DATABASE_MAX_CONNECTIONS",
        "RESTOCK_DATABASE_TIMEOUT_SECS",
        "RESTOCK_RECOMMENDER_ALPHA",
        "RESTOCK_RECOMMENDER_TOP_N",
        "RESTOCK_RECOMMENDER_REPLENISHMENT_THRESHOLD",
        "RESTOCK_RECOMMENDER_REPLENISHMENT_BOOST",
        "RESTOCK_LOGGING_LEVEL",
        "RESTOCK_LOGGING_FORMAT",
        "RESTOCK_LOG_LEVEL",
        "RESTOCK_LOG_FORMAT",
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

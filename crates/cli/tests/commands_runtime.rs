use std::env;
use std::sync::{Mutex, OnceLock};

use serde_json::Value;
use tripdesk_cli::commands::{migrate, seed, smoke};

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 0, "expected successful migrate run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "migrate");
            assert_eq!(payload["status"], "ok");
        },
    );
}

#[test]
fn migrate_returns_config_failure_with_invalid_pool_size() {
    with_env(&[("TRIPDESK_DATABASE_MAX_CONNECTIONS", "0")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_returns_lifecycle_checkpoint_summary() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = seed::run();
            assert_eq!(result.exit_code, 0, "expected successful seed run");

            let payload = parse_payload(&result.output);
            assert_eq!(payload["command"], "seed");
            assert_eq!(payload["status"], "ok");

            let message = payload["message"].as_str().unwrap_or("");
            let pending_line =
                "  - req-pending-001: Pending Review (Fresh request awaiting department review)";
            let reservations_line =
                "  - req-reservations-001: Pending Reservations (Approved request assigned to the travel agency)";
            assert!(message.contains(pending_line));
            assert!(message.contains(reservations_line));
        },
    );
}

#[test]
fn seed_is_idempotent_across_runs() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let first = seed::run();
            assert_eq!(first.exit_code, 0, "expected first seed invocation success");
            let first_payload = parse_payload(&first.output);
            assert_eq!(first_payload["command"], "seed");
            assert_eq!(first_payload["status"], "ok");

            let second = seed::run();
            assert_eq!(second.exit_code, 0, "expected second seed invocation success");
            let second_payload = parse_payload(&second.output);
            assert_eq!(second_payload["command"], "seed");
            assert_eq!(second_payload["status"], "ok");

            assert_eq!(first_payload["message"], second_payload["message"]);
        },
    );
}

#[test]
fn smoke_returns_success_report_with_valid_env() {
    with_env(
        &[
            ("TRIPDESK_DATABASE_URL", "sqlite::memory:"),
            ("TRIPDESK_DATABASE_MAX_CONNECTIONS", "1"),
        ],
        || {
            let result = smoke::run();
            assert_eq!(result.exit_code, 0, "expected successful smoke report");

            let payload = parse_payload(last_line(&result.output));
            assert_eq!(payload["command"], "smoke");
            assert_eq!(payload["status"], "pass");
        },
    );
}

#[test]
fn smoke_returns_failure_when_config_invalid() {
    with_env(&[("TRIPDESK_DATABASE_MAX_CONNECTIONS", "0")], || {
        let result = smoke::run();
        assert_eq!(result.exit_code, 6, "expected smoke failure code");

        let payload = parse_payload(last_line(&result.output));
        assert_eq!(payload["command"], "smoke");
        assert_eq!(payload["status"], "fail");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn last_line(output: &str) -> &str {
    output.lines().last().unwrap_or_default()
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "TRIPDESK_DATABASE_URL",
        "TRIPDESK_DATABASE_MAX_CONNECTIONS",
        "TRIPDESK_DATABASE_TIMEOUT_SECS",
        "TRIPDESK_SMTP_HOST",
        "TRIPDESK_SMTP_PORT",
        "TRIPDESK_SMTP_USERNAME",
        "TRIPDESK_SMTP_PASSWORD",
        "TRIPDESK_LOG_LEVEL",
        "TRIPDESK_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, previous) in previous_values {
        match previous {
            Some(value) => env::set_var(key, value),
            None => env::remove_var(key),
        }
    }
}

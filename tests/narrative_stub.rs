// tests/narrative_stub.rs
//
// Factory behavior of the narrative client under different env/config
// combinations. Runs serially because AI_TEST_MODE is process-global.

use std::env;

use serial_test::serial;

use catalog_insights::availability::Unavailable;
use catalog_insights::narrative::{build_client_from_config, NarrativeConfig};

/// Small RAII helper to snapshot & restore env vars in each test.
struct EnvSnapshot {
    saved: Vec<(String, Option<String>)>,
}
impl EnvSnapshot {
    /// Provide a list of (KEY, Some(VALUE)) to set, or (KEY, None) to remove.
    fn set(pairs: &[(&str, Option<&str>)]) -> Self {
        let mut saved = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            let key = k.to_string();
            let prev = env::var(k).ok();
            saved.push((key.clone(), prev));
            match v {
                Some(val) => env::set_var(&key, val),
                None => env::remove_var(&key),
            }
        }
        Self { saved }
    }
}
impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (k, maybe_v) in self.saved.drain(..) {
            match maybe_v {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}

fn disabled_config() -> NarrativeConfig {
    NarrativeConfig {
        enabled: false,
        provider: None,
        daily_limit: Some(5),
        model: None,
    }
}

#[tokio::test]
#[serial]
async fn mock_mode_overrides_disabled_config() {
    let _env = EnvSnapshot::set(&[("AI_TEST_MODE", Some("mock"))]);

    let client = build_client_from_config(&disabled_config());
    assert_eq!(client.provider_name(), "mock");

    let narrative = client
        .narrate("What are the top genres?", "{\"topGenres\":[]}")
        .await
        .expect("mock narration succeeds");
    assert!(!narrative.text.is_empty());
}

#[tokio::test]
#[serial]
async fn disabled_config_reports_disabled() {
    let _env = EnvSnapshot::set(&[("AI_TEST_MODE", None)]);

    let client = build_client_from_config(&disabled_config());
    assert_eq!(client.provider_name(), "disabled");

    let err = client
        .narrate("What are the top genres?", "{}")
        .await
        .expect_err("disabled client cannot narrate");
    assert!(matches!(err, Unavailable::Disabled));
}

#[tokio::test]
#[serial]
async fn unknown_provider_falls_back_to_disabled() {
    let _env = EnvSnapshot::set(&[("AI_TEST_MODE", None)]);

    let config = NarrativeConfig {
        enabled: true,
        provider: Some("acme-llm".to_string()),
        daily_limit: None,
        model: None,
    };
    let client = build_client_from_config(&config);
    assert_eq!(client.provider_name(), "disabled");
}

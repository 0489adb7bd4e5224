//! Tests for layered settings loading

use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;

use morphaug::application::ApplicationError;
use morphaug::config::{local_config_path, OpKind, Settings};
use morphaug::domain::WeightingStrategy;

/// Tests in this binary share the process environment.
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Holds the env lock and removes the variables it set when dropped.
struct EnvGuard {
    keys: Vec<&'static str>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    fn set(vars: &[(&'static str, &str)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (key, value) in vars {
            std::env::set_var(key, value);
        }
        Self {
            keys: vars.iter().map(|(k, _)| *k).collect(),
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn given_local_config_when_loading_then_overrides_defaults() {
    // Arrange
    let _env = EnvGuard::set(&[]);
    let temp = TempDir::new().unwrap();
    std::fs::write(
        local_config_path(temp.path()),
        r#"
seed = 11
views = 4
pipeline = ["drop", "rotate"]

[point]
max_shift = 3.0

[drop]
fraction = 0.05
weighting = { kind = "uniform" }
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.seed, Some(11));
    assert_eq!(settings.views, 4);
    assert_eq!(settings.pipeline, vec![OpKind::Drop, OpKind::Rotate]);
    assert_eq!(settings.point.max_shift, 3.0);
    assert_eq!(settings.drop.fraction, 0.05);
    assert_eq!(settings.drop.weighting, WeightingStrategy::Uniform);
    assert_eq!(settings.pipeline().to_string(), "drop -> rotate");
}

#[test]
fn given_malformed_local_config_when_loading_then_config_error() {
    let _env = EnvGuard::set(&[]);
    let temp = TempDir::new().unwrap();
    std::fs::write(local_config_path(temp.path()), "views = \"many\"\n").unwrap();

    let err = Settings::load(Some(temp.path())).unwrap_err();

    assert!(err.to_string().contains("config error"), "got {err}");
}

#[test]
fn given_unknown_operator_in_config_when_loading_then_rejected() {
    let _env = EnvGuard::set(&[]);
    let temp = TempDir::new().unwrap();
    std::fs::write(local_config_path(temp.path()), "pipeline = [\"twist\"]\n").unwrap();

    assert!(Settings::load(Some(temp.path())).is_err());
}

#[test]
fn given_template_when_written_as_local_config_then_loads() {
    let _env = EnvGuard::set(&[]);
    let temp = TempDir::new().unwrap();
    std::fs::write(local_config_path(temp.path()), Settings::template()).unwrap();

    let settings = Settings::load(Some(temp.path())).unwrap();

    assert!(settings.validate().is_ok());
}

#[test]
fn given_env_overrides_when_loading_then_env_beats_local_file() {
    // Arrange
    let _env = EnvGuard::set(&[
        ("MORPHAUG_DROP__FRACTION", "0.3"),
        ("MORPHAUG_POINT__MAX_SHIFT", "0.5"),
        ("MORPHAUG_PIPELINE", "rotate,point"),
        ("MORPHAUG_SEED", "7"),
    ]);
    let temp = TempDir::new().unwrap();
    std::fs::write(
        local_config_path(temp.path()),
        r#"
seed = 11
views = 4
pipeline = ["drop"]

[point]
max_shift = 3.0

[drop]
fraction = 0.05
"#,
    )
    .unwrap();

    // Act
    let settings = Settings::load(Some(temp.path())).unwrap();

    // Assert
    assert_eq!(settings.seed, Some(7));
    assert_eq!(settings.views, 4);
    assert_eq!(settings.pipeline, vec![OpKind::Rotate, OpKind::Point]);
    assert_eq!(settings.point.max_shift, 0.5);
    assert_eq!(settings.drop.fraction, 0.3);
}

#[test]
fn given_unparseable_env_value_when_loading_then_config_error_names_variable() {
    let _env = EnvGuard::set(&[("MORPHAUG_VIEWS", "many")]);
    let temp = TempDir::new().unwrap();

    let err = Settings::load(Some(temp.path())).unwrap_err();

    match err {
        ApplicationError::Config { message } => {
            assert!(message.contains("views=many"), "got {message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

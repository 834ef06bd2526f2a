use super::*;
use std::sync::Mutex;

// std::env is process-global; serialize the tests that touch it.
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn state_dir_honors_explicit_override() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::set_var("TALOND_STATE_DIR", "/tmp/talond-test-state");
    let dir = state_dir().unwrap();
    std::env::remove_var("TALOND_STATE_DIR");
    assert_eq!(dir, PathBuf::from("/tmp/talond-test-state"));
}

#[test]
fn config_path_defaults_under_state_dir() {
    let _guard = ENV_LOCK.lock().unwrap();
    std::env::remove_var("TALOND_CONFIG");
    std::env::set_var("TALOND_STATE_DIR", "/tmp/talond-test-state2");
    let path = config_path().unwrap();
    std::env::remove_var("TALOND_STATE_DIR");
    assert_eq!(path, PathBuf::from("/tmp/talond-test-state2/talond.toml"));
}

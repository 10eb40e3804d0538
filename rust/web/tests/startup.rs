use letterbox_web::server::{ServerError, WebServer};
use letterbox_web::settings::{ServerSettings, SettingsError, SettingsOverrides};
use std::collections::HashMap;
use std::process::Command;

#[test]
fn binary_exits_1_without_a_database() {
    let output = Command::new(env!("CARGO_BIN_EXE_letterbox-server"))
        .env_clear()
        .output()
        .expect("run letterbox-server");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("LETTERBOX_DATABASE"), "stderr: {stderr}");
}

#[test]
fn binary_rejects_a_bad_origin() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = Command::new(env!("CARGO_BIN_EXE_letterbox-server"))
        .env_clear()
        .arg("--database")
        .arg(dir.path().join("games.db"))
        .arg("--allowed-origin")
        .arg("not-an-origin")
        .output()
        .expect("run letterbox-server");

    assert_eq!(output.status.code(), Some(1));
}

#[tokio::test]
async fn configured_server_starts_and_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let env: HashMap<String, String> = [
        ("LETTERBOX_DATABASE", dir.path().join("games.db").display().to_string()),
        ("LETTERBOX_HOST", "127.0.0.1".to_string()),
        ("LETTERBOX_PORT", "0".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let settings =
        ServerSettings::resolve(&env, &SettingsOverrides::default()).expect("valid settings");
    let handle = WebServer::from_settings(&settings)
        .expect("open store")
        .start()
        .await
        .expect("start server");

    assert!(handle.address().ip().is_loopback());
    assert!(dir.path().join("games.db").exists());
    handle.shutdown().await.expect("clean shutdown");
}

#[test]
fn settings_without_database_do_not_build_a_server() {
    let err = ServerSettings::resolve(&HashMap::new(), &SettingsOverrides::default())
        .expect_err("database is required");
    assert!(matches!(err, SettingsError::MissingDatabase));

    assert!(matches!(
        WebServer::from_settings(&ServerSettings::default()),
        Err(ServerError::Settings(SettingsError::MissingDatabase))
    ));
}

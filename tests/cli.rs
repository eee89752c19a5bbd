use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn component() -> Command {
    let mut cmd = Command::cargo_bin("velocitas-components").expect("Binary exists");
    for var in [
        "VELOCITAS_WORKSPACE_DIR",
        "VELOCITAS_CACHE_DIR",
        "VELOCITAS_PACKAGE_DIR",
        "VELOCITAS_APP_MANIFEST",
        "VELOCITAS_CACHE_DATA",
        "language",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn help_lists_every_component() {
    component()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("sdk-install")
                .and(predicate::str::contains("grpc-interface"))
                .and(predicate::str::contains("download-vspec"))
                .and(predicate::str::contains("install-deps")),
        );
}

#[test]
fn download_vspec_prints_cache_entries_for_a_local_file() {
    let workspace = tempdir().unwrap();
    let cache = tempdir().unwrap();
    fs::create_dir_all(workspace.path().join("app")).unwrap();
    fs::write(workspace.path().join("app/vspec.json"), "{}").unwrap();
    let expected = format!(
        "vspec_file_path='{}' >> VELOCITAS_CACHE",
        workspace.path().join("app/vspec.json").display()
    );

    component()
        .arg("download-vspec")
        .current_dir(workspace.path())
        .env("VELOCITAS_WORKSPACE_DIR", workspace.path())
        .env("VELOCITAS_CACHE_DIR", cache.path())
        .env("VELOCITAS_PACKAGE_DIR", workspace.path())
        .env(
            "VELOCITAS_APP_MANIFEST",
            r#"{"vehicleModel": {"src": "./app/vspec.json"}}"#,
        )
        .assert()
        .success()
        .stdout(
            predicate::str::contains(expected)
                .and(predicate::str::contains("unit_file_path_list=")),
        );
}

#[test]
fn generate_model_without_specification_succeeds() {
    let workspace = tempdir().unwrap();

    component()
        .arg("generate-model")
        .current_dir(workspace.path())
        .env("VELOCITAS_WORKSPACE_DIR", workspace.path())
        .env("VELOCITAS_CACHE_DATA", "{}")
        .assert()
        .success();
}

#[test]
fn invalid_cross_target_fails_with_logged_error() {
    let workspace = tempdir().unwrap();

    component()
        .args(["install-deps", "-x", "mips"])
        .current_dir(workspace.path())
        .env("VELOCITAS_WORKSPACE_DIR", workspace.path())
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("Component failed")
                .and(predicate::str::contains("unsupported architecture: mips")),
        );
}

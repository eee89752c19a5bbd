use std::fs;

use tempfile::tempdir;
use velocitas_components::conanfile::{
    add_dependency_to_conanfile, build_info_paths, required_version_in_workspace, Conanfile,
};

fn add(text: &str, name: &str, version: &str) -> String {
    let mut file = Conanfile::parse(text);
    file.add_requirement(name, version);
    file.render()
}

#[test]
fn replaces_an_older_version_in_place() {
    let before = "[requires]\ngrpc/1.50.1\nvehicle-app-sdk/0.3.0\n\n[generators]\ncmake\n";
    let after = add(before, "vehicle-app-sdk", "0.4.0");
    assert_eq!(
        after,
        "[requires]\ngrpc/1.50.1\nvehicle-app-sdk/0.4.0\n\n[generators]\ncmake\n"
    );
}

#[test]
fn inserts_after_last_requirement_keeping_blank_separator() {
    let before = "[requires]\ngrpc/1.50.1\n\n[generators]\ncmake\n";
    let after = add(before, "seats-service-sdk", "generated");
    assert_eq!(
        after,
        "[requires]\ngrpc/1.50.1\nseats-service-sdk/generated\n\n[generators]\ncmake\n"
    );
}

#[test]
fn replaces_requirement_in_a_later_requires_section() {
    let before = "[requires]\na/1\n[generators]\ncmake\n[requires]\nmydep/old\n";
    let after = add(before, "mydep", "myver");
    assert_eq!(
        after,
        "[requires]\na/1\n[generators]\ncmake\n[requires]\nmydep/myver\n"
    );
    assert_eq!(after.matches("mydep/").count(), 1);
}

#[test]
fn appends_requires_section_when_missing() {
    assert_eq!(
        add("[generators]\ncmake", "seats-service-sdk", "generated"),
        "[generators]\ncmake\n[requires]\nseats-service-sdk/generated\n"
    );
}

#[test]
fn collapses_duplicate_requirements() {
    let before = "[requires]\nseats-service-sdk/old\ngrpc/1.50.1\nseats-service-sdk/older\n";
    assert_eq!(
        add(before, "seats-service-sdk", "generated"),
        "[requires]\nseats-service-sdk/generated\ngrpc/1.50.1\n"
    );
}

#[test]
fn adding_twice_is_idempotent() {
    let before = "[requires]\ngrpc/1.50.1\n\n[options]\ngrpc:shared=True\n";
    let once = add(before, "seats-service-sdk", "generated");
    let twice = add(&once, "seats-service-sdk", "generated");
    assert_eq!(once, twice);
    assert_eq!(once.matches("seats-service-sdk").count(), 1);
    assert!(once.ends_with("\n\n[options]\ngrpc:shared=True\n"));
}

#[test]
fn other_sections_are_left_untouched() {
    let before = "# comment\n[requires]\r\ngrpc/1.50.1\r\n\n[options]\nseats-service-sdk:shared=True\n";
    let after = add(before, "seats-service-sdk", "generated");
    assert!(after.starts_with("# comment\n[requires]\r\ngrpc/1.50.1\r\nseats-service-sdk/generated\n"));
    assert!(after.ends_with("[options]\nseats-service-sdk:shared=True\n"));
}

#[test]
fn required_version_strips_user_channel_and_revision() {
    let file = Conanfile::parse("[requires]\nvehicle-app-sdk/0.4.3@user/stable#rev\n");
    assert_eq!(file.required_version("vehicle-app-sdk").as_deref(), Some("0.4.3"));
    assert_eq!(file.required_version("grpc"), None);
}

#[test]
fn workspace_conanfile_is_updated_on_disk() {
    let workspace = tempdir().expect("tempdir");
    let path = workspace.path().join("conanfile.txt");
    fs::write(&path, "[requires]\nvehicle-app-sdk/0.4.3\n").unwrap();

    add_dependency_to_conanfile(workspace.path(), "seats-service-sdk", "generated").unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "[requires]\nvehicle-app-sdk/0.4.3\nseats-service-sdk/generated\n"
    );
    assert_eq!(
        required_version_in_workspace(workspace.path(), "vehicle-app-sdk")
            .unwrap()
            .as_deref(),
        Some("0.4.3")
    );
}

#[test]
fn missing_workspace_conanfile_is_an_error() {
    let workspace = tempdir().expect("tempdir");
    assert!(add_dependency_to_conanfile(workspace.path(), "a", "1").is_err());
}

#[test]
fn build_info_path_lists_are_concatenated() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("conanbuildinfo.txt"),
        "[includedirs]\n/x/include\n\nPATH=[\"/c/protobuf/bin\"]\nPATH=[\"/c/grpc/bin\", \"/c/cares/bin\"]\n",
    )
    .unwrap();

    assert_eq!(
        build_info_paths(dir.path()).unwrap(),
        vec!["/c/protobuf/bin", "/c/grpc/bin", "/c/cares/bin"]
    );
}

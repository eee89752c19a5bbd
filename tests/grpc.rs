use std::fs;
use std::path::{Path, PathBuf};

use mockall::Sequence;
use serde_json::json;
use tempfile::{tempdir, TempDir};
use velocitas_components::config::VelocitasEnv;
use velocitas_components::contract::{MockCommandRunner, MockFetcher};
use velocitas_components::grpc::cpp::{move_generated_sources, tooling_requirements};
use velocitas_components::grpc::{
    generate_all, resolve_proto, CppGeneratorFactory, GeneratorFactory, GrpcInterfaceConfig,
};
use velocitas_components::process::ToolCommand;
use velocitas_components::proto::ProtoFile;
use velocitas_components::templates::CPP_TEMPLATES;
use velocitas_components::Error;

const SEATS_PROTO: &str = "syntax = \"proto3\";\n\npackage sdv.edge.comfort.seats.v1;\n\nservice Seats {\n    rpc Move(MoveRequest) returns (MoveReply);\n}\n";

struct Project {
    workspace: TempDir,
    cache: TempDir,
}

impl Project {
    fn new() -> Self {
        let project = Self {
            workspace: tempdir().unwrap(),
            cache: tempdir().unwrap(),
        };
        fs::create_dir_all(project.workspace.path().join("app/src")).unwrap();
        fs::write(project.workspace.path().join("app/seats.proto"), SEATS_PROTO).unwrap();
        project
    }

    fn env(&self, language: &str, manifest: serde_json::Value) -> VelocitasEnv {
        VelocitasEnv::from_vars([
            ("VELOCITAS_WORKSPACE_DIR", self.workspace.path().to_string_lossy().into_owned()),
            ("VELOCITAS_CACHE_DIR", self.cache.path().to_string_lossy().into_owned()),
            ("VELOCITAS_APP_MANIFEST", manifest.to_string()),
            ("language", language.to_string()),
        ])
    }

    fn sdk_dir(&self) -> PathBuf {
        self.cache.path().join("services").join("seats")
    }
}

fn seats_manifest() -> serde_json::Value {
    json!({
        "manifestVersion": "v3",
        "interfaces": [{
            "type": "grpc-interface",
            "config": {
                "src": "app/seats.proto",
                "required": { "methods": [{ "name": "Move" }] },
                "provided": {}
            }
        }]
    })
}

/// Value of the `--<name>=` argument of `cmd`.
fn out_dir(cmd: &ToolCommand, name: &str) -> PathBuf {
    let prefix = format!("--{name}=");
    cmd.args
        .iter()
        .find_map(|a| a.strip_prefix(&prefix))
        .map(PathBuf::from)
        .expect("output argument present")
}

#[test]
fn interface_config_flags_client_and_server() {
    let config = GrpcInterfaceConfig::from_value(&json!({
        "src": "seats.proto",
        "required": {},
        "includeDir": "protos"
    }))
    .unwrap();
    assert!(config.is_client());
    assert!(!config.is_server());
    assert_eq!(config.include_dir, Some(PathBuf::from("protos")));
}

#[tokio::test]
async fn local_proto_resolves_relative_to_workspace() {
    let project = Project::new();
    let env = project.env("python", seats_manifest());
    let mut fetcher = MockFetcher::new();
    fetcher.expect_download().never();

    let proto = resolve_proto(&env, &fetcher, "app/seats.proto").await.unwrap();
    assert_eq!(proto.path(), project.workspace.path().join("app/seats.proto"));

    let missing = resolve_proto(&env, &fetcher, "app/horn.proto").await;
    assert!(matches!(missing, Err(Error::FileNotFound(_))));
}

#[tokio::test]
async fn remote_proto_is_downloaded_into_cache() {
    let project = Project::new();
    let env = project.env("python", seats_manifest());
    let expected = project.cache.path().join("services").join("seats.proto");

    let mut fetcher = MockFetcher::new();
    fetcher
        .expect_download()
        .withf(move |uri: &str, path: &Path| {
            uri == "https://raw.githubusercontent.com/eclipse-kuksa/protos/seats.proto" && path == expected
        })
        .times(1)
        .returning(|_, path| {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, SEATS_PROTO).unwrap();
            Ok(())
        });

    let proto = resolve_proto(
        &env,
        &fetcher,
        "https://raw.githubusercontent.com/eclipse-kuksa/protos/seats.proto",
    )
    .await
    .unwrap();
    assert_eq!(proto.service_name().unwrap(), "Seats");
}

#[tokio::test]
async fn unsupported_language_generates_nothing() {
    let project = Project::new();
    let env = project.env("rust", seats_manifest());
    let mut runner = MockCommandRunner::new();
    runner.expect_run().never();

    generate_all(&env, &runner, &MockFetcher::new()).await.unwrap();
}

#[tokio::test]
async fn manifest_without_grpc_interfaces_generates_nothing() {
    let project = Project::new();
    let env = project.env("cpp", json!({ "manifestVersion": "v3", "interfaces": [] }));
    let mut runner = MockCommandRunner::new();
    runner.expect_run().never();

    generate_all(&env, &runner, &MockFetcher::new()).await.unwrap();
}

#[tokio::test]
async fn python_service_sdk_is_generated_and_installed() {
    let project = Project::new();
    fs::write(
        project.workspace.path().join("app/requirements.txt"),
        "velocitas-sdk==0.14.1\n",
    )
    .unwrap();
    let env = project.env("python", seats_manifest());
    let sdk_dir = project.sdk_dir();
    let install_dir = sdk_dir.to_string_lossy().into_owned();

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| cmd.has_arg("grpcio-tools"))
        .times(1)
        .returning(|_| Ok(()));
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| cmd.has_arg("grpc_tools.protoc"))
        .times(1)
        .returning(|cmd| {
            let out = out_dir(cmd, "python_out");
            fs::write(out.join("seats_pb2.py"), "# messages\n").unwrap();
            fs::write(out.join("seats_pb2.pyi"), "# stubs\n").unwrap();
            fs::write(out.join("seats_pb2_grpc.py"), "import seats_pb2 as seats__pb2\n").unwrap();
            Ok(())
        });
    runner
        .expect_run()
        .withf(move |cmd: &ToolCommand| cmd.words() == ["python3", "-m", "pip", "install", install_dir.as_str()])
        .times(1)
        .returning(|_| Ok(()));

    generate_all(&env, &runner, &MockFetcher::new()).await.unwrap();

    let module = sdk_dir.join("seats_service_sdk");
    for file in [
        "__init__.py",
        "seats_pb2.py",
        "seats_pb2.pyi",
        "SeatsServiceClientFactory.py",
        "SeatsServiceServerFactory.py",
    ] {
        assert!(module.join(file).is_file(), "{file} missing");
    }
    assert_eq!(
        fs::read_to_string(module.join("seats_pb2_grpc.py")).unwrap(),
        "import seats_service_sdk.seats_pb2 as seats__pb2\n"
    );
    let pyproject = fs::read_to_string(sdk_dir.join("pyproject.toml")).unwrap();
    assert!(pyproject.contains("velocitas-sdk==0.14.1"));
    assert!(pyproject.contains("name = \"seats_service_sdk\""));

    let service_impl = project.workspace.path().join("app/src/seats_service_impl.py");
    assert!(fs::read_to_string(service_impl)
        .unwrap()
        .contains("class SeatsService(SeatsServicer)"));
}

#[test]
fn tooling_is_pinned_to_the_recipe_versions() {
    let recipe = CPP_TEMPLATES.get("conanfile.py").unwrap();
    let (grpc, cares) = tooling_requirements(recipe).unwrap();
    assert_eq!(grpc, "grpc/1.67.1");
    assert_eq!(cares.as_deref(), Some("c-ares/1.19.1"));

    assert!(matches!(
        tooling_requirements("requires = [\"protobuf/5.27.0\"]"),
        Err(Error::MissingRequirement(_))
    ));
}

#[test]
fn generated_sources_are_split_into_include_and_src() {
    let dir = tempdir().unwrap();
    for file in ["seats.pb.h", "seats.pb.cc", "seats.grpc.pb.h", "seats.grpc.pb.cc"] {
        fs::write(dir.path().join(file), "").unwrap();
    }

    let (headers, sources) =
        move_generated_sources(dir.path(), dir.path(), "include/services/seats", "src/services/seats").unwrap();

    assert_eq!(
        headers,
        ["include/services/seats/seats.grpc.pb.h", "include/services/seats/seats.pb.h"]
    );
    assert_eq!(
        sources,
        ["src/services/seats/seats.grpc.pb.cc", "src/services/seats/seats.pb.cc"]
    );
    assert!(dir.path().join("src/services/seats/seats.pb.cc").is_file());
    assert!(!dir.path().join("seats.pb.cc").exists());
}

fn fake_tool_dir() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("protoc"), "").unwrap();
    fs::write(dir.path().join("grpc_cpp_plugin"), "").unwrap();
    dir
}

#[test]
fn cpp_service_sdk_is_generated_as_conan_package() {
    let project = Project::new();
    fs::write(
        project.workspace.path().join("conanfile.txt"),
        "[requires]\nvehicle-app-sdk/0.4.3\n\n[generators]\nCMakeDeps\n",
    )
    .unwrap();
    let env = project.env("cpp", seats_manifest());
    let tools = fake_tool_dir();
    let sdk_dir = project.sdk_dir();
    fs::create_dir_all(&sdk_dir).unwrap();

    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| cmd.program.ends_with("protoc"))
        .times(1)
        .returning(|cmd| {
            assert!(cmd.args[0].starts_with("--plugin=protoc-gen-grpc="));
            let out = out_dir(cmd, "cpp_out");
            for file in ["seats.pb.h", "seats.pb.cc", "seats.grpc.pb.h", "seats.grpc.pb.cc"] {
                fs::write(out.join(file), "// generated\n").unwrap();
            }
            Ok(())
        });
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| cmd.words() == ["conan", "export", "."])
        .times(1)
        .returning(|_| Ok(()));

    let factory = CppGeneratorFactory::new(&runner, &env).with_tool_dirs(vec![tools.path().to_path_buf()]);
    let proto = ProtoFile::open(project.workspace.path().join("app/seats.proto")).unwrap();
    let generator = factory
        .create_service_generator(&sdk_dir, &proto, &proto.parent_dir())
        .unwrap();

    generator.generate_package(true, true).unwrap();
    generator.install_package().unwrap();
    generator.update_package_references().unwrap();
    generator.update_auto_generated_code().unwrap();

    assert!(sdk_dir.join("include/services/seats/seats.grpc.pb.h").is_file());
    assert!(sdk_dir.join("src/services/seats/SeatsServiceClientFactory.cc").is_file());
    assert!(sdk_dir.join("include/services/seats/SeatsServiceServerFactory.h").is_file());

    let recipe = fs::read_to_string(sdk_dir.join("conanfile.py")).unwrap();
    assert!(recipe.contains("\"vehicle-app-sdk/0.4.3\""));
    assert!(recipe.contains("name = \"seats-service-sdk\""));
    let cmake = fs::read_to_string(sdk_dir.join("CMakeLists.txt")).unwrap();
    assert!(cmake.contains("src/services/seats/seats.grpc.pb.cc"));
    assert!(!cmake.contains("${{"));

    assert_eq!(
        fs::read_to_string(project.workspace.path().join("conanfile.txt")).unwrap(),
        "[requires]\nvehicle-app-sdk/0.4.3\nseats-service-sdk/generated\n\n[generators]\nCMakeDeps\n"
    );
    assert!(project
        .workspace
        .path()
        .join("app/src/SeatsServiceImpl.cpp")
        .is_file());
}

#[test]
fn cpp_tooling_comes_from_conan_and_is_found_through_build_info() {
    let project = Project::new();
    fs::write(
        project.workspace.path().join("conanfile.txt"),
        "[requires]\nvehicle-app-sdk/0.4.3\n",
    )
    .unwrap();
    let env = project.env("cpp", seats_manifest());
    let tools = fake_tool_dir();
    let tool_bin = tools.path().to_path_buf();
    let expected_protoc = tool_bin.join("protoc");
    let sdk_dir = project.sdk_dir();
    fs::create_dir_all(&sdk_dir).unwrap();

    let mut seq = Sequence::new();
    let mut runner = MockCommandRunner::new();
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| {
            cmd.words() == ["conan", "profile", "new", "host", "--detect", "--force"]
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| {
            cmd.words()
                == [
                    "conan",
                    "profile",
                    "update",
                    "settings.compiler.libcxx=libstdc++11",
                    "host",
                ]
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    runner
        .expect_run()
        .withf(|cmd: &ToolCommand| cmd.program == "conan" && cmd.has_arg("install"))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |cmd| {
            assert_eq!(&cmd.args[..5], ["install", "-pr:h", "host", "--build", "missing"]);
            assert!(cmd
                .env
                .contains(&("CONAN_REVISIONS_ENABLED".to_string(), "1".to_string())));
            let tooling_conanfile = PathBuf::from(cmd.args.last().unwrap());
            assert_eq!(
                fs::read_to_string(tooling_conanfile).unwrap(),
                "[requires]\ngrpc/1.67.1\nc-ares/1.19.1\n"
            );
            let cwd = cmd.cwd.clone().unwrap();
            fs::write(
                cwd.join("conanbuildinfo.txt"),
                format!("[bindirs]\nPATH=[\"{}\"]\n", tool_bin.display()),
            )
            .unwrap();
            Ok(())
        });
    runner
        .expect_run()
        .withf(move |cmd: &ToolCommand| Path::new(&cmd.program) == expected_protoc)
        .times(1)
        .in_sequence(&mut seq)
        .returning(|cmd| {
            assert!(cmd.args[0].ends_with("grpc_cpp_plugin"));
            Ok(())
        });

    let mut factory = CppGeneratorFactory::new(&runner, &env);
    factory.install_tooling().unwrap();

    let proto = ProtoFile::open(project.workspace.path().join("app/seats.proto")).unwrap();
    let generator = factory
        .create_service_generator(&sdk_dir, &proto, &proto.parent_dir())
        .unwrap();
    generator.generate_package(true, false).unwrap();
    assert!(sdk_dir.join("conanfile.py").is_file());
}

#[test]
fn existing_service_implementation_is_kept() {
    let project = Project::new();
    let impl_header = project.workspace.path().join("app/src/SeatsServiceImpl.h");
    fs::write(&impl_header, "// hand written\n").unwrap();
    let env = project.env("cpp", seats_manifest());
    let runner = MockCommandRunner::new();

    let factory = CppGeneratorFactory::new(&runner, &env);
    let proto = ProtoFile::open(project.workspace.path().join("app/seats.proto")).unwrap();
    let generator = factory
        .create_service_generator(&project.sdk_dir(), &proto, &proto.parent_dir())
        .unwrap();
    generator.update_auto_generated_code().unwrap();

    assert_eq!(fs::read_to_string(&impl_header).unwrap(), "// hand written\n");
    assert!(project
        .workspace
        .path()
        .join("app/src/SeatsServiceImpl.cpp")
        .is_file());
}

#[test]
fn cpp_package_needs_core_sdk_requirement() {
    let project = Project::new();
    fs::write(project.workspace.path().join("conanfile.txt"), "[requires]\n").unwrap();
    let env = project.env("cpp", seats_manifest());
    let tools = fake_tool_dir();
    let sdk_dir = project.sdk_dir();
    fs::create_dir_all(&sdk_dir).unwrap();

    let mut runner = MockCommandRunner::new();
    runner.expect_run().returning(|_| Ok(()));

    let factory = CppGeneratorFactory::new(&runner, &env).with_tool_dirs(vec![tools.path().to_path_buf()]);
    let proto = ProtoFile::open(project.workspace.path().join("app/seats.proto")).unwrap();
    let generator = factory
        .create_service_generator(&sdk_dir, &proto, &proto.parent_dir())
        .unwrap();

    assert!(matches!(
        generator.generate_package(true, false),
        Err(Error::MissingRequirement(name)) if name == "vehicle-app-sdk"
    ));
}

pub mod arch;
pub mod build_system;
pub mod cache;
pub mod cli;
pub mod conan_setup;
pub mod conanfile;
pub mod config;
pub mod contract;
pub mod download;
pub mod error;
pub mod grpc;
pub mod manifest;
pub mod process;
pub mod proto;
pub mod sdk_installer;
pub mod templates;
pub mod util;
pub mod variables;
pub mod vehicle_model;

pub use error::{Error, Result};

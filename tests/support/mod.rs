#![allow(dead_code)]

pub mod scripted;

/// Path of the shell script that stands in for a container runtime.
pub fn fake_runtime_script() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("support")
        .join("fake-runtime.sh")
}

/// `SMOKE_RUNTIME` value that runs the fake runtime through `sh`.
pub fn fake_runtime_command() -> String {
    format!("sh {}", fake_runtime_script().display())
}

//! Stamps `APP_VERSION` as `<crate version>[+<git sha>]`.

use std::process::Command;

fn git_sha() -> Option<String> {
    if let Ok(sha) = std::env::var("WALLWATCH_GIT_SHA") {
        let sha = sha.trim().to_string();
        return (!sha.is_empty()).then_some(sha);
    }
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!sha.is_empty()).then_some(sha)
}

fn main() {
    let version = match git_sha() {
        Some(sha) => format!("{}+{}", env!("CARGO_PKG_VERSION"), sha),
        None => env!("CARGO_PKG_VERSION").to_string(),
    };
    println!("cargo:rustc-env=APP_VERSION={}", version);

    println!("cargo:rerun-if-env-changed=WALLWATCH_GIT_SHA");
    println!("cargo:rerun-if-changed=.git/HEAD");
}

use std::process::Command;

fn git_output(args: &[&str]) -> String {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn main() {
    let branch = git_output(&["rev-parse", "--abbrev-ref", "HEAD"]);
    let commit = git_output(&["rev-parse", "--short", "HEAD"]);
    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| !o.stdout.is_empty())
        .unwrap_or(false);

    println!("cargo:rustc-env=GATEWAY_PROJECT_NAME={}", env!("CARGO_PKG_NAME"));
    println!("cargo:rustc-env=GATEWAY_VERSION={}", env!("CARGO_PKG_VERSION"));
    println!(
        "cargo:rustc-env=GATEWAY_BUILD_TIME={}",
        chrono::Utc::now().to_rfc3339()
    );
    println!("cargo:rustc-env=GATEWAY_GIT_BRANCH={branch}");
    println!("cargo:rustc-env=GATEWAY_GIT_COMMIT={commit}");
    println!(
        "cargo:rustc-env=GATEWAY_GIT_STATUS={}",
        if dirty { "dirty" } else { "clean" }
    );
    println!("cargo:rustc-env=GATEWAY_RUSTC_VERSION=rustc {}", rustc_version());
    println!("cargo:rustc-env=GATEWAY_CARGO_VERSION=cargo {}", env!("CARGO_PKG_VERSION"));
    println!(
        "cargo:rustc-env=GATEWAY_TARGET_TRIPLE={}",
        std::env::var("TARGET").unwrap_or_else(|_| "unknown".to_string())
    );
    println!(
        "cargo:rustc-env=GATEWAY_BUILD_MODE={}",
        std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string())
    );
    println!("cargo:rerun-if-changed=.git/HEAD");
}

fn rustc_version() -> String {
    Command::new(std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string()))
        .arg("--version")
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().trim_start_matches("rustc ").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");

    let git_hash = command_output("git", &["rev-parse", "--short", "HEAD"])
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| "unknown".to_string());
    emit("HASH", &git_hash);

    let git_status = match command_output("git", &["status", "--porcelain"]) {
        Some(changes) if !changes.is_empty() => "dirty",
        Some(_) => "clean",
        None => "unknown",
    };
    emit("STATUS", git_status);

    let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);
    emit("TIMESTAMP", &timestamp);

    let target = env::var("TARGET").unwrap_or_else(|_| "unknown-target".to_string());
    emit("TARGET", &target);

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown-profile".to_string());
    emit("PROFILE", &profile);

    let rustc = command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string());
    emit("RUSTC", &rustc);
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env=SUBFOX_BUILD_{key}={value}");
}

/// Trimmed stdout of a successful command. `git status --porcelain` on a
/// clean tree yields `Some("")`.
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|stdout| stdout.trim().to_string())
}

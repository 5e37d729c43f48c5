use std::env;
use std::process::Command;

/// Source tarballs have no .git; packagers set WRSYNC_BUILD_COMMIT instead.
fn commit() -> String {
    if let Ok(commit) = env::var("WRSYNC_BUILD_COMMIT") {
        return commit;
    }
    let out = match Command::new("git").args(["rev-parse", "--short=7", "HEAD"]).output() {
        Ok(out) if out.status.success() => out,
        _ => return "unknown".into(),
    };
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn main() {
    println!("cargo:rerun-if-env-changed=WRSYNC_BUILD_COMMIT");
    println!("cargo:rerun-if-changed=../../.git/HEAD");

    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit());
    println!("cargo:rustc-env=TARGET={}", env::var("TARGET").unwrap_or_default());
}

// SPDX-License-Identifier: GPL-3.0-only

use std::process::Command;

fn main() {
    println!("cargo::rerun-if-changed=.git/HEAD");
    println!("cargo::rerun-if-changed=.git/refs/tags");
    println!("cargo::rerun-if-env-changed=LABEL_CAPTURE_VERSION");

    // Packaged builds set the version explicitly
    let version = match std::env::var("LABEL_CAPTURE_VERSION") {
        Ok(v) if !v.is_empty() => v,
        _ => describe_version(),
    };

    println!("cargo::rustc-env=GIT_VERSION={}", version);
}

/// Build a version string from `git describe`
///
/// - exact tag `v0.1.0` becomes `0.1.0`
/// - `v0.1.0-5-gabcdef1` becomes `0.1.0-dev-abcdef1`
/// - no git metadata falls back to the crate version
fn describe_version() -> String {
    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".into());

    let output = Command::new("git")
        .args(["describe", "--tags", "--match", "v*"])
        .output();

    let described = match output {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => return pkg_version,
    };

    let described = described.strip_prefix('v').unwrap_or(&described);
    let parts: Vec<&str> = described.rsplitn(3, '-').collect();
    if parts.len() == 3 {
        let hash = parts[0].strip_prefix('g').unwrap_or(parts[0]);
        format!("{}-dev-{}", parts[2], hash)
    } else {
        described.to_string()
    }
}

use std::process::Command;

fn main() {
    // Prefer ORCASLICER_CLI_VERSION if set (release builds), otherwise
    // fall back to git describe for local development builds.
    if let Ok(version) = std::env::var("ORCASLICER_CLI_VERSION") {
        println!("cargo:rustc-env=ORCASLICER_CLI_VERSION={version}");
    } else if let Ok(output) = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        && output.status.success()
    {
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        println!("cargo:rustc-env=ORCASLICER_CLI_VERSION={version}");
    }

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");
    println!("cargo:rerun-if-env-changed=ORCASLICER_CLI_VERSION");
}

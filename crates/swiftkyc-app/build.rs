use std::fs;
use std::path::PathBuf;

fn main() {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("manifest dir"));
    let workspace_root = manifest_dir
        .ancestors()
        .nth(2)
        .expect("crate lives under <root>/crates/");
    let version_file = workspace_root.join("VERSION");
    println!("cargo:rerun-if-changed={}", version_file.display());

    let contents = fs::read_to_string(&version_file).expect("root VERSION file is readable");
    let version = contents.lines().next().unwrap_or_default().trim();
    assert!(!version.is_empty(), "root VERSION file is empty");

    println!("cargo:rustc-env=SWIFTKYC_VERSION={version}");
}

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::process::Command;

fn hash_file(path: &Path) -> String {
    let content = fs::read(path).unwrap_or_default();
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())[..8].to_string()
}

fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// `<commit time>-<hash>[+dirty]`, or nothing outside a git checkout.
fn git_revision() -> Option<String> {
    let hash = git(&["rev-parse", "HEAD"]).filter(|h| !h.is_empty())?;
    let time = git(&["log", "-1", "--format=%cI"]).unwrap_or_default();
    let dirty = git(&["status", "--porcelain"]).is_some_and(|s| !s.is_empty());

    Some(format!(
        "{}-{}{}",
        time,
        hash,
        if dirty { "+dirty" } else { "" }
    ))
}

fn main() {
    // Re-run build script if relevant files change
    println!("cargo:rerun-if-changed=static/css/main.css");
    println!("cargo:rerun-if-changed=templates/");
    println!("cargo:rerun-if-changed=.git/HEAD");

    // Hash static assets for cache busting
    let css_hash = hash_file(Path::new("static/css/main.css"));

    // Write generated code to OUT_DIR
    let out_dir = std::env::var("OUT_DIR").unwrap();
    fs::write(
        Path::new(&out_dir).join("asset_hashes.rs"),
        format!(
            r#"/// Hash of main.css for cache busting
pub const MAIN_CSS_HASH: &str = "{}";"#,
            css_hash
        ),
    )
    .unwrap();

    if let Some(revision) = git_revision() {
        println!("cargo:rustc-env=WEBSTART_BUILD_REVISION={}", revision);
    }
}

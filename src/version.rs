//! Version string shown in page footers and `/health/`.

/// Baked in by `build.rs` when the source tree is a git checkout.
const BUILD_REVISION: Option<&str> = option_env!("WEBSTART_BUILD_REVISION");

/// `GIT_REV` from the environment, else the build-time revision
/// (`<commit time>-<hash>[+dirty]`), else `unavailable`.
pub fn version() -> String {
    match std::env::var("GIT_REV") {
        Ok(rev) if !rev.is_empty() => rev,
        _ => BUILD_REVISION
            .filter(|rev| !rev.is_empty())
            .unwrap_or("unavailable")
            .to_string(),
    }
}

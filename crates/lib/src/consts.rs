//! Crate-wide constants.

/// Application name, used for platform directory names.
pub const APP_NAME: &str = "cish";

/// Length of truncated hashes used in namespace ids and store file names.
pub const HASH_PREFIX_LEN: usize = 16;

/// Namespace id of the root script of every build.
pub const ROOT_NAMESPACE: &str = "main";

/// Archive directory holding extension unit manifests.
pub const MANIFEST_DIR: &str = "META-INF/cish/";

/// File extensions recognised as extension packages.
pub const PACKAGE_EXTENSIONS: &[&str] = &["cxt", "zip", "jar"];

/// Default registry used to resolve `group:artifact:version` coordinates.
pub const DEFAULT_REGISTRY_URL: &str = "https://repo1.maven.org/maven2";

/// Maximum nesting of `require` declarations before the graph build gives up.
///
/// Scripts that require an ancestor recurse until this bound is hit.
pub const MAX_REQUIRE_DEPTH: usize = 64;

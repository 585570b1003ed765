//! Extension packages: discovery, manifests and resolution.
//!
//! An extension package is a zip archive (`.cxt`, `.zip` or `.jar`) holding
//! one JSON manifest per unit under `META-INF/cish/`. Units provide
//! capabilities that scripts import and declare the artifacts they need at
//! runtime.

pub mod manifest;
pub mod resolver;
pub mod scanner;
pub mod types;

pub use manifest::ManifestError;
pub use resolver::{ArtifactFailure, ArtifactList, Collision, CollisionPolicy, ExtensionResolver, ResolveError};
pub use scanner::ExtensionScanner;
pub use types::{DependencyDeclaration, DependencySource, ExtensionId, ExtensionPackage};

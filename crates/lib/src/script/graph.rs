//! Script dependency tree.
//!
//! A build starts from one root script. Every `require` target becomes a child
//! node, resolved against the directory of the requiring script, and is
//! expanded recursively. Nodes are stored in an arena in depth-first pre-order;
//! the root is always [`NodeId::ROOT`].
//!
//! # Namespaces
//!
//! The root script gets the namespace `main`. Every other script gets `p`
//! followed by a short hash of its *file name*, so two scripts sharing a base
//! name in different directories end up in the same namespace. The builder
//! logs a warning when that happens and keeps the ids unchanged.
//!
//! The same file may appear more than once in the tree (once per requirement).
//! Cyclic requirements are not detected; they fail once the nesting exceeds
//! [`MAX_REQUIRE_DEPTH`].

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::parser::{ParseError, RequireParser};
use crate::consts::{MAX_REQUIRE_DEPTH, ROOT_NAMESPACE};
use crate::util::hash::{hash_str, short_hash};

/// Index of a node within a [`ScriptGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
  pub const ROOT: NodeId = NodeId(0);
}

/// One script in the tree.
#[derive(Debug, Clone)]
pub struct ScriptNode {
  /// Canonical absolute path.
  pub path: PathBuf,
  pub namespace: String,
  /// File content, read once when the node was created.
  pub content: String,
  pub parent: Option<NodeId>,
  /// Requirements in declaration order.
  pub children: Vec<NodeId>,
}

impl ScriptNode {
  pub fn is_root(&self) -> bool {
    self.parent.is_none()
  }
}

/// Errors raised while building the script tree.
#[derive(Debug, Error)]
pub enum GraphError {
  #[error("failed to read script {path}: {source}")]
  ReadScript {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse requirements of {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: ParseError,
  },

  #[error("require nesting exceeds {max} levels at {path} (cyclic require?)")]
  RequireDepthExceeded { path: PathBuf, max: usize },
}

/// The tree of a root script and everything it transitively requires.
#[derive(Debug, Clone)]
pub struct ScriptGraph {
  nodes: Vec<ScriptNode>,
}

impl ScriptGraph {
  pub fn root(&self) -> &ScriptNode {
    &self.nodes[NodeId::ROOT.0]
  }

  pub fn root_path(&self) -> &Path {
    &self.root().path
  }

  pub fn node(&self, id: NodeId) -> Option<&ScriptNode> {
    self.nodes.get(id.0)
  }

  pub fn parent(&self, id: NodeId) -> Option<NodeId> {
    self.node(id).and_then(|n| n.parent)
  }

  pub fn children(&self, id: NodeId) -> &[NodeId] {
    self.node(id).map(|n| n.children.as_slice()).unwrap_or_default()
  }

  pub fn len(&self) -> usize {
    self.nodes.len()
  }

  /// Always false: a graph holds at least its root.
  pub fn is_empty(&self) -> bool {
    self.nodes.is_empty()
  }

  /// Nodes with their ids, in depth-first pre-order.
  pub fn iter(&self) -> impl Iterator<Item = (NodeId, &ScriptNode)> {
    self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
  }

  /// Paths of every node in depth-first pre-order, duplicates included.
  pub fn all_scripts(&self) -> Vec<&Path> {
    self.nodes.iter().map(|n| n.path.as_path()).collect()
  }
}

/// Namespace id for a non-root script.
pub fn namespace_for(path: &Path) -> String {
  let file_name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
  format!("p{}", short_hash(&hash_str(&file_name).0))
}

/// Build the tree rooted at `root`.
pub fn build_graph(root: &Path, parser: &dyn RequireParser) -> Result<ScriptGraph, GraphError> {
  let mut builder = GraphBuilder {
    parser,
    nodes: Vec::new(),
    namespaces: HashMap::new(),
  };
  builder.add(root.to_path_buf(), None, 0)?;
  debug!(root = %root.display(), nodes = builder.nodes.len(), "script graph built");
  Ok(ScriptGraph { nodes: builder.nodes })
}

struct GraphBuilder<'a> {
  parser: &'a dyn RequireParser,
  nodes: Vec<ScriptNode>,
  namespaces: HashMap<String, PathBuf>,
}

impl GraphBuilder<'_> {
  fn add(&mut self, path: PathBuf, parent: Option<NodeId>, depth: usize) -> Result<NodeId, GraphError> {
    if depth > MAX_REQUIRE_DEPTH {
      return Err(GraphError::RequireDepthExceeded {
        path,
        max: MAX_REQUIRE_DEPTH,
      });
    }

    let content = fs::read_to_string(&path).map_err(|source| GraphError::ReadScript {
      path: path.clone(),
      source,
    })?;
    let path = dunce::canonicalize(&path).unwrap_or(path);

    let namespace = match parent {
      None => ROOT_NAMESPACE.to_string(),
      Some(_) => {
        let ns = namespace_for(&path);
        match self.namespaces.get(&ns) {
          Some(existing) if *existing != path => {
            warn!(
              namespace = %ns,
              first = %existing.display(),
              second = %path.display(),
              "scripts with the same file name share a namespace"
            );
          }
          Some(_) => {}
          None => {
            self.namespaces.insert(ns.clone(), path.clone());
          }
        }
        ns
      }
    };

    let targets = self
      .parser
      .requirements(&path, &content)
      .map_err(|source| GraphError::Parse {
        path: path.clone(),
        source,
      })?;

    let id = NodeId(self.nodes.len());
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    self.nodes.push(ScriptNode {
      path,
      namespace,
      content,
      parent,
      children: Vec::with_capacity(targets.len()),
    });

    for target in targets {
      let target = PathBuf::from(target);
      let child_path = if target.is_absolute() { target } else { dir.join(target) };
      let child = self.add(child_path, Some(id), depth + 1)?;
      self.nodes[id.0].children.push(child);
    }

    Ok(id)
  }
}

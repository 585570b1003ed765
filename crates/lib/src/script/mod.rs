//! Script trees and incremental build decisions.

pub mod cache;
pub mod graph;
pub mod parser;

pub use cache::{BuildCache, CacheError};
pub use graph::{GraphError, NodeId, ScriptGraph, ScriptNode, build_graph};
pub use parser::{DirectiveParser, ParseError, RequireParser};

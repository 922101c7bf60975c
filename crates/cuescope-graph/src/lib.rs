//! cuescope graph
//!
//! Bounded, UI-oriented summaries of configuration documents:
//! - [`build_graph`]: one node per top-level field of an evaluated value
//! - [`build_graph_from_text`]: heuristic nodes from raw source when no value
//!   is available
//!
//! Both correlate diagnostics onto nodes through a [`ViolationIndex`].
//!
//! # Example
//!
//! ```rust
//! use cuescope_graph::{build_graph, NodeKind};
//! use serde_json::json;
//!
//! let nodes = build_graph(&json!({"server": {"port": 8080}}), &[]);
//! assert_eq!(nodes[0].kind, NodeKind::Object);
//! assert_eq!(nodes[0].children.as_deref(), Some(&["port".to_string()][..]));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod node;
pub mod text;
pub mod value;
pub mod violations;

pub use node::{GraphNode, NodeKind, ViolationSummary, DOCUMENT_NODE_ID, SUMMARY_NODE_ID};
pub use text::{build_graph_from_text, scan_fields, TextField};
pub use value::build_graph;
pub use violations::{extract_field_names, line_key, ViolationIndex};

/// Child identifiers kept per object node
pub const MAX_CHILDREN: usize = 10;

/// Top-level keys above which the graph collapses into a summary node
pub const MAX_TOP_LEVEL_KEYS: usize = 200;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

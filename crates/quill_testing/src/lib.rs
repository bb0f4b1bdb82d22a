//! Test harness for the html5lib tree construction fixtures
//!
//! Fixtures are read from `tests/data/tree-construction` in the workspace root. Each test is
//! parsed with the quill parser and the resulting tree is dumped in the html5lib format, so it
//! can be compared line by line with the expected tree.
pub mod tree_construction;

/// Root directory of all test fixtures
pub const FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../tests/data");

/// Directory (relative to the fixture root) of the tree construction fixtures
pub const TREE_CONSTRUCTION_PATH: &str = "tree-construction";

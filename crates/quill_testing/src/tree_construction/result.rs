/// Outcome of comparing a single line of the generated tree with the expected tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultStatus {
    /// The line matches the expected line
    Success,
    /// The line differs from the expected line
    Mismatch,
    /// The generated tree has a line that is not expected
    Missing,
    /// The expected tree has a line that is not generated
    Additional,
}

/// Result of a single tree line
#[derive(Debug, Clone, PartialEq)]
pub struct TreeLineResult {
    /// Line number in the tree (1 based)
    pub index: usize,
    pub result: ResultStatus,
    pub expected: String,
    pub actual: String,
}

/// Result of a single test run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestResult {
    pub tree_results: Vec<TreeLineResult>,
    /// Number of parse errors the parser reported
    pub actual_errors: usize,
    /// Number of parse errors the fixture expects
    pub expected_errors: usize,
}

impl TestResult {
    /// Returns true when every line of the generated tree matches the expected tree
    pub fn is_success(&self) -> bool {
        self.tree_results
            .iter()
            .all(|line| line.result == ResultStatus::Success)
    }

    /// Lines that did not match
    pub fn failures(&self) -> impl Iterator<Item = &TreeLineResult> {
        self.tree_results
            .iter()
            .filter(|line| line.result != ResultStatus::Success)
    }
}

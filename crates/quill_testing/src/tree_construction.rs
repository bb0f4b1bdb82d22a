pub mod fixture;
pub mod generator;
pub mod parser;
pub mod result;

use generator::TreeOutputGenerator;
use parser::{ScriptMode, TestSpec};
use quill_html5::document::Document;
use quill_html5::{parse_document, parse_fragment, FragmentContext, Html5ParserOptions};
use result::{ResultStatus, TestResult, TreeLineResult};

/// Maximum number of parse errors collected during a test run
const MAX_TEST_ERRORS: usize = 1000;

/// Holds a single parser test
#[derive(Debug, Default, PartialEq, Clone)]
pub struct Test {
    /// Filename of the test
    pub file_path: String,
    /// Line number of the test
    pub line: usize,
    /// The test as found in the fixture file
    pub spec: TestSpec,
    /// The expected document tree, one entry per tree line
    pub document: Vec<String>,
}

impl Test {
    /// Returns the script modes that should be tested as an array
    pub fn script_modes(&self) -> &[bool] {
        match self.spec.script_mode {
            ScriptMode::ScriptOff => &[false],
            ScriptMode::ScriptOn => &[true],
            ScriptMode::Both => &[false, true],
        }
    }

    pub fn document_as_str(&self) -> &str {
        self.spec.document.as_str()
    }

    pub fn spec_data(&self) -> &str {
        self.spec.data.as_str()
    }
}

/// Harness is a wrapper to run tree-construction tests
#[derive(Debug, Default)]
pub struct Harness {
    // Test that is currently being run
    test: Test,
    /// Next line in the document array
    next_document_line: usize,
}

impl Harness {
    /// Generated a new harness instance. It uses a dummy test that is replaced when run_test is called
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs a single test and returns the test result of that run
    pub fn run_test(&mut self, test: Test, scripting_enabled: bool) -> TestResult {
        self.test = test;
        self.next_document_line = 0;

        let options = Html5ParserOptions::new()
            .scripting_enabled(scripting_enabled)
            .track_errors(MAX_TEST_ERRORS);

        let actual = match self.test.spec.document_fragment.clone() {
            Some(context) => {
                let context = FragmentContext::from_qualified_name(&context);
                let fragment = parse_fragment(self.test.spec_data(), Some(&context), None, Some(options));
                self.generate_output(&fragment.document, true)
            }
            None => {
                let document = parse_document(self.test.spec_data(), None, Some(options));
                self.generate_output(&document, false)
            }
        };

        self.generate_test_result(actual.0, actual.1)
    }

    /// Dumps the tree and returns it together with the number of parse errors
    fn generate_output(&self, document: &Document, is_fragment: bool) -> (Vec<String>, usize) {
        let generator = TreeOutputGenerator::new(document);

        let lines = match (is_fragment, document.document_element()) {
            (true, Some(root)) => generator.generate_from(root),
            (true, None) => vec![],
            (false, _) => generator.generate(),
        };

        (lines, document.errors().len())
    }

    /// Retrieves the next line of the expected document
    fn next_line(&mut self) -> Option<String> {
        let line = self.test.document.get(self.next_document_line).cloned();
        self.next_document_line += 1;

        line
    }

    fn generate_test_result(&mut self, actual: Vec<String>, actual_errors: usize) -> TestResult {
        let mut result = TestResult {
            actual_errors,
            expected_errors: self.test.spec.errors.len(),
            ..TestResult::default()
        };

        let mut line_idx = 1;
        for actual_line in actual {
            let expected_line = self.next_line();
            let status = match &expected_line {
                Some(expected_line) if *expected_line == actual_line => ResultStatus::Success,
                Some(_) => ResultStatus::Mismatch,
                None => ResultStatus::Missing,
            };

            result.tree_results.push(TreeLineResult {
                index: line_idx,
                result: status,
                expected: expected_line.unwrap_or_default(),
                actual: actual_line,
            });
            line_idx += 1;
        }

        // Check if we have additional lines and if so, add as errors
        while let Some(expected_line) = self.next_line() {
            result.tree_results.push(TreeLineResult {
                index: line_idx,
                result: ResultStatus::Additional,
                expected: expected_line,
                actual: String::new(),
            });
            line_idx += 1;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_for(data: &str, fragment: Option<&str>, document: &[&str]) -> Test {
        Test {
            file_path: "inline".to_string(),
            line: 1,
            spec: TestSpec {
                data: data.to_string(),
                document_fragment: fragment.map(str::to_string),
                document: document.join("\n"),
                ..TestSpec::default()
            },
            document: document.iter().map(|line| line.to_string()).collect(),
        }
    }

    #[test]
    fn matching_document() {
        let test = test_for(
            "<p>hi",
            None,
            &["| <html>", "|   <head>", "|   <body>", "|     <p>", "|       \"hi\""],
        );

        let result = Harness::new().run_test(test, true);
        assert!(result.is_success());
        assert!(result.actual_errors > 0);
    }

    #[test]
    fn mismatching_document() {
        let test = test_for("<p>hi", None, &["| <html>", "|   <body>"]);

        let result = Harness::new().run_test(test, true);
        assert!(!result.is_success());
        assert_eq!(result.failures().next().map(|line| line.index), Some(2));
        assert_eq!(
            result.tree_results.last().map(|line| line.result),
            Some(ResultStatus::Missing)
        );
    }

    #[test]
    fn fragment() {
        let test = test_for("<td>x", Some("tr"), &["| <td>", "|   \"x\""]);

        let result = Harness::new().run_test(test, false);
        assert!(result.is_success());
    }
}

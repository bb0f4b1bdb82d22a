use crate::tree_construction::parser::parse_fixture;
use crate::tree_construction::Test;
use crate::{FIXTURE_ROOT, TREE_CONSTRUCTION_PATH};
use log::debug;
use quill_shared::types::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Holds all tests as found in the given fixture file
#[derive(Debug, PartialEq)]
pub struct FixtureFile {
    /// All the tests extracted from this fixture file
    pub tests: Vec<Test>,
    /// Path to the fixture file
    pub path: String,
}

/// Reads a given test file and extract all test data
pub fn read_fixture_from_path(path: impl AsRef<Path>) -> Result<FixtureFile> {
    let input = fs::read_to_string(&path)?;
    let path = path.as_ref().to_string_lossy().into_owned();

    let tests = parse_fixture(&input)?
        .into_iter()
        .map(|spec| Test {
            file_path: path.clone(),
            line: spec.line,
            document: create_document_array(&spec.document),
            spec,
        })
        .collect::<Vec<_>>();

    Ok(FixtureFile { tests, path })
}

/// Returns true when the fixture at 'path' is a fixture file and is allowed to be used according
/// to the list of given filenames. If no filenames are given, all fixtures are used.
fn use_fixture(filenames: &[&str], path: &Path) -> bool {
    if !path.is_file() || path.extension().map_or(true, |ext| ext != "dat") {
        return false;
    }

    filenames.is_empty() || filenames.iter().any(|filename| path.ends_with(filename))
}

/// Returns the root path for the fixtures
#[must_use]
pub fn fixture_root_path() -> PathBuf {
    PathBuf::from(FIXTURE_ROOT).join(TREE_CONSTRUCTION_PATH)
}

/// Read tree construction fixtures from the fixture root. If no filenames are given, all
/// fixtures are read, otherwise only the fixtures with the given filenames are read.
pub fn read_fixtures(filenames: Option<&[&str]>) -> Result<Vec<FixtureFile>> {
    let filenames = filenames.unwrap_or_default();

    let mut paths = fs::read_dir(fixture_root_path())?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();

    let mut files = vec![];
    for path in paths {
        if !use_fixture(filenames, &path) {
            continue;
        }

        let fixture = read_fixture_from_path(&path)?;
        debug!("read {} tests from {}", fixture.tests.len(), fixture.path);
        files.push(fixture);
    }

    Ok(files)
}

/// Splits the expected document into tree lines. A line that does not start with "| " continues
/// the (multi-line) text of the line before it.
fn create_document_array(document: &str) -> Vec<String> {
    let mut lines: Vec<String> = vec![];

    for line in document.split('\n') {
        match lines.last_mut() {
            Some(last) if !line.starts_with("| ") => {
                last.push('\n');
                last.push_str(line);
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn document_array() {
        let lines = create_document_array("| <html>\n|   <body>\n|     \"a\n\nb\"\n|     <p>");

        assert_eq!(
            lines,
            vec![
                "| <html>".to_string(),
                "|   <body>".to_string(),
                "|     \"a\n\nb\"".to_string(),
                "|     <p>".to_string(),
            ]
        );
    }

    #[test_case("tests1.dat")]
    #[test_case("adoption01.dat")]
    #[test_case("tables01.dat")]
    #[test_case("foreign01.dat")]
    #[test_case("template01.dat")]
    #[test_case("tests_innerHTML_1.dat")]
    #[test_case("noscript01.dat")]
    fn fixtures_are_found(filename: &str) {
        let files = read_fixtures(Some(&[filename])).unwrap_or_default();

        assert_eq!(files.len(), 1);
        assert!(!files[0].tests.is_empty());
        assert!(files[0].tests.iter().all(|test| !test.document.is_empty()));
    }
}

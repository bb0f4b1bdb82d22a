use quill_testing::tree_construction::fixture::{fixture_root_path, read_fixture_from_path};
use quill_testing::tree_construction::Harness;
use test_case::test_case;

// See tests/data/tree-construction/ for the fixture files.
#[test_case("tests1.dat")]
#[test_case("adoption01.dat")]
#[test_case("tables01.dat")]
#[test_case("foreign01.dat")]
#[test_case("template01.dat")]
#[test_case("tests_innerHTML_1.dat")]
#[test_case("noscript01.dat")]
fn tree_construction(filename: &str) {
    let fixture_file = read_fixture_from_path(fixture_root_path().join(filename));
    assert!(fixture_file.is_ok(), "cannot read fixture {filename}: {fixture_file:?}");
    let Ok(fixture_file) = fixture_file else {
        return;
    };
    assert!(!fixture_file.tests.is_empty());

    let mut harness = Harness::new();

    for test in fixture_file.tests {
        // for each test, run it with and without scripting enabled based on the test file
        for &scripting_enabled in test.script_modes() {
            let result = harness.run_test(test.clone(), scripting_enabled);

            for failure in result.failures() {
                println!(
                    "line {}: expected '{}', got '{}'",
                    failure.index, failure.expected, failure.actual
                );
            }
            assert!(
                result.is_success(),
                "tree construction: {}:{} {:?} (scripting {})",
                test.file_path,
                test.line,
                test.spec_data(),
                scripting_enabled
            );
        }
    }
}

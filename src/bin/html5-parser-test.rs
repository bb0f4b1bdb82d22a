use quill_shared::types::Result;
use quill_testing::tree_construction::fixture::{fixture_root_path, read_fixture_from_path};
use quill_testing::tree_construction::Harness;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

fn main() -> Result<()> {
    let root = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(fixture_root_path);
    let mut files = get_files_from_path(&root);
    files.sort();

    let mut total = 0;
    let mut failed = 0;
    let mut failures = Vec::new();

    for file in files.iter() {
        let fixture = read_fixture_from_path(root.join(file))?;

        print!("Test: ({:3}) {} [", fixture.tests.len(), file);
        let _ = std::io::stdout().flush();

        let mut harness = Harness::new();

        for test in fixture.tests.iter() {
            for &scripting_enabled in test.script_modes() {
                let result = harness.run_test(test.clone(), scripting_enabled);

                total += 1;

                if result.is_success() {
                    print!(".");
                } else {
                    print!("X");
                    failed += 1;
                    failures.push(format!("{}:{} {:?}", file, test.line, test.spec_data()));
                }
                let _ = std::io::stdout().flush();
            }
        }

        println!("]");
    }

    for failure in &failures {
        println!("  failed: {failure}");
    }

    let percentage = if total > 0 {
        (total - failed) as f32 / total as f32 * 100_f32
    } else {
        0_f32
    };
    println!("All tests completed. {}/{} ({:.2}%) passed.", total - failed, total, percentage);

    Ok(())
}

fn get_files_from_path(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).into_iter().flatten() {
        if !entry.file_type().is_file() {
            continue;
        }

        if entry.path().extension().is_some_and(|extension| extension == "dat") {
            if let Some(relative_path) = entry
                .path()
                .strip_prefix(dir)
                .ok()
                .and_then(Path::to_str)
            {
                files.push(relative_path.to_string());
            }
        }
    }

    files
}

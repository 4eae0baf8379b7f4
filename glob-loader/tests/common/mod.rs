use assert_cmd::assert::Assert;
use assert_cmd::Command;
use assert_fs::prelude::PathCopy;
use assert_fs::TempDir;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Copies `tests/test-cases/<dir_name>` into a temp dir, keeping the `<dir_name>`
/// prefix so patterns like `handlers/*.yaml` resolve from the temp dir.
fn setup_working_dir(dir_name: &str) -> TempDir {
    let file_path = PathBuf::from(format!("{}/tests/test-cases", env!("CARGO_MANIFEST_DIR")));

    let temp = TempDir::new().unwrap();
    temp.copy_from(
        file_path,
        &[format!("{}/*", dir_name), format!("{}/**/*", dir_name)],
    )
    .unwrap();

    temp
}

pub struct LoaderTestHelper<'a> {
    pub work_dir: TempDir,
    name: &'a str,
    counter: AtomicUsize,
}

impl<'a> LoaderTestHelper<'a> {
    pub fn new(name: &'a str, test_dir: &'a str) -> Self {
        Self {
            work_dir: setup_working_dir(test_dir),
            name,
            counter: AtomicUsize::new(0),
        }
    }

    pub fn run_command(&self, args: &[&str]) -> Assert {
        let mut cmd = Command::cargo_bin("glob-loader").unwrap();
        cmd.current_dir(self.work_dir.path())
            .env(
                "GLOB_LOADER_RUN_ID",
                format!(
                    "{}-{}",
                    self.name,
                    self.counter.fetch_add(1, Ordering::Relaxed)
                ),
            )
            .env("GLOB_LOADER_OUTPUT_PROGRESS", "plain")
            .env("NO_COLOR", "1")
            .args(args)
            .assert()
    }

    pub fn list(&self, args: &[&str]) -> Assert {
        let mut run_command = vec!["list"];
        run_command.extend_from_slice(args);
        self.run_command(&run_command)
    }

    pub fn dump(&self, args: &[&str]) -> Assert {
        let mut run_command = vec!["dump"];
        run_command.extend_from_slice(args);
        self.run_command(&run_command)
    }

    pub fn clean_work_dir(self) {
        self.work_dir.close().unwrap();
    }
}

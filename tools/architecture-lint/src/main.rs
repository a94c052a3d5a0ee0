//! Runs the layer boundary check over `backend/`.
//!
//! Usage: `architecture-lint [BACKEND_DIR]`. Without an argument the
//! workspace's own `backend/` directory is checked.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let backend = std::env::args_os()
        .nth(1)
        .map_or_else(default_backend_dir, PathBuf::from);
    let outcome = architecture_lint::check_backend(&backend);
    match outcome {
        Ok(checked) => {
            let _ = writeln!(
                io::stdout().lock(),
                "{checked} files in {} respect the layer boundaries",
                backend.display()
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let _ = writeln!(io::stderr().lock(), "{err}");
            ExitCode::FAILURE
        }
    }
}

fn default_backend_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../backend")
}

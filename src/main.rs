//! kiln CLI binary
//!
//! This is the minimal entrypoint for the kiln CLI. All logic is in the
//! library; main.rs only maps the result to a process exit code.

fn main() {
    if let Err(code) = kiln::cli::run() {
        std::process::exit(code.as_i32());
    }
}

//! reportgen CLI binary
//!
//! All logic lives in the library; main.rs only invokes `cli::run()`.

fn main() {
    // cli::run() prints every error itself
    if let Err(code) = reportgen::cli::run() {
        std::process::exit(code.as_i32());
    }
}

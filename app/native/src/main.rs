//! Wallspace command-line entry point.

fn main() {
    if let Err(err) = wallspace_lib::cli::run() {
        eprintln!("wallspace: {err}");
        std::process::exit(1);
    }
}

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(error) = restock_cli::init_logging() {
        eprintln!("{error}");
    }
    restock_cli::run()
}

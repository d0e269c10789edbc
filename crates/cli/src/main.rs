use std::process::ExitCode;

fn main() -> ExitCode {
    returns_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    promptgate_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    payplan_cli::run()
}

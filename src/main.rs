use std::process::ExitCode;

fn main() -> ExitCode {
    clinical_ddx::cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    sfhelper_cli::main()
}

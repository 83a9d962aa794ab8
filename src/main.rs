use std::process::ExitCode;

fn main() -> ExitCode {
    price_app_lib::run()
}

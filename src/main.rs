/// Main entry point for the replay tool
///
/// Thin wrapper; the logic lives in `interfaces::cli`.
use price_point_book::interfaces::cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    cli::run()
}

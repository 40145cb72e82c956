use std::process::ExitCode;

use devshell_bootstrap::logging;
use tracing::error;

mod workflows;

pub(crate) fn usage() -> &'static str {
    "Usage:\n  devshell-bootstrap [run] [--config PATH] [--proxy URL] [--skip-fonts] [--skip-optional] [--no-chsh] [--verbose]\n  devshell-bootstrap render <zshrc|starship|alacritty> [--config PATH]\n  devshell-bootstrap detect\n  devshell-bootstrap help\n\nLog filter: DEVSHELL_LOG (default devshell_bootstrap=info)"
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let command = match workflows::parse_command(&args) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err:#}\n\n{}", usage());
            return ExitCode::FAILURE;
        }
    };

    logging::init(command.verbose());
    match workflows::dispatch(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

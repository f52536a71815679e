//! tmplint CLI binary entry point.
//! Parses arguments, installs tracing and hands off to `app::execute`.

use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::rc::Rc;
use tmplint::cli::{wants_usage, Cli};
use tmplint::console::{Console, StdConsole};
use tmplint::{app, telemetry};

fn main() {
    let cli = Cli::parse();
    if wants_usage(std::env::args_os().len(), std::io::stdin().is_terminal()) {
        let _ = Cli::command().print_help();
        std::process::exit(1);
    }
    telemetry::init_tracing(cli.verbose);

    let console = Rc::new(StdConsole);
    let stdin = std::io::stdin();
    let mut lock = stdin.lock();
    match app::execute(&cli, console.clone(), &mut lock) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            console.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

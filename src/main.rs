use clap::Parser;
use colored::Colorize;

mod cli;

use cli::dispatch::dispatch;
use cli::types::Cli;

fn main() {
    let cli = Cli::parse();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            1
        }
    };
    std::process::exit(code);
}

//! CLI entrypoint for the forecasting session runtime.

mod cli;
mod run;
mod style;

use clap::Parser;

use cli::{Cli, Command};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = dispatch() {
        eprintln!("{}", style::error(format!("Error: {err:#}")));
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        None => run::run(
            run::RunOptions {
                config: None,
                endpoint: None,
                tag: None,
                model: None,
                seed: None,
                ticks: 6,
            },
            cli.verbose,
        ),
        Some(Command::Run {
            config,
            endpoint,
            tag,
            model,
            seed,
            ticks,
        }) => run::run(
            run::RunOptions {
                config,
                endpoint,
                tag,
                model,
                seed,
                ticks,
            },
            cli.verbose,
        ),
        Some(Command::Tags) => {
            run::print_tags();
            Ok(())
        }
    }
}

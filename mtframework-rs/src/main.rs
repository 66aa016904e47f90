//! Main entry point for the mtframework-rs CLI

use anyhow::Result;
use clap::CommandFactory;
use clap::Parser;
use clap_complete::{Generator, generate};
use std::io;

use mtframework_rs::cli::{Cli, Commands};
use mtframework_rs::commands;
use mtframework_rs::registry::FormatRegistry;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    let registry = FormatRegistry::with_builtin_formats();

    match cli.command {
        Commands::Arc { command } => commands::arc::execute(command),
        Commands::Tex { command } => commands::tex::execute(command),
        Commands::Mod { command } => commands::model::execute(command),
        Commands::Lmt { command } => commands::lmt::execute(command),
        Commands::Sbc { command } => commands::sbc::execute(command),
        Commands::Info { file } => commands::info::describe_file(&registry, &file),
        Commands::Convert { input, output } => {
            commands::info::convert_file(&registry, &input, output.as_deref())
        }
        Commands::Completions { shell } => {
            print_completions(shell, &mut Cli::command());
            Ok(())
        }
    }
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

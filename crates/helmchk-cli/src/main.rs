use clap::Parser;
use color_eyre::eyre;
use helmchk_cli::{Cli, CliError, logging};

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    logging::setup_logging(
        cli.logging.log_level,
        cli.logging.log_format,
        cli.logging.color.into(),
    )?;

    match helmchk_cli::run(&cli) {
        Ok(_) => Ok(()),
        Err(err @ CliError::NotInSync) => {
            // the report was printed already; keep the failure a single line
            eprintln!("{err}");
            std::process::exit(1);
        }
        Err(err) => Err(err.into()),
    }
}

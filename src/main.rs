use SpectroKit::Chemistry::element_table::ElementTable;
use SpectroKit::cli::cli_main::{CliArgs, run_cli};
use SpectroKit::settings::Settings;
use clap::Parser;
use log::{error, info};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::process::ExitCode;

pub fn main() -> ExitCode {
    let cli = CliArgs::parse();
    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };
    // level was validated by Settings::load
    let level = settings.level_filter().unwrap_or(log::LevelFilter::Warn);
    let log_config = ConfigBuilder::new().set_time_level(log::LevelFilter::Off).build();
    if let Err(e) = TermLogger::init(level, log_config, TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("logger was not initialised: {e}");
    }

    let custom_table;
    let table = match &settings.element_overrides {
        Some(path) => match ElementTable::standard_with_overrides_from(path) {
            Ok(table) => {
                info!("using atomic masses from '{}'", path);
                custom_table = table;
                &custom_table
            }
            Err(e) => {
                error!("{}", e);
                return ExitCode::from(2);
            }
        },
        None => ElementTable::standard(),
    };

    match run_cli(&cli, table) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

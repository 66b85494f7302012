//! `ramp-experiment` daemon for a Raspberry Pi.
//!
//! Loads the configuration, sets up logging and the hardware, and runs the
//! experiment server until interrupted.

use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};

use ramp_experiment::config::LoggingConfig;
use ramp_experiment::device::rpi::{open_driver, open_gpio, RpiActuator, RpiEdgeSensor};
use ramp_experiment::transport::MqttTransport;
use ramp_experiment::{
    load_config, ExperimentConfig, ExperimentServer, Ramp, ServerSettings, WormMotor,
};

/// Remote controlled ramp experiment
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short, long, default_value = "ramp.toml")]
    config: PathBuf,
    /// Validate the configuration and exit
    #[arg(long, default_value_t = false)]
    check: bool,
    /// Raise the log level (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<(), Box<dyn Error>> {
    let configured: LevelFilter = config.level.parse()?;
    let level = match verbose {
        0 => configured,
        1 => configured.max(LevelFilter::Debug),
        _ => LevelFilter::Trace,
    };

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = &config.file {
        loggers.push(WriteLogger::new(level, Config::default(), File::create(path.as_str())?));
    }
    CombinedLogger::init(loggers)?;
    Ok(())
}

fn run(config: ExperimentConfig) -> Result<(), Box<dyn Error>> {
    let gpio = open_gpio()?;
    let driver = open_driver(&gpio, &config.driver)?;
    let motor = WormMotor::new(driver, &config.motor)?;
    let ramp = Ramp::from_config(motor, &config.ramp)?;
    let elevator = RpiActuator::new(&config.elevator)?;
    let landing_zone = RpiEdgeSensor::new(&gpio, &config.landing_zone)?;

    let transport = MqttTransport::new(&config.mqtt);
    let settings = ServerSettings::from_config(&config)?;
    let mut server = ExperimentServer::new(ramp, elevator, landing_zone, transport, settings)?;

    let handle = server.handle();
    ctrlc::set_handler(move || {
        info!("interrupted, stopping after the current target");
        handle.schedule_stop();
    })?;

    let worker = thread::Builder::new()
        .name("experiment".into())
        .spawn(move || {
            let outcome = server.loop_forever();
            (server, outcome)
        })?;
    let (server, outcome) = worker
        .join()
        .map_err(|_| "experiment worker panicked")?;

    // teardown runs even if the loop failed
    let teardown = server.shutdown();
    outcome?;
    teardown?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };
    if args.check {
        println!("{}: ok", args.config.display());
        return ExitCode::SUCCESS;
    }

    if let Err(e) = init_logging(&config.logging, args.verbose) {
        eprintln!("failed to set up logging: {}", e);
        return ExitCode::FAILURE;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod options;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, LevelFilter};
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use certchain::verify_info;

use crate::args::ChaintoolArgs;
use crate::options::{verify_end_entity, Outcome};

fn configure_logging(args: &ChaintoolArgs) {
    if let Some(logging_config) = &args.logging_config {
        match log4rs::init_file(logging_config, Default::default()) {
            Ok(()) => return,
            Err(e) => println!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing with console logging.",
                logging_config, e
            ),
        }
    }

    // if there's no config, prepare one using stdout
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                println!(
                    "ERROR: failed to configure logging for stdout with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            println!(
                "ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging",
                e
            );
        }
    }
}

/// Point of entry for chaintool.
fn main() -> ExitCode {
    let args = ChaintoolArgs::parse();
    configure_logging(&args);
    debug!("chaintool start");

    let code = match verify_end_entity(&args) {
        Ok(Outcome::Succeeded) => {
            println!("Verification succeeded");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Failed(flags)) => {
            println!("Verification failed");
            print!("{}", verify_info("  ! ", flags.bits()));
            ExitCode::from(2)
        }
        Err(e) => {
            println!("Error: {}", e);
            ExitCode::FAILURE
        }
    };

    debug!("chaintool end");
    code
}

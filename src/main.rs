#![allow(clippy::cargo_common_metadata)]
use std::ffi::OsString;
use std::process::ExitCode;
use vackup::{
    cli::{self, Invocation},
    config::Config,
    core::FailureReporter,
    setup_logging,
};

fn main() -> ExitCode {
    let argv: Vec<OsString> = std::env::args_os().collect();
    let env_config = Config::from_env();

    // Parse command line arguments
    let args = match cli::parse_args_from(argv.clone()) {
        Ok(Invocation::Run(args)) => args,
        Ok(Invocation::Info(text)) => {
            print!("{text}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let config = env_config.with_failure_script(cli::failure_script_from(argv));
            return fail(&FailureReporter::from_config(&config), &anyhow::Error::new(e));
        }
    };

    // Command line options override the environment
    let config = match env_config.clone().with_args(&args) {
        Ok(config) => config,
        Err(e) => {
            let config = env_config.with_failure_script(args.failure_script.clone());
            return fail(&FailureReporter::from_config(&config), &anyhow::Error::new(e));
        }
    };
    let reporter = FailureReporter::from_config(&config);

    if let Err(e) = setup_logging(config.debug) {
        return fail(&reporter, &e);
    }

    match cli::execute_command(&config, &args.command) {
        Ok(confirmation) => {
            println!("{confirmation}");
            ExitCode::SUCCESS
        }
        Err(e) => fail(&reporter, &e),
    }
}

fn fail(reporter: &FailureReporter, error: &anyhow::Error) -> ExitCode {
    let code = reporter.report(error);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

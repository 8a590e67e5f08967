use clap::Parser;
use finmate::api::{connect, Credentials, Mode, Registration};
use finmate::args::{Args, Command};
use finmate::{commands, Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, info, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    // This allows for running the program without a spending service. When FINMATE_IN_TEST_MODE
    // is set and non-zero in length, then the mode will be Mode::Test, otherwise Mode::Http.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.base_url()).await?.print(),

        Command::Signup(signup_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            let password = commands::password_or_prompt(signup_args.password(), true)?;
            let registration =
                Registration::new(signup_args.username(), signup_args.email(), password);
            commands::signup(&remote, registration).await?.print()
        }

        Command::Signin(signin_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            let password = commands::password_or_prompt(signin_args.password(), false)?;
            let credentials = Credentials::new(signin_args.username(), password);
            commands::signin(&config, &remote, credentials).await?.print()
        }

        Command::Logout => commands::logout(&Config::load(home).await?).await?.print(),

        Command::Status => commands::status(&Config::load(home).await?).await?.print(),

        Command::List => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            commands::list(&config, &remote).await?.print()
        }

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            commands::add(&config, &remote, add_args.draft())
                .await?
                .print()
        }

        Command::Delete(delete_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            match commands::confirm_delete(delete_args.id(), delete_args.yes())? {
                Some(confirmation) => {
                    commands::delete(&config, &remote, delete_args.id().clone(), confirmation)
                        .await?
                        .print()
                }
                None => info!("Nothing was deleted"),
            }
        }

        Command::Dashboard(dashboard_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            commands::dashboard(&config, &remote, dashboard_args.recent())
                .await?
                .print()
        }

        Command::Watch(watch_args) => {
            let config = Config::load(home).await?;
            let remote = connect(&config, mode)?;
            commands::watch(&config, &remote, watch_args.recent())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_CRATE_NAME"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

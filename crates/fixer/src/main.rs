mod config;
mod homeserver;
mod logging;

use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory as _, Parser, error::ErrorKind};
use fixer_core::{
    FixError, fix_room, room_id_from_localpart, user_id_from_localpart, validate_room_localpart,
};
use tracing::{error, info};

use crate::{
    config::load_config,
    homeserver::MatrixHomeserver,
    logging::{LogFormat, init_tracing},
};

const PROCESS_OVER: &str = "The room has been fully updated. Don't forget to mark it as direct chat in your client, and to edit its notification rules.";

#[derive(Parser, Debug)]
#[command(
    name = "matrix-room-fixer",
    version,
    about = "Set the name and avatar of a bridged Facebook 1:1 room from the friend's profile"
)]
struct Args {
    /// Room ID localpart, e.g. `ZUFHhmRzEyUdzljKRz`
    #[arg(long = "room-id-localpart")]
    room_id_localpart: String,

    /// Path to the YAML configuration file
    #[arg(long, env = "FIXER_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Require the room ID localpart to start with a letter
    #[arg(long)]
    strict: bool,

    /// Log output format
    #[arg(long, env = "FIXER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env if present so clap can pick up env vars.
    let _ = dotenvy::dotenv();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(args.log_format) {
        eprintln!("failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&args).await {
        Ok(()) => {
            info!("{PROCESS_OVER}");
            ExitCode::SUCCESS
        }
        Err(err) => report(&err),
    }
}

async fn run(args: &Args) -> Result<(), FixError> {
    // The command line alone can already be wrong; check it before touching the config.
    validate_room_localpart(&args.room_id_localpart, args.strict)?;
    let config = load_config(&args.config)?;
    let strict = args.strict || config.fixer.strict_room_id_validation;

    let room_id = room_id_from_localpart(
        &args.room_id_localpart,
        &config.matrix.server_name,
        strict,
    )?;
    let user_id = user_id_from_localpart(&config.matrix.localpart, &config.matrix.server_name)?;

    let homeserver = MatrixHomeserver::connect(&config.matrix, user_id.clone()).await?;
    let summary = fix_room(
        &homeserver,
        &room_id,
        &user_id,
        &config.fixer.fix_settings(),
    )
    .await?;
    info!(room = %room_id, applied = summary.applied.len(), "Done");
    Ok(())
}

/// Log `err` and pick the process exit code. Usage errors also print the help.
fn report(err: &FixError) -> ExitCode {
    if err.is_usage() {
        error!("{err}");
        eprintln!("{}", Args::command().render_help());
        return ExitCode::from(exit_code(err));
    }
    match err {
        FixError::InvalidMemberCount { .. } | FixError::AmbiguousCounterpart { .. } => {
            error!("{err}");
        }
        FixError::InvalidRoomLocalpart { .. }
        | FixError::StateWriteFailed { .. }
        | FixError::Collaborator(_) => {
            error!(error = ?err, "Aborting");
        }
    }
    ExitCode::from(exit_code(err))
}

/// Every failure exits with 1; success is the only zero.
const fn exit_code(err: &FixError) -> u8 {
    match err {
        FixError::InvalidRoomLocalpart { .. }
        | FixError::InvalidMemberCount { .. }
        | FixError::AmbiguousCounterpart { .. }
        | FixError::StateWriteFailed { .. }
        | FixError::Collaborator(_) => 1,
    }
}

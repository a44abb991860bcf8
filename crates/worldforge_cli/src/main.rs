//! Worldforge executable.
//!
//! # Responsibility
//! - Serve the HTTP API over one SQLite database.
//! - Provide operator commands for user registration and role assignment.
//!
//! # Invariants
//! - Logging is initialized before the database is opened.
//! - Operator commands bypass the admin check; they never run over HTTP.

use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use worldforge_api::{router, AppState};
use worldforge_core::db::open_db;
use worldforge_core::{
    core_version, default_log_level, init_logging, ping, DbError, LoggingError, Role,
    ServiceError, SqliteUserRepository, UserService,
};

#[derive(Parser)]
#[command(name = "worldforge", version)]
#[command(about = "Multi-tenant worldbuilding content service")]
struct Cli {
    #[command(flatten)]
    logging: LogArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct LogArgs {
    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "WORLDFORGE_LOG_LEVEL")]
    log_level: Option<String>,

    /// Directory for rotated log files
    #[arg(long, global = true, env = "WORLDFORGE_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,
}

#[derive(Args)]
struct DbArgs {
    /// SQLite database file
    #[arg(long, env = "WORLDFORGE_DB_PATH", default_value = "worldforge.sqlite3")]
    db_path: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        #[command(flatten)]
        db: DbArgs,

        /// Listen address
        #[arg(long, env = "WORLDFORGE_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Operator user administration
    #[command(subcommand)]
    User(UserCommand),
    /// Print core linkage information
    Ping,
}

#[derive(Subcommand)]
enum UserCommand {
    /// Register a user
    Add {
        #[command(flatten)]
        db: DbArgs,
        id: String,
        #[arg(long, value_parser = parse_role, default_value = "free")]
        role: Role,
    },
    /// Change the role of an existing user
    SetRole {
        #[command(flatten)]
        db: DbArgs,
        id: String,
        #[arg(value_parser = parse_role)]
        role: Role,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value.trim()).ok_or_else(|| {
        let known: Vec<&str> = Role::ALL.iter().map(|role| role.as_str()).collect();
        format!("unknown role `{value}`; expected one of {}", known.join("|"))
    })
}

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Db(DbError),
    Service(ServiceError),
    Io(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging setup failed: {err}"),
            Self::Db(err) => write!(f, "database error: {err}"),
            Self::Service(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl Error for CliError {}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ServiceError> for CliError {
    fn from(value: ServiceError) -> Self {
        Self::Service(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_exit module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Command::Ping = cli.command {
        println!("worldforge_core ping={}", ping());
        println!("worldforge_core version={}", core_version());
        return Ok(());
    }

    let level = cli
        .logging
        .log_level
        .as_deref()
        .unwrap_or(default_log_level());
    let log_dir = absolute(&cli.logging.log_dir)?;
    init_logging(level, &log_dir)?;

    match cli.command {
        Command::Serve { db, bind } => serve(&db.db_path, bind),
        Command::User(UserCommand::Add { db, id, role }) => {
            let conn = open_db(&db.db_path)?;
            let users = UserService::new(
                SqliteUserRepository::try_new(&conn).map_err(ServiceError::from)?,
            );
            let user = users.register(&id, role)?;
            println!("registered {} as {}", user.id, user.role);
            Ok(())
        }
        Command::User(UserCommand::SetRole { db, id, role }) => {
            let conn = open_db(&db.db_path)?;
            let users = UserService::new(
                SqliteUserRepository::try_new(&conn).map_err(ServiceError::from)?,
            );
            let user = users.assign_role(&id, role)?;
            println!("{} is now {}", user.id, user.role);
            Ok(())
        }
        Command::Ping => Ok(()),
    }
}

fn serve(db_path: &Path, bind: SocketAddr) -> Result<(), CliError> {
    let conn = open_db(db_path)?;
    info!(
        "event=server_start module=cli status=start bind={bind} db_path={}",
        db_path.display()
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind).await?;
        info!("event=server_listen module=cli status=ok bind={bind}");
        axum::serve(listener, router(AppState::new(conn))).await
    })?;

    info!("event=server_stop module=cli status=ok");
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf, CliError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}

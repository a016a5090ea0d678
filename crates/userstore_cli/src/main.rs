//! CLI entry point.
//!
//! # Responsibility
//! - Open one connection, optionally ensure the schema, run one user
//!   operation and print its result.
//! - Fail fast: any error is printed to stderr and exits with status 1.

use anyhow::{bail, Context};
use std::io::{self, Write};
use std::process::ExitCode;
use userstore_core::{
    connect, core_version, default_log_level, init_logging, DbConfig, OptionalRecord,
    SortOrder, SqliteUserRepository, User, UserField, UserFilter, UserId, UserPatch, UserQuery,
    UserRepository,
};

const DEFAULT_DSN: &str = "userstore.db?charset=utf8mb4&parseTime=true";
const DEFAULT_TARGET_ID: UserId = 1;
const USAGE: &str = "usage: userstore_cli [--dsn <conn>] [--migrate] [--id <user id>] \
[--log-dir <abs dir>] [--log-level <level>] \
[migrate|get-one|find|insert|inserts|save|update|updates|delete|version]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Migrate,
    GetOne,
    Find,
    Insert,
    Inserts,
    Save,
    Update,
    Updates,
    Delete,
    Version,
}

impl Command {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "migrate" => Some(Self::Migrate),
            "get-one" => Some(Self::GetOne),
            "find" => Some(Self::Find),
            "insert" => Some(Self::Insert),
            "inserts" => Some(Self::Inserts),
            "save" => Some(Self::Save),
            "update" => Some(Self::Update),
            "updates" => Some(Self::Updates),
            "delete" => Some(Self::Delete),
            "version" => Some(Self::Version),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    dsn: String,
    migrate: bool,
    target_id: UserId,
    log_dir: Option<String>,
    log_level: String,
    command: Command,
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs {
        dsn: DEFAULT_DSN.to_string(),
        migrate: false,
        target_id: DEFAULT_TARGET_ID,
        log_dir: None,
        log_level: default_log_level().to_string(),
        command: Command::GetOne,
    };
    let mut command = None;
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--migrate" => parsed.migrate = true,
            "--dsn" => parsed.dsn = option_value(&mut args, "--dsn")?,
            "--log-dir" => parsed.log_dir = Some(option_value(&mut args, "--log-dir")?),
            "--log-level" => parsed.log_level = option_value(&mut args, "--log-level")?,
            "--id" => {
                let value = option_value(&mut args, "--id")?;
                parsed.target_id = value
                    .parse()
                    .with_context(|| format!("--id expects an integer, got `{value}`"))?;
            }
            other if other.starts_with("--") => bail!("unknown option `{other}`"),
            other => {
                if command.is_some() {
                    bail!("only one command may be given, got extra `{other}`");
                }
                command = Some(
                    Command::parse(other)
                        .with_context(|| format!("unknown command `{other}`"))?,
                );
            }
        }
    }

    if let Some(command) = command {
        parsed.command = command;
    }
    Ok(parsed)
}

fn option_value(args: &mut impl Iterator<Item = String>, name: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("option `{name}` needs a value"))
}

fn run(args: &CliArgs) -> anyhow::Result<()> {
    if let Some(log_dir) = &args.log_dir {
        init_logging(&args.log_level, log_dir).context("initialize logging")?;
    }

    if args.command == Command::Version {
        println!("userstore_core version={}", core_version());
        return Ok(());
    }

    let mut config = DbConfig::parse(&args.dsn).context("parse --dsn")?;
    config.auto_migrate |= args.migrate || args.command == Command::Migrate;
    let conn = connect(&config).context("open database")?;

    if args.command == Command::Migrate {
        println!("schema ensured: users, products");
        return Ok(());
    }

    let repo = SqliteUserRepository::try_new(&conn)
        .context("users table is not ready; rerun with --migrate")?;
    run_command(&mut io::stdout().lock(), &repo, args.command, args.target_id)
}

fn run_command(
    out: &mut impl Write,
    repo: &SqliteUserRepository<'_>,
    command: Command,
    target_id: UserId,
) -> anyhow::Result<()> {
    match command {
        Command::GetOne => {
            let first = repo.find_first(SortOrder::Ascending).optional()?;
            print_optional(out, "first", first)?;
            print_optional(out, "take", repo.take().optional()?)?;
            let last = repo.find_first(SortOrder::Descending).optional()?;
            print_optional(out, "last", last)?;
            print_optional(out, "by_id", repo.find_by_id(target_id).optional()?)?;
            let query = UserQuery::new(UserFilter::by_id(target_id)).including_deleted();
            print_optional(out, "by_id_unscoped", repo.find_one(&query).optional()?)?;
        }
        Command::Find => {
            let users = repo.find_all()?;
            for user in &users {
                writeln!(out, "user: {user:?}")?;
            }
            writeln!(out, "count: {}", users.len())?;
        }
        Command::Insert => {
            let mut user = User::new("Taro", 20);
            let count = repo.create(&mut user)?;
            writeln!(out, "count: {count}")?;
            writeln!(out, "id: {}", user.id)?;
        }
        Command::Inserts => {
            let mut users = vec![
                User::new("Hanako", 25).active(true),
                User::new("Ryutaro", 30),
                User::new("Taichi", 35),
            ];
            let count = repo.create_many(&mut users)?;
            writeln!(out, "count: {count}")?;
        }
        Command::Save => {
            let Some(mut user) = repo.find_first(SortOrder::Ascending).optional()? else {
                writeln!(out, "save: no users")?;
                return Ok(());
            };
            user.name = "Taro".to_string();
            writeln!(out, "count: {}", repo.save(&mut user)?)?;
        }
        Command::Update => {
            let count = repo.update_field(
                &UserFilter::by_id(target_id),
                UserField::Name("Takashi".to_string()),
            )?;
            writeln!(out, "count: {count}")?;
        }
        Command::Updates => {
            let patch = UserPatch::new().name("Taro").is_active(false);
            let count = repo.update_partial(&UserFilter::by_id(target_id), &patch)?;
            writeln!(out, "count: {count}")?;
        }
        Command::Delete => {
            let count = repo.soft_delete(&UserFilter::by_id(target_id))?;
            writeln!(out, "count: {count}")?;
        }
        Command::Migrate | Command::Version => {}
    }
    Ok(())
}

fn print_optional(out: &mut impl Write, label: &str, user: Option<User>) -> io::Result<()> {
    match user {
        Some(user) => writeln!(out, "{label}: {user:?}"),
        None => writeln!(out, "{label}: not found"),
    }
}

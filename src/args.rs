//! These structs provide the CLI interface for the finmate CLI.

use crate::model::{Amount, Category, TransactionDraft, TransactionId};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// finmate: A command-line client for the FinAI Mate spending service.
///
/// Sign up, sign in, record your expenses and see where your money goes: total spending, a
/// breakdown by category, a month-by-month overview and your most recent transactions.
///
/// Start with `finmate init --base-url <URL>` to point the client at a running service. Set
/// FINMATE_IN_TEST_MODE=1 to use a built-in demo service instead (user `demo`, password
/// `password`).
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and the configuration file.
    ///
    /// This is the first command you should run. By default the data directory is $HOME/finmate;
    /// pass --home or set FINMATE_HOME to put it somewhere else.
    Init(InitArgs),
    /// Create an account on the service.
    Signup(SignupArgs),
    /// Sign in and remember the session.
    Signin(SigninArgs),
    /// Forget the session.
    Logout,
    /// Show whether you are signed in.
    Status,
    /// List all of your transactions, newest first.
    List,
    /// Record a new expense.
    Add(AddArgs),
    /// Delete a transaction.
    Delete(DeleteArgs),
    /// Show your spending summary.
    Dashboard(DashboardArgs),
    /// Keep the spending summary on screen and follow sign in and sign out until Ctrl-C.
    Watch(DashboardArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where finmate data and configuration is held. Defaults to ~/finmate
    #[arg(long, env = "FINMATE_HOME", default_value_t = default_finmate_home())]
    home: DisplayPath,
}

impl Common {
    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// (Not shown): Args for the `finmate init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Where the spending service listens, e.g. http://localhost:8080
    #[arg(long)]
    base_url: String,
}

impl InitArgs {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// (Not shown): Args for the `finmate signup` command.
#[derive(Debug, Parser, Clone)]
pub struct SignupArgs {
    #[arg(long)]
    username: String,

    #[arg(long)]
    email: String,

    /// You will be prompted for the password if it is not given here.
    #[arg(long)]
    password: Option<String>,
}

impl SignupArgs {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// (Not shown): Args for the `finmate signin` command.
#[derive(Debug, Parser, Clone)]
pub struct SigninArgs {
    #[arg(long)]
    username: String,

    /// You will be prompted for the password if it is not given here.
    #[arg(long)]
    password: Option<String>,
}

impl SigninArgs {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

/// (Not shown): Args for the `finmate add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// How much was spent, e.g. 12.50
    #[arg(long)]
    amount: Amount,

    /// What the money was spent on.
    #[arg(long)]
    description: String,

    /// One of FOOD, TRANSPORT, UTILITIES, ENTERTAINMENT, HEALTH, OTHER.
    #[arg(long, default_value_t = Category::default())]
    category: Category,

    /// The day of the expense as YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl AddArgs {
    /// The draft these arguments describe. Each call produces a new submission.
    pub fn draft(&self) -> TransactionDraft {
        TransactionDraft::new(
            self.amount,
            self.description.clone(),
            self.category,
            self.date.unwrap_or_else(|| Local::now().date_naive()),
        )
    }
}

/// (Not shown): Args for the `finmate delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction, as shown by `finmate list`.
    id: TransactionId,

    /// Delete without asking for confirmation.
    #[arg(long, short)]
    yes: bool,
}

impl DeleteArgs {
    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn yes(&self) -> bool {
        self.yes
    }
}

/// (Not shown): Args for the `finmate dashboard` and `finmate watch` commands.
#[derive(Debug, Parser, Clone)]
pub struct DashboardArgs {
    /// How many recent transactions to show.
    #[arg(long, default_value_t = 5)]
    recent: usize,
}

impl DashboardArgs {
    pub fn recent(&self) -> usize {
        self.recent
    }
}

fn default_finmate_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("finmate"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or FINMATE_HOME instead of relying on the default \
                finmate home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("finmate")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        let mut full = vec!["finmate", "--home", "/tmp/finmate"];
        full.extend_from_slice(args);
        Args::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_add_defaults() {
        let args = parse(&["add", "--amount", "12.50", "--description", "Lunch"]);
        let Command::Add(add) = args.command() else {
            panic!("expected add, got {:?}", args.command());
        };
        let draft = add.draft();
        assert_eq!(draft.category(), Category::Food);
        assert_eq!(draft.date(), Local::now().date_naive());
        assert_eq!(draft.amount(), "12.5".parse::<Amount>().unwrap());
    }

    #[test]
    fn test_add_all_fields() {
        let args = parse(&[
            "add",
            "--amount",
            "$1,200",
            "--description",
            "Rent share",
            "--category",
            "UTILITIES",
            "--date",
            "2024-02-01",
        ]);
        let Command::Add(add) = args.command() else {
            panic!("expected add");
        };
        let draft = add.draft();
        assert_eq!(draft.category(), Category::Utilities);
        assert_eq!(draft.date().to_string(), "2024-02-01");
        assert_eq!(draft.amount().to_string(), "$1,200.00");
    }

    #[test]
    fn test_add_rejects_unknown_category() {
        let result = Args::try_parse_from([
            "finmate",
            "add",
            "--amount",
            "1",
            "--description",
            "x",
            "--category",
            "GIFTS",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_and_dashboard() {
        let args = parse(&["delete", "42", "--yes"]);
        let Command::Delete(delete) = args.command() else {
            panic!("expected delete");
        };
        assert_eq!(delete.id().as_str(), "42");
        assert!(delete.yes());

        let args = parse(&["dashboard"]);
        let Command::Dashboard(dashboard) = args.command() else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.recent(), 5);
    }

    #[test]
    fn test_log_level() {
        let args = parse(&["--log-level", "debug", "status"]);
        assert_eq!(args.common().log_level(), LevelFilter::DEBUG);
        assert_eq!(args.common().home().path(), Path::new("/tmp/finmate"));
    }
}

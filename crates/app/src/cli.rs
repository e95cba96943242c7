use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use ledger::{Money, SafeTxKind};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Output is JSON; money amounts are integer minor units.
#[derive(Parser, Debug)]
#[command(name = "forecourt", version, about = "Fuel station cash ledger")]
pub struct Cli {
    /// Settings file, without extension.
    #[arg(long, short)]
    pub config: Option<String>,
    /// Overrides the database from the settings file.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Applies pending schema migrations.
    Migrate,
    #[command(subcommand)]
    Safe(SafeCommand),
    #[command(subcommand)]
    Tank(TankCommand),
}

#[derive(Subcommand, Debug)]
pub enum SafeCommand {
    /// Opens the station's safe, or shows it if it exists.
    Open(StationArgs),
    /// Balance of the safe at an instant (default: now).
    Balance {
        #[command(flatten)]
        station: StationArgs,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    Record(RecordArgs),
    /// Records a physical count as the new balance.
    Count {
        #[command(flatten)]
        station: StationArgs,
        #[arg(long)]
        amount: Money,
        #[arg(long)]
        by: String,
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
    Summary(SummaryArgs),
    /// Compares the cached balance with a full replay.
    Reconcile {
        #[command(flatten)]
        station: StationArgs,
        /// Rewrites the cached balance when it drifted.
        #[arg(long)]
        refresh: bool,
    },
    /// Registers a bank account for deposits.
    AddBank {
        #[arg(long)]
        name: String,
        #[arg(long)]
        account_number: Option<String>,
    },
}

#[derive(Args, Debug)]
pub struct StationArgs {
    #[arg(long)]
    pub station: String,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    #[command(flatten)]
    pub station: StationArgs,
    #[arg(long)]
    pub kind: SafeTxKind,
    #[arg(long)]
    pub amount: Money,
    #[arg(long)]
    pub by: String,
    #[arg(long)]
    pub at: Option<DateTime<Utc>>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub shift_id: Option<String>,
    /// Bank receiving a `BANK_DEPOSIT`.
    #[arg(long)]
    pub bank: Option<Uuid>,
    #[arg(long, requires = "bank")]
    pub reference: Option<String>,
}

#[derive(Args, Debug)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub station: StationArgs,
    /// Calendar day (UTC).
    #[arg(long, conflicts_with_all = ["from", "to"])]
    pub date: Option<NaiveDate>,
    #[arg(long, requires = "to")]
    pub from: Option<DateTime<Utc>>,
    #[arg(long, requires = "from")]
    pub to: Option<DateTime<Utc>>,
    /// Flat tolerance; defaults to `ledger.summary_tolerance`.
    #[arg(long)]
    pub tolerance: Option<Decimal>,
    /// Uses the greater of `ledger.cash_tolerance_percent` of the expected
    /// closing and `ledger.cash_tolerance_flat`.
    #[arg(long, conflicts_with = "tolerance")]
    pub cash_policy: bool,
}

#[derive(Subcommand, Debug)]
pub enum TankCommand {
    /// Liters held at a dip depth.
    Volume {
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        depth: Decimal,
    },
    /// Dip depth for a volume.
    Depth {
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        liters: Decimal,
    },
    /// Classifies a dip reading against the book stock.
    Dip {
        #[arg(long)]
        capacity: u32,
        #[arg(long)]
        depth: Decimal,
        #[arg(long)]
        book: Decimal,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_record() {
        let cli = Cli::try_parse_from([
            "forecourt",
            "safe",
            "record",
            "--station",
            "station-1",
            "--kind",
            "bank_deposit",
            "--amount",
            "1500.50",
            "--by",
            "alice",
            "--bank",
            "6f1c1f4e-8a55-4f3e-9b1e-1d2a9c4b7e10",
            "--reference",
            "SLIP-9",
        ])
        .unwrap();

        let Command::Safe(SafeCommand::Record(args)) = cli.command else {
            panic!("expected safe record");
        };
        assert_eq!(args.kind, SafeTxKind::BankDeposit);
        assert_eq!(args.amount, Money::new(150_050));
        assert_eq!(args.reference.as_deref(), Some("SLIP-9"));
    }

    #[test]
    fn summary_date_conflicts_with_range() {
        let result = Cli::try_parse_from([
            "forecourt",
            "safe",
            "summary",
            "--station",
            "s",
            "--date",
            "2026-03-02",
            "--from",
            "2026-03-02T00:00:00Z",
            "--to",
            "2026-03-03T00:00:00Z",
        ]);
        assert!(result.is_err());
    }
}

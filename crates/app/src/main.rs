use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use ledger::{
    BankLink, Engine, Money, RecordSafeTxCmd, TankCapacity, Tolerance, TxRefs, calibration,
};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use cli::{Cli, Command, RecordArgs, SafeCommand, SummaryArgs, TankCommand};
use settings::Settings;

mod cli;
mod settings;

type AppResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();
    let settings = Settings::new(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "forecourt={level},ledger={level}",
            level = settings.app.level
        ))
        .init();

    // Tank charts need no storage.
    if let Command::Tank(tank) = cli.command {
        return run_tank(tank, &settings);
    }

    let url = cli
        .database_url
        .clone()
        .unwrap_or_else(|| settings.database.url());
    let db = connect_db(&url).await?;

    let engine = Engine::builder()
        .database(db)
        .lock_timeout(Duration::from_millis(settings.ledger.lock_timeout_ms))
        .build()
        .await?;

    match cli.command {
        Command::Migrate => {
            tracing::info!("database is up to date");
            Ok(())
        }
        Command::Safe(command) => run_safe(&engine, command, &settings).await,
        Command::Tank(_) => Ok(()),
    }
}

async fn connect_db(url: &str) -> AppResult<sea_orm::DatabaseConnection> {
    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}

async fn run_safe(engine: &Engine, command: SafeCommand, settings: &Settings) -> AppResult<()> {
    match command {
        SafeCommand::Open(args) => print_json(&engine.open_or_get_safe(&args.station).await?),
        SafeCommand::Balance { station, at } => {
            let safe = engine.open_or_get_safe(&station.station).await?;
            let balance = match at {
                Some(at) => engine.compute_balance_before(safe.id, at).await?,
                None => safe.current_balance,
            };
            print_json(&BalanceView {
                station_id: safe.station_id,
                safe_id: safe.id,
                at,
                balance,
            })
        }
        SafeCommand::Record(args) => record(engine, args).await,
        SafeCommand::Count {
            station,
            amount,
            by,
            at,
        } => {
            let tx = engine
                .count_safe(&station.station, amount, &by, at.unwrap_or_else(Utc::now))
                .await?;
            print_json(&tx)
        }
        SafeCommand::Summary(args) => summary(engine, args, settings).await,
        SafeCommand::Reconcile { station, refresh } => {
            let report = engine.reconcile(&station.station).await?;
            if refresh && !report.is_balanced {
                engine.refresh_current_balance(report.safe_id).await?;
            }
            print_json(&report)
        }
        SafeCommand::AddBank {
            name,
            account_number,
        } => print_json(&engine.register_bank(&name, account_number.as_deref()).await?),
    }
}

async fn record(engine: &Engine, args: RecordArgs) -> AppResult<()> {
    let safe = engine.open_or_get_safe(&args.station.station).await?;

    let mut refs = TxRefs::default();
    if let Some(shift_id) = args.shift_id {
        refs = refs.shift_id(shift_id);
    }

    let mut cmd = RecordSafeTxCmd::new(
        safe.id,
        args.kind,
        args.amount,
        args.at.unwrap_or_else(Utc::now),
        &args.by,
    )
    .refs(refs);
    if let Some(description) = args.description {
        cmd = cmd.description(description);
    }
    if let Some(bank_id) = args.bank {
        let mut link = BankLink::new(bank_id);
        if let Some(reference) = args.reference {
            link = link.reference_number(reference);
        }
        cmd = cmd.bank(link);
    }

    print_json(&engine.record_transaction(cmd).await?)
}

async fn summary(engine: &Engine, args: SummaryArgs, settings: &Settings) -> AppResult<()> {
    let policy = &settings.ledger;
    let tolerance = match args.tolerance {
        Some(flat) => Tolerance::flat(flat),
        None if args.cash_policy => {
            Tolerance::greater_of(policy.cash_tolerance_percent, policy.cash_tolerance_flat)
        }
        None => Tolerance::flat(policy.summary_tolerance),
    };
    let station = &args.station.station;

    let summary = match (args.date, args.from, args.to) {
        (_, Some(from), Some(to)) => engine.summarize(station, from, to, &tolerance).await?,
        (Some(date), _, _) => engine.summarize_day(station, date, &tolerance).await?,
        _ => {
            engine
                .summarize_day(station, Utc::now().date_naive(), &tolerance)
                .await?
        }
    };
    print_json(&summary)
}

fn run_tank(command: TankCommand, settings: &Settings) -> AppResult<()> {
    match command {
        TankCommand::Volume { capacity, depth } => {
            let capacity = TankCapacity::try_from(capacity)?;
            calibration::validate_depth(depth, capacity)?;
            print_json(&TankReading {
                capacity,
                depth_cm: depth,
                liters: calibration::depth_to_volume(depth, capacity),
            })?;
        }
        TankCommand::Depth { capacity, liters } => {
            let capacity = TankCapacity::try_from(capacity)?;
            print_json(&TankReading {
                capacity,
                depth_cm: calibration::volume_to_depth(liters, capacity),
                liters,
            })?;
        }
        TankCommand::Dip {
            capacity,
            depth,
            book,
        } => {
            let capacity = TankCapacity::try_from(capacity)?;
            let tolerance =
                Tolerance::percent_of_expected(settings.ledger.tank_tolerance_percent);
            print_json(&calibration::reconcile_dip(book, depth, capacity, &tolerance)?)?;
        }
    }
    Ok(())
}

/// Money fields are integer minor units, like every other JSON output.
#[derive(Debug, Serialize)]
struct BalanceView {
    station_id: String,
    safe_id: Uuid,
    at: Option<DateTime<Utc>>,
    balance: Money,
}

#[derive(Debug, Serialize)]
struct TankReading {
    capacity: TankCapacity,
    depth_cm: Decimal,
    liters: Decimal,
}

fn print_json<T: Serialize>(value: &T) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

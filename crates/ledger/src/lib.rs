//! Station cash ledger and reconciliation engine.
//!
//! Each station owns one [`Safe`]. Its balance at any instant is rebuilt by
//! replaying dated [`SafeTransaction`]s, which may be recorded out of order.
//! Period summaries and stock checks share one tolerance-based
//! [`variance::classify`].

pub use bank_transactions::BankTransaction;
pub use banks::Bank;
pub use calibration::TankCapacity;
pub use commands::{BankLink, RecordSafeTxCmd, TxRefs};
pub use error::EngineError;
pub use money::Money;
pub use ops::{
    Engine, EngineBuilder, InflowTotals, LedgerLine, OutflowTotals, PeriodSummary,
    SafeReconciliation, SafeTxFilter, UnitOfWork,
};
pub use safe_transactions::{LedgerEffect, SafeTransaction, SafeTxKind, StoredKind};
pub use safes::Safe;
pub use variance::{Tolerance, VarianceResult};

mod bank_transactions;
mod banks;
pub mod calibration;
mod commands;
mod error;
mod locks;
pub mod money;
mod ops;
mod safe_transactions;
mod safes;
mod util;
pub mod variance;

pub type ResultEngine<T> = Result<T, EngineError>;

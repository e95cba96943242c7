//! Period summaries of a station's safe.
//!
//! A summary is recomputed from history on every call. The opening balance is
//! a replay up to the start of the window, the actual closing balance an
//! independent replay up to its end, and the verdict compares the latter with
//! `opening + inflows - outflows`.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine, SafeTxKind, Tolerance, VarianceResult, safe_transactions,
    safes, util::{parse_uuid, required_text}, variance::classify_with,
};

use super::{
    Engine,
    replay::{Until, replay},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InflowTotals {
    pub cash_sales: Money,
    pub card_payments: Money,
    pub credit_payments: Money,
    pub cheques_received: Money,
    pub loan_repayments: Money,
    pub total: Money,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutflowTotals {
    pub expenses: Money,
    pub bank_deposits: Money,
    pub loans_given: Money,
    /// Delivery payments, handovers, adjustments and kinds this build does
    /// not know.
    pub other: Money,
    pub total: Money,
}

/// One entry as shown in an audit listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub id: Uuid,
    /// Stored kind; may be a kind this build does not know.
    pub kind: String,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub performed_by: String,
    pub balance_after: Money,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub station_id: String,
    pub safe_id: Option<Uuid>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub opening_balance: Money,
    pub inflows: InflowTotals,
    pub outflows: OutflowTotals,
    pub expected_closing: Money,
    pub actual_closing: Money,
    pub variance: VarianceResult,
    pub is_balanced: bool,
    pub inflow_lines: Vec<LedgerLine>,
    pub outflow_lines: Vec<LedgerLine>,
    /// Physical counts inside the window. They move the actual closing
    /// balance but are not inflows or outflows.
    pub recounts: Vec<LedgerLine>,
}

#[derive(Clone, Copy)]
enum Bucket {
    CashSales,
    CardPayments,
    CreditPayments,
    ChequesReceived,
    LoanRepayments,
    Expenses,
    BankDeposits,
    LoansGiven,
    Other,
    Recount,
}

fn bucket_of(kind: &str) -> Bucket {
    let Ok(kind) = SafeTxKind::try_from(kind) else {
        return Bucket::Other;
    };
    match kind {
        SafeTxKind::OpeningBalance => Bucket::Recount,
        SafeTxKind::CashFuelSales => Bucket::CashSales,
        SafeTxKind::PosCardPayment => Bucket::CardPayments,
        SafeTxKind::CreditPayment => Bucket::CreditPayments,
        SafeTxKind::ChequeReceived => Bucket::ChequesReceived,
        SafeTxKind::LoanRepaid => Bucket::LoanRepayments,
        SafeTxKind::Expense => Bucket::Expenses,
        SafeTxKind::BankDeposit => Bucket::BankDeposits,
        SafeTxKind::LoanGiven => Bucket::LoansGiven,
        SafeTxKind::FuelDeliveryPayment | SafeTxKind::CashHandover | SafeTxKind::Adjustment => {
            Bucket::Other
        }
    }
}

fn line(model: safe_transactions::Model) -> ResultEngine<LedgerLine> {
    Ok(LedgerLine {
        id: parse_uuid(&model.id, "safe transaction")?,
        kind: model.kind,
        amount: Money::new(model.amount_minor),
        timestamp: model.timestamp,
        description: model.description,
        performed_by: model.performed_by,
        balance_after: Money::new(model.balance_after_minor),
    })
}

fn add(total: &mut Money, amount: Money) -> ResultEngine<()> {
    *total = total
        .checked_add(amount)
        .ok_or_else(|| EngineError::InvalidArgument("summary total overflow".to_string()))?;
    Ok(())
}

impl PeriodSummary {
    fn empty(
        station_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tolerance: &Tolerance,
    ) -> Self {
        let variance = classify_with(Money::ZERO.to_decimal(), Money::ZERO.to_decimal(), tolerance);
        Self {
            station_id,
            safe_id: None,
            start,
            end,
            opening_balance: Money::ZERO,
            inflows: InflowTotals::default(),
            outflows: OutflowTotals::default(),
            expected_closing: Money::ZERO,
            actual_closing: Money::ZERO,
            is_balanced: variance.is_normal,
            variance,
            inflow_lines: Vec::new(),
            outflow_lines: Vec::new(),
            recounts: Vec::new(),
        }
    }
}

impl Engine {
    /// Summarizes a station's safe over `[start, end]`, both inclusive.
    ///
    /// A station without a safe yields an all-zero, balanced summary.
    pub async fn summarize(
        &self,
        station_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        tolerance: &Tolerance,
    ) -> ResultEngine<PeriodSummary> {
        let station_id = required_text(station_id, "station id")?;
        if start > end {
            return Err(EngineError::InvalidArgument(
                "invalid range: start must be <= end".to_string(),
            ));
        }

        let Some(safe) = safes::Entity::find()
            .filter(safes::Column::StationId.eq(station_id.clone()))
            .one(&self.database)
            .await?
        else {
            debug!(station_id = %station_id, "no safe, empty summary");
            return Ok(PeriodSummary::empty(station_id, start, end, tolerance));
        };

        let opening_balance = replay(&self.database, &safe, Until::Before(start)).await?;
        let actual_closing = replay(&self.database, &safe, Until::AtOrBefore(end)).await?;

        let window = safe_transactions::Entity::find()
            .filter(safe_transactions::Column::SafeId.eq(safe.id.clone()))
            .filter(safe_transactions::Column::Timestamp.gte(start))
            .filter(safe_transactions::Column::Timestamp.lte(end))
            .order_by_asc(safe_transactions::Column::Timestamp)
            .order_by_asc(safe_transactions::Column::Seq)
            .all(&self.database)
            .await?;

        let mut inflows = InflowTotals::default();
        let mut outflows = OutflowTotals::default();
        let mut inflow_lines = Vec::new();
        let mut outflow_lines = Vec::new();
        let mut recounts = Vec::new();

        for model in window {
            let bucket = bucket_of(&model.kind);
            let entry = line(model)?;
            let amount = entry.amount;
            match bucket {
                Bucket::Recount => {
                    recounts.push(entry);
                    continue;
                }
                Bucket::CashSales => add(&mut inflows.cash_sales, amount)?,
                Bucket::CardPayments => add(&mut inflows.card_payments, amount)?,
                Bucket::CreditPayments => add(&mut inflows.credit_payments, amount)?,
                Bucket::ChequesReceived => add(&mut inflows.cheques_received, amount)?,
                Bucket::LoanRepayments => add(&mut inflows.loan_repayments, amount)?,
                Bucket::Expenses => add(&mut outflows.expenses, amount)?,
                Bucket::BankDeposits => add(&mut outflows.bank_deposits, amount)?,
                Bucket::LoansGiven => add(&mut outflows.loans_given, amount)?,
                Bucket::Other => add(&mut outflows.other, amount)?,
            }
            match bucket {
                Bucket::CashSales
                | Bucket::CardPayments
                | Bucket::CreditPayments
                | Bucket::ChequesReceived
                | Bucket::LoanRepayments => {
                    add(&mut inflows.total, amount)?;
                    inflow_lines.push(entry);
                }
                _ => {
                    add(&mut outflows.total, amount)?;
                    outflow_lines.push(entry);
                }
            }
        }

        let expected_closing = opening_balance
            .checked_add(inflows.total)
            .and_then(|v| v.checked_sub(outflows.total))
            .ok_or_else(|| EngineError::InvalidArgument("summary total overflow".to_string()))?;
        let variance = classify_with(
            expected_closing.to_decimal(),
            actual_closing.to_decimal(),
            tolerance,
        );

        if !variance.is_normal {
            warn!(
                station_id = %station_id,
                %expected_closing,
                %actual_closing,
                variance = %variance.variance,
                "safe period does not balance"
            );
        }

        Ok(PeriodSummary {
            station_id,
            safe_id: Some(parse_uuid(&safe.id, "safe")?),
            start,
            end,
            opening_balance,
            inflows,
            outflows,
            expected_closing,
            actual_closing,
            is_balanced: variance.is_normal,
            variance,
            inflow_lines,
            outflow_lines,
            recounts,
        })
    }

    /// [`Engine::summarize`] over one UTC calendar day.
    pub async fn summarize_day(
        &self,
        station_id: &str,
        date: NaiveDate,
        tolerance: &Tolerance,
    ) -> ResultEngine<PeriodSummary> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid date: {date}")))?
            .and_utc();
        let end = date
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(|| EngineError::InvalidArgument(format!("invalid date: {date}")))?
            .and_utc();
        self.summarize(station_id, start, end, tolerance).await
    }
}

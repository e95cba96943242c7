//! Safe transaction primitives.
//!
//! A `SafeTransaction` is one dated entry in a station's cash ledger. Its
//! amount is always positive; the sign comes from the kind through
//! [`LedgerEffect`].

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, TxRefs, util::parse_uuid};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafeTxKind {
    OpeningBalance,
    CashFuelSales,
    PosCardPayment,
    CreditPayment,
    ChequeReceived,
    LoanRepaid,
    Expense,
    BankDeposit,
    LoanGiven,
    FuelDeliveryPayment,
    CashHandover,
    Adjustment,
}

/// How a transaction kind moves the running balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEffect {
    /// Replaces the running balance with the amount (a physical count).
    Override,
    Inflow,
    Outflow,
}

impl SafeTxKind {
    pub const ALL: [SafeTxKind; 12] = [
        Self::OpeningBalance,
        Self::CashFuelSales,
        Self::PosCardPayment,
        Self::CreditPayment,
        Self::ChequeReceived,
        Self::LoanRepaid,
        Self::Expense,
        Self::BankDeposit,
        Self::LoanGiven,
        Self::FuelDeliveryPayment,
        Self::CashHandover,
        Self::Adjustment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpeningBalance => "OPENING_BALANCE",
            Self::CashFuelSales => "CASH_FUEL_SALES",
            Self::PosCardPayment => "POS_CARD_PAYMENT",
            Self::CreditPayment => "CREDIT_PAYMENT",
            Self::ChequeReceived => "CHEQUE_RECEIVED",
            Self::LoanRepaid => "LOAN_REPAID",
            Self::Expense => "EXPENSE",
            Self::BankDeposit => "BANK_DEPOSIT",
            Self::LoanGiven => "LOAN_GIVEN",
            Self::FuelDeliveryPayment => "FUEL_DELIVERY_PAYMENT",
            Self::CashHandover => "CASH_HANDOVER",
            Self::Adjustment => "ADJUSTMENT",
        }
    }

    #[must_use]
    pub const fn effect(self) -> LedgerEffect {
        match self {
            Self::OpeningBalance => LedgerEffect::Override,
            Self::CashFuelSales
            | Self::PosCardPayment
            | Self::CreditPayment
            | Self::ChequeReceived
            | Self::LoanRepaid => LedgerEffect::Inflow,
            Self::Expense
            | Self::BankDeposit
            | Self::LoanGiven
            | Self::FuelDeliveryPayment
            | Self::CashHandover
            | Self::Adjustment => LedgerEffect::Outflow,
        }
    }
}

impl core::fmt::Display for SafeTxKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for SafeTxKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown transaction type: {value}")))
    }
}

impl FromStr for SafeTxKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_ascii_uppercase().as_str())
    }
}

/// Kind of an entry read back from storage.
///
/// Rows written by a newer build may carry kinds this build does not know.
/// They keep their stored name and replay as outflows.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredKind {
    Known(SafeTxKind),
    Unknown(String),
}

impl StoredKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(kind) => kind.as_str(),
            Self::Unknown(raw) => raw,
        }
    }

    pub fn known(&self) -> Option<SafeTxKind> {
        match self {
            Self::Known(kind) => Some(*kind),
            Self::Unknown(_) => None,
        }
    }

    #[must_use]
    pub fn effect(&self) -> LedgerEffect {
        self.known()
            .map_or(LedgerEffect::Outflow, SafeTxKind::effect)
    }
}

impl From<SafeTxKind> for StoredKind {
    fn from(kind: SafeTxKind) -> Self {
        Self::Known(kind)
    }
}

impl From<&str> for StoredKind {
    fn from(raw: &str) -> Self {
        SafeTxKind::try_from(raw).map_or_else(|_| Self::Unknown(raw.to_string()), Self::Known)
    }
}

impl PartialEq<SafeTxKind> for StoredKind {
    fn eq(&self, other: &SafeTxKind) -> bool {
        self.known() == Some(*other)
    }
}

impl core::fmt::Display for StoredKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LedgerEffect {
    /// Applies `amount` to a running `balance`.
    pub fn apply(self, balance: Money, amount: Money) -> ResultEngine<Money> {
        let next = match self {
            Self::Override => Some(amount),
            Self::Inflow => balance.checked_add(amount),
            Self::Outflow => balance.checked_sub(amount),
        };
        next.ok_or_else(|| EngineError::InvalidArgument("balance overflow".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeTransaction {
    pub id: Uuid,
    pub safe_id: Uuid,
    /// Insertion order within the safe; breaks ties between equal timestamps.
    pub seq: i64,
    pub kind: StoredKind,
    pub amount: Money,
    /// Snapshot at insertion time. Later backdated entries do not rewrite it.
    pub balance_before: Money,
    pub balance_after: Money,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub performed_by: String,
    pub refs: TxRefs,
    pub bank_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "safe_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub safe_id: String,
    pub seq: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub balance_before_minor: i64,
    pub balance_after_minor: i64,
    pub timestamp: DateTimeUtc,
    pub description: String,
    pub performed_by: String,
    pub shift_id: Option<String>,
    pub expense_id: Option<String>,
    pub loan_id: Option<String>,
    pub deposit_id: Option<String>,
    pub cheque_id: Option<String>,
    pub credit_sale_id: Option<String>,
    pub batch_id: Option<String>,
    pub bank_transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::safes::Entity",
        from = "Column::SafeId",
        to = "super::safes::Column::Id"
    )]
    Safes,
}

impl Related<super::safes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Safes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&SafeTransaction> for ActiveModel {
    fn from(tx: &SafeTransaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            safe_id: ActiveValue::Set(tx.safe_id.to_string()),
            seq: ActiveValue::Set(tx.seq),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            balance_before_minor: ActiveValue::Set(tx.balance_before.minor()),
            balance_after_minor: ActiveValue::Set(tx.balance_after.minor()),
            timestamp: ActiveValue::Set(tx.timestamp),
            description: ActiveValue::Set(tx.description.clone()),
            performed_by: ActiveValue::Set(tx.performed_by.clone()),
            shift_id: ActiveValue::Set(tx.refs.shift_id.clone()),
            expense_id: ActiveValue::Set(tx.refs.expense_id.clone()),
            loan_id: ActiveValue::Set(tx.refs.loan_id.clone()),
            deposit_id: ActiveValue::Set(tx.refs.deposit_id.clone()),
            cheque_id: ActiveValue::Set(tx.refs.cheque_id.clone()),
            credit_sale_id: ActiveValue::Set(tx.refs.credit_sale_id.clone()),
            batch_id: ActiveValue::Set(tx.refs.batch_id.clone()),
            bank_transaction_id: ActiveValue::Set(tx.bank_transaction_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for SafeTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "safe transaction")?,
            safe_id: parse_uuid(&model.safe_id, "safe")?,
            seq: model.seq,
            kind: StoredKind::from(model.kind.as_str()),
            amount: Money::new(model.amount_minor),
            balance_before: Money::new(model.balance_before_minor),
            balance_after: Money::new(model.balance_after_minor),
            timestamp: model.timestamp,
            description: model.description,
            performed_by: model.performed_by,
            refs: TxRefs {
                shift_id: model.shift_id,
                expense_id: model.expense_id,
                loan_id: model.loan_id,
                deposit_id: model.deposit_id,
                cheque_id: model.cheque_id,
                credit_sale_id: model.credit_sale_id,
                batch_id: model.batch_id,
            },
            bank_transaction_id: model
                .bank_transaction_id
                .map(|id| parse_uuid(&id, "bank transaction"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_storage_name() {
        for kind in SafeTxKind::ALL {
            assert_eq!(SafeTxKind::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn parsing_is_case_insensitive_but_strict() {
        assert_eq!(
            "bank_deposit".parse::<SafeTxKind>().unwrap(),
            SafeTxKind::BankDeposit
        );
        assert_eq!(
            "CASH_REFUND".parse::<SafeTxKind>(),
            Err(EngineError::InvalidArgument(
                "unknown transaction type: CASH_REFUND".to_string()
            ))
        );
    }

    #[test]
    fn effect_table() {
        use SafeTxKind::*;

        assert_eq!(OpeningBalance.effect(), LedgerEffect::Override);
        for kind in [CashFuelSales, PosCardPayment, CreditPayment, ChequeReceived, LoanRepaid] {
            assert_eq!(kind.effect(), LedgerEffect::Inflow, "{kind}");
        }
        for kind in [
            Expense,
            BankDeposit,
            LoanGiven,
            FuelDeliveryPayment,
            CashHandover,
            Adjustment,
        ] {
            assert_eq!(kind.effect(), LedgerEffect::Outflow, "{kind}");
        }
    }

    #[test]
    fn unknown_stored_kind_keeps_its_name_and_replays_as_outflow() {
        let unknown = StoredKind::from("SUPPLIER_REFUND");
        assert_eq!(unknown, StoredKind::Unknown("SUPPLIER_REFUND".to_string()));
        assert_eq!(unknown.as_str(), "SUPPLIER_REFUND");
        assert_eq!(unknown.effect(), LedgerEffect::Outflow);

        let known = StoredKind::from("LOAN_REPAID");
        assert_eq!(known, SafeTxKind::LoanRepaid);
        assert_eq!(known.effect(), LedgerEffect::Inflow);
    }

    #[test]
    fn stored_kind_serializes_as_its_name() {
        assert_eq!(
            serde_json::to_value(StoredKind::from(SafeTxKind::BankDeposit)).unwrap(),
            serde_json::json!("BANK_DEPOSIT")
        );
        assert_eq!(
            serde_json::from_value::<StoredKind>(serde_json::json!("SUPPLIER_REFUND")).unwrap(),
            StoredKind::Unknown("SUPPLIER_REFUND".to_string())
        );
        assert_eq!(
            serde_json::from_value::<StoredKind>(serde_json::json!("EXPENSE")).unwrap(),
            SafeTxKind::Expense
        );
    }

    #[test]
    fn apply_closure() {
        let before = Money::new(10_000);
        let amount = Money::new(2_550);
        assert_eq!(
            LedgerEffect::Inflow.apply(before, amount).unwrap(),
            Money::new(12_550)
        );
        assert_eq!(
            LedgerEffect::Outflow.apply(before, amount).unwrap(),
            Money::new(7_450)
        );
        assert_eq!(LedgerEffect::Override.apply(before, amount).unwrap(), amount);
        assert!(LedgerEffect::Inflow.apply(Money::new(i64::MAX), amount).is_err());
    }
}

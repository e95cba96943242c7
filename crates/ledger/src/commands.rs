//! Command structs for ledger writes.
//!
//! Originators (expense recording, credit payments, loans, deposits, delivery
//! payments) build a [`RecordSafeTxCmd`] and hand it to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Money, SafeTxKind};

/// Weak references to the business record that caused a safe entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRefs {
    pub shift_id: Option<String>,
    pub expense_id: Option<String>,
    pub loan_id: Option<String>,
    pub deposit_id: Option<String>,
    pub cheque_id: Option<String>,
    pub credit_sale_id: Option<String>,
    pub batch_id: Option<String>,
}

impl TxRefs {
    #[must_use]
    pub fn shift_id(mut self, id: impl Into<String>) -> Self {
        self.shift_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn expense_id(mut self, id: impl Into<String>) -> Self {
        self.expense_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn loan_id(mut self, id: impl Into<String>) -> Self {
        self.loan_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn deposit_id(mut self, id: impl Into<String>) -> Self {
        self.deposit_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn cheque_id(mut self, id: impl Into<String>) -> Self {
        self.cheque_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn credit_sale_id(mut self, id: impl Into<String>) -> Self {
        self.credit_sale_id = Some(id.into());
        self
    }

    #[must_use]
    pub fn batch_id(mut self, id: impl Into<String>) -> Self {
        self.batch_id = Some(id.into());
        self
    }
}

/// Target account of a `BANK_DEPOSIT`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankLink {
    pub bank_id: Uuid,
    pub reference_number: Option<String>,
}

impl BankLink {
    #[must_use]
    pub fn new(bank_id: Uuid) -> Self {
        Self {
            bank_id,
            reference_number: None,
        }
    }

    #[must_use]
    pub fn reference_number(mut self, reference: impl Into<String>) -> Self {
        self.reference_number = Some(reference.into());
        self
    }
}

/// Record one entry in a safe.
#[derive(Clone, Debug)]
pub struct RecordSafeTxCmd {
    pub safe_id: Uuid,
    pub kind: SafeTxKind,
    pub amount: Money,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    pub performed_by: String,
    pub refs: TxRefs,
    pub bank: Option<BankLink>,
}

impl RecordSafeTxCmd {
    #[must_use]
    pub fn new(
        safe_id: Uuid,
        kind: SafeTxKind,
        amount: Money,
        timestamp: DateTime<Utc>,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            safe_id,
            kind,
            amount,
            timestamp,
            description: kind.as_str().to_string(),
            performed_by: performed_by.into(),
            refs: TxRefs::default(),
            bank: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn refs(mut self, refs: TxRefs) -> Self {
        self.refs = refs;
        self
    }

    /// Only valid on `BANK_DEPOSIT`.
    #[must_use]
    pub fn bank(mut self, link: BankLink) -> Self {
        self.bank = Some(link);
        self
    }
}

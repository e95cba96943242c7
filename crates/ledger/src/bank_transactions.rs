//! Bank-side rows written alongside `BANK_DEPOSIT` safe entries.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// Stored kind of a deposit coming from a safe.
pub(crate) const DEPOSIT_KIND: &str = "DEPOSIT";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: Uuid,
    pub bank_id: Uuid,
    pub station_id: String,
    pub kind: String,
    pub amount: Money,
    pub description: String,
    pub reference_number: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub created_by: String,
    pub safe_transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "bank_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub bank_id: String,
    pub station_id: String,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub reference_number: Option<String>,
    pub transaction_date: DateTimeUtc,
    pub created_by: String,
    pub safe_transaction_id: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::banks::Entity",
        from = "Column::BankId",
        to = "super::banks::Column::Id"
    )]
    Banks,
}

impl Related<super::banks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Banks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&BankTransaction> for ActiveModel {
    fn from(tx: &BankTransaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            bank_id: ActiveValue::Set(tx.bank_id.to_string()),
            station_id: ActiveValue::Set(tx.station_id.clone()),
            kind: ActiveValue::Set(tx.kind.clone()),
            amount_minor: ActiveValue::Set(tx.amount.minor()),
            description: ActiveValue::Set(tx.description.clone()),
            reference_number: ActiveValue::Set(tx.reference_number.clone()),
            transaction_date: ActiveValue::Set(tx.transaction_date),
            created_by: ActiveValue::Set(tx.created_by.clone()),
            safe_transaction_id: ActiveValue::Set(tx.safe_transaction_id.map(|id| id.to_string())),
            created_at: ActiveValue::Set(tx.created_at),
        }
    }
}

impl TryFrom<Model> for BankTransaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "bank transaction")?,
            bank_id: parse_uuid(&model.bank_id, "bank")?,
            station_id: model.station_id,
            kind: model.kind,
            amount: Money::new(model.amount_minor),
            description: model.description,
            reference_number: model.reference_number,
            transaction_date: model.transaction_date,
            created_by: model.created_by,
            safe_transaction_id: model
                .safe_transaction_id
                .map(|id| parse_uuid(&id, "safe transaction"))
                .transpose()?,
            created_at: model.created_at,
        })
    }
}

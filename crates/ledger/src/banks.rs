//! Bank accounts that receive safe deposits.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bank {
    pub id: Uuid,
    pub name: String,
    pub account_number: Option<String>,
    pub current_balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Bank {
    pub fn new(name: String, account_number: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            account_number,
            current_balance: Money::ZERO,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "banks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub account_number: Option<String>,
    pub current_balance_minor: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::bank_transactions::Entity")]
    BankTransactions,
}

impl Related<super::bank_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BankTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Bank> for ActiveModel {
    fn from(bank: &Bank) -> Self {
        Self {
            id: ActiveValue::Set(bank.id.to_string()),
            name: ActiveValue::Set(bank.name.clone()),
            account_number: ActiveValue::Set(bank.account_number.clone()),
            current_balance_minor: ActiveValue::Set(bank.current_balance.minor()),
            created_at: ActiveValue::Set(bank.created_at),
        }
    }
}

impl TryFrom<Model> for Bank {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "bank")?,
            name: model.name,
            account_number: model.account_number,
            current_balance: Money::new(model.current_balance_minor),
            created_at: model.created_at,
        })
    }
}

//! The `Safe` is the cash ledger of one station.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// Per-station cash ledger.
///
/// `opening_balance` is the baseline replay starts from and never changes
/// after creation. `current_balance` is a cache of the full replay; reports
/// recompute instead of trusting it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Safe {
    pub id: Uuid,
    pub station_id: String,
    pub opening_balance: Money,
    pub current_balance: Money,
    pub last_counted_at: Option<DateTime<Utc>>,
    pub counted_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Safe {
    pub fn new(station_id: String, opening_balance: Money, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            station_id,
            opening_balance,
            current_balance: opening_balance,
            last_counted_at: None,
            counted_by: None,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "safes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub station_id: String,
    pub opening_balance_minor: i64,
    pub current_balance_minor: i64,
    pub last_counted_at: Option<DateTimeUtc>,
    pub counted_by: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::safe_transactions::Entity")]
    SafeTransactions,
}

impl Related<super::safe_transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SafeTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Safe> for ActiveModel {
    fn from(safe: &Safe) -> Self {
        Self {
            id: ActiveValue::Set(safe.id.to_string()),
            station_id: ActiveValue::Set(safe.station_id.clone()),
            opening_balance_minor: ActiveValue::Set(safe.opening_balance.minor()),
            current_balance_minor: ActiveValue::Set(safe.current_balance.minor()),
            last_counted_at: ActiveValue::Set(safe.last_counted_at),
            counted_by: ActiveValue::Set(safe.counted_by.clone()),
            created_at: ActiveValue::Set(safe.created_at),
        }
    }
}

impl TryFrom<Model> for Safe {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "safe")?,
            station_id: model.station_id,
            opening_balance: Money::new(model.opening_balance_minor),
            current_balance: Money::new(model.current_balance_minor),
            last_counted_at: model.last_counted_at,
            counted_by: model.counted_by,
            created_at: model.created_at,
        })
    }
}

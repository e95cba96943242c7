use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use tracing::debug;
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, StoredKind, safe_transactions, safes};

use super::Engine;

/// Upper bound of a replay.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Until {
    /// `timestamp <= at`
    AtOrBefore(DateTime<Utc>),
    /// `timestamp < at`
    Before(DateTime<Utc>),
    Everything,
}

/// Folds `(kind, amount)` rows, already in ledger order, onto `opening`.
pub(crate) fn fold_balance<I>(opening: Money, rows: I) -> ResultEngine<Money>
where
    I: IntoIterator<Item = (String, i64)>,
{
    rows.into_iter().try_fold(opening, |balance, (kind, amount_minor)| {
        StoredKind::from(kind.as_str()).effect().apply(balance, Money::new(amount_minor))
    })
}

/// Rebuilds a safe's balance from its opening balance and history.
///
/// History is ordered by `(timestamp, seq)`; `OPENING_BALANCE` entries
/// replace the running balance.
pub(crate) async fn replay<C: ConnectionTrait>(
    db: &C,
    safe: &safes::Model,
    until: Until,
) -> ResultEngine<Money> {
    let mut query = safe_transactions::Entity::find()
        .filter(safe_transactions::Column::SafeId.eq(safe.id.clone()));
    query = match until {
        Until::AtOrBefore(at) => query.filter(safe_transactions::Column::Timestamp.lte(at)),
        Until::Before(at) => query.filter(safe_transactions::Column::Timestamp.lt(at)),
        Until::Everything => query,
    };
    let rows: Vec<(String, i64)> = query
        .order_by_asc(safe_transactions::Column::Timestamp)
        .order_by_asc(safe_transactions::Column::Seq)
        .select_only()
        .column(safe_transactions::Column::Kind)
        .column(safe_transactions::Column::AmountMinor)
        .into_tuple()
        .all(db)
        .await?;

    let balance = fold_balance(Money::new(safe.opening_balance_minor), rows.iter().cloned())?;
    debug!(safe_id = %safe.id, ?until, rows = rows.len(), %balance, "safe replayed");
    Ok(balance)
}

pub(crate) async fn require_safe<C: ConnectionTrait>(
    db: &C,
    safe_id: Uuid,
) -> ResultEngine<safes::Model> {
    safes::Entity::find_by_id(safe_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("safe {safe_id}")))
}

impl Engine {
    /// Balance of a safe as of `as_of`, including entries stamped exactly at
    /// `as_of`.
    ///
    /// Always a full replay; the cached `current_balance` is not consulted.
    pub async fn compute_balance_before(
        &self,
        safe_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> ResultEngine<Money> {
        let safe = require_safe(&self.database, safe_id).await?;
        replay(&self.database, &safe, Until::AtOrBefore(as_of)).await
    }
}

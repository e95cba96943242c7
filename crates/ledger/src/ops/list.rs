use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, SafeTransaction, SafeTxKind, safe_transactions};

use super::{Engine, replay::require_safe};

/// Filters for listing safe transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct SafeTxFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// If present, acts as an allow-list of kinds to return.
    pub kinds: Option<Vec<SafeTxKind>>,
    pub shift_id: Option<String>,
    /// Newest first when `true` (default: oldest first).
    pub newest_first: bool,
    pub limit: Option<u64>,
}

fn validate_list_filter(filter: &SafeTxFilter) -> ResultEngine<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(EngineError::InvalidArgument(
            "invalid range: from must be < to".to_string(),
        ));
    }
    if filter.kinds.as_ref().is_some_and(|k| k.is_empty()) {
        return Err(EngineError::InvalidArgument(
            "kinds must not be empty".to_string(),
        ));
    }
    if filter.limit == Some(0) {
        return Err(EngineError::InvalidArgument(
            "limit must be > 0".to_string(),
        ));
    }
    Ok(())
}

trait ApplySafeTxFilters: QueryFilter + Sized {
    fn apply_safe_tx_filters(self, filter: &SafeTxFilter) -> Self;
}

impl<T> ApplySafeTxFilters for T
where
    T: QueryFilter + Sized,
{
    fn apply_safe_tx_filters(mut self, filter: &SafeTxFilter) -> Self {
        if let Some(from) = filter.from {
            self = self.filter(safe_transactions::Column::Timestamp.gte(from));
        }
        if let Some(to) = filter.to {
            self = self.filter(safe_transactions::Column::Timestamp.lt(to));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            self = self.filter(safe_transactions::Column::Kind.is_in(kinds));
        }
        if let Some(shift_id) = &filter.shift_id {
            self = self.filter(safe_transactions::Column::ShiftId.eq(shift_id.clone()));
        }
        self
    }
}

impl Engine {
    /// Lists a safe's entries in ledger order `(timestamp, seq)`.
    pub async fn list_transactions(
        &self,
        safe_id: Uuid,
        filter: &SafeTxFilter,
    ) -> ResultEngine<Vec<SafeTransaction>> {
        validate_list_filter(filter)?;
        require_safe(&self.database, safe_id).await?;

        let mut query = safe_transactions::Entity::find()
            .filter(safe_transactions::Column::SafeId.eq(safe_id.to_string()))
            .apply_safe_tx_filters(filter);
        query = if filter.newest_first {
            query
                .order_by_desc(safe_transactions::Column::Timestamp)
                .order_by_desc(safe_transactions::Column::Seq)
        } else {
            query
                .order_by_asc(safe_transactions::Column::Timestamp)
                .order_by_asc(safe_transactions::Column::Seq)
        };
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .all(&self.database)
            .await?
            .into_iter()
            .map(SafeTransaction::try_from)
            .collect()
    }

    pub async fn transaction(&self, transaction_id: Uuid) -> ResultEngine<SafeTransaction> {
        let model = safe_transactions::Entity::find_by_id(transaction_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("safe transaction {transaction_id}")))?;
        SafeTransaction::try_from(model)
    }
}

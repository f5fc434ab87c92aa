// Copyright 2026 The SlipShark Project
// SPDX-License-Identifier: Apache-2.0

// Daily query quota
//
// A fixed number of research queries per local calendar day, persisted as a
// single JSON record ({"queryCount", "lastReset"}) in a key-value store.
// The day resets at local midnight, not 24 hours after first use.
//
// Reads never fail: a missing, unreadable or stale record counts as a fresh
// zero-count record stamped now. Only `try_consume_one` writes.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::storage::{KeyValueStore, StoreError};

pub const DAILY_QUERY_LIMIT: u32 = 5;
pub const STORAGE_KEY: &str = "slipshark_query_data";

/// The persisted quota record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryData {
    pub query_count: u32,
    pub last_reset: DateTime<Utc>,
}

impl QueryData {
    fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            query_count: 0,
            last_reset: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Wall clock plus the local calendar used for day boundaries.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate;
}

/// The machine's clock and timezone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&Local).date_naive()
    }
}

// ---------------------------------------------------------------------------
// Rate limiter
// ---------------------------------------------------------------------------

pub struct RateLimiter {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    limit: u32,
    key: String,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            limit: DAILY_QUERY_LIMIT,
            key: STORAGE_KEY.to_string(),
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn daily_limit(&self) -> u32 {
        self.limit
    }

    /// Today's effective record. Never persists anything.
    pub fn current_record(&self) -> QueryData {
        let now = self.clock.now();

        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return QueryData::fresh(now),
            Err(e) => {
                tracing::warn!(error = %e, "quota store unreadable, starting fresh");
                return QueryData::fresh(now);
            }
        };

        let data: QueryData = match serde_json::from_str(&raw) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(error = %e, "quota record malformed, starting fresh");
                return QueryData::fresh(now);
            }
        };

        if self.clock.local_date(data.last_reset) != self.clock.local_date(now) {
            return QueryData::fresh(now);
        }
        data
    }

    /// Queries used today.
    pub fn query_count(&self) -> u32 {
        self.current_record().query_count
    }

    /// Queries left today, in `0..=daily_limit()`.
    pub fn remaining_queries(&self) -> u32 {
        self.limit.saturating_sub(self.query_count())
    }

    /// Spend one query. `Ok(false)` when the quota is exhausted, in which
    /// case nothing is written.
    pub fn try_consume_one(&self) -> Result<bool, StoreError> {
        let mut data = self.current_record();
        if data.query_count >= self.limit {
            tracing::info!(limit = self.limit, "daily query limit reached");
            return Ok(false);
        }

        data.query_count += 1;
        let json = serde_json::to_string(&data).map_err(StoreError::Encode)?;
        self.store.set(&self.key, &json)?;

        tracing::debug!(
            query_count = data.query_count,
            remaining = self.limit - data.query_count,
            "query consumed"
        );
        Ok(true)
    }
}

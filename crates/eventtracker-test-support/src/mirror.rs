//! In-memory `MirrorRepository` implementations for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use eventtracker_core::error::MirrorError;
use eventtracker_core::mirror::{InsertOutcome, MirrorRepository, MirrorRow, NewMirrorRow};
use tokio::sync::Barrier;

/// A mirror table held in memory.
///
/// Enforces the `blockchain_tx_id` unique constraint unless built with
/// [`MemoryMirror::without_unique_constraint`]. With
/// [`MemoryMirror::with_interleaved_checks`], the first `n` calls to
/// `find_by_tx_id` each wait after reading until all `n` have read, which
/// forces concurrent check-then-insert sequences to interleave.
#[derive(Debug)]
pub struct MemoryMirror {
    rows: Mutex<Vec<MirrorRow>>,
    next_id: AtomicI64,
    enforce_unique: bool,
    check_barrier: Option<(Barrier, usize)>,
    checks_seen: AtomicUsize,
    created_at: DateTime<Utc>,
}

impl Default for MemoryMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMirror {
    /// An empty table with the unique constraint.
    ///
    /// # Panics
    ///
    /// Never; the fixed creation time is valid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            enforce_unique: true,
            check_barrier: None,
            checks_seen: AtomicUsize::new(0),
            created_at: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 1).unwrap(),
        }
    }

    /// An empty table without the unique constraint.
    #[must_use]
    pub fn without_unique_constraint() -> Self {
        Self {
            enforce_unique: false,
            ..Self::new()
        }
    }

    /// Make the first `parties` existence checks rendezvous before returning.
    #[must_use]
    pub fn with_interleaved_checks(mut self, parties: usize) -> Self {
        self.check_barrier = Some((Barrier::new(parties), parties));
        self
    }

    /// Inserts a row directly, bypassing the constraint.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn seed(&self, row: NewMirrorRow) -> MirrorRow {
        let row = self.materialize(row);
        self.rows.lock().unwrap().push(row.clone());
        row
    }

    /// All rows in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn rows(&self) -> Vec<MirrorRow> {
        self.rows.lock().unwrap().clone()
    }

    fn materialize(&self, row: NewMirrorRow) -> MirrorRow {
        MirrorRow {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            event_type: row.event_type,
            latitude: row.latitude,
            longitude: row.longitude,
            blockchain_tx_id: row.blockchain_tx_id,
            created_at: self.created_at,
        }
    }
}

#[async_trait]
impl MirrorRepository for MemoryMirror {
    async fn find_by_tx_id(&self, tx_id: &str) -> Result<Option<MirrorRow>, MirrorError> {
        let found = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.blockchain_tx_id == tx_id)
            .cloned();
        let interleave = self
            .check_barrier
            .as_ref()
            .filter(|(_, parties)| self.checks_seen.fetch_add(1, Ordering::SeqCst) < *parties);
        if let Some((barrier, _)) = interleave {
            barrier.wait().await;
        }
        Ok(found)
    }

    async fn insert(&self, row: NewMirrorRow) -> Result<InsertOutcome, MirrorError> {
        let mut rows = self.rows.lock().unwrap();
        if self.enforce_unique
            && rows
                .iter()
                .any(|existing| existing.blockchain_tx_id == row.blockchain_tx_id)
        {
            return Ok(InsertOutcome::Conflict);
        }
        let row = self.materialize(row);
        rows.push(row.clone());
        Ok(InsertOutcome::Inserted(row))
    }

    async fn select_by_type(&self, event_type: &str) -> Result<Vec<MirrorRow>, MirrorError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn select_all(&self) -> Result<Vec<MirrorRow>, MirrorError> {
        Ok(self.rows())
    }

    async fn sample(&self, limit: i64) -> Result<Vec<MirrorRow>, MirrorError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self.rows().into_iter().take(limit).collect())
    }
}

/// Which mirror operation a [`FailingMirror`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePoint {
    /// `find_by_tx_id`.
    Check,
    /// `insert`.
    Insert,
    /// `select_by_type`, `select_all` and `sample`.
    Read,
}

/// A mirror that fails one kind of operation and delegates the rest to a
/// [`MemoryMirror`].
#[derive(Debug)]
pub struct FailingMirror {
    point: FailurePoint,
    error: MirrorError,
    inner: MemoryMirror,
}

impl FailingMirror {
    /// Fails `point` with `error`.
    #[must_use]
    pub fn new(point: FailurePoint, error: MirrorError) -> Self {
        Self {
            point,
            error,
            inner: MemoryMirror::new(),
        }
    }

    /// The row-level-security rejection a hosted database returns for an
    /// unauthorized insert (SQLSTATE `42501`).
    #[must_use]
    pub fn insert_denied() -> Self {
        Self::new(
            FailurePoint::Insert,
            MirrorError::with_code(
                "new row violates row-level security policy for table \"events\"",
                "42501",
            ),
        )
    }

    /// The backing rows.
    #[must_use]
    pub fn rows(&self) -> Vec<MirrorRow> {
        self.inner.rows()
    }

    fn fail_if(&self, point: FailurePoint) -> Result<(), MirrorError> {
        if self.point == point {
            Err(self.error.clone())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MirrorRepository for FailingMirror {
    async fn find_by_tx_id(&self, tx_id: &str) -> Result<Option<MirrorRow>, MirrorError> {
        self.fail_if(FailurePoint::Check)?;
        self.inner.find_by_tx_id(tx_id).await
    }

    async fn insert(&self, row: NewMirrorRow) -> Result<InsertOutcome, MirrorError> {
        self.fail_if(FailurePoint::Insert)?;
        self.inner.insert(row).await
    }

    async fn select_by_type(&self, event_type: &str) -> Result<Vec<MirrorRow>, MirrorError> {
        self.fail_if(FailurePoint::Read)?;
        self.inner.select_by_type(event_type).await
    }

    async fn select_all(&self) -> Result<Vec<MirrorRow>, MirrorError> {
        self.fail_if(FailurePoint::Read)?;
        self.inner.select_all().await
    }

    async fn sample(&self, limit: i64) -> Result<Vec<MirrorRow>, MirrorError> {
        self.fail_if(FailurePoint::Read)?;
        self.inner.sample(limit).await
    }
}

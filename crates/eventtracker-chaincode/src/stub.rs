//! World-state interface seen by the contract.

use crate::error::ContractError;

/// A key and its raw stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue {
    /// World-state key.
    pub key: String,
    /// Raw stored bytes.
    pub value: Vec<u8>,
}

/// Result cursor of a rich query.
pub trait StateQueryIterator {
    /// Advances the cursor. `Ok(None)` marks the end of the results.
    fn next(&mut self) -> Result<Option<KeyValue>, ContractError>;

    /// Releases the cursor.
    fn close(&mut self) -> Result<(), ContractError>;
}

/// Transaction-scoped access to the ledger world state.
pub trait ChaincodeStub {
    /// Id of the transaction being executed.
    fn tx_id(&self) -> &str;

    /// Reads a key. An absent key yields an empty vector.
    fn get_state(&self, key: &str) -> Result<Vec<u8>, ContractError>;

    /// Writes a key, replacing any previous value.
    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), ContractError>;

    /// Attaches a named notification to the transaction.
    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ContractError>;

    /// Runs a selector query and returns a cursor over matching entries.
    fn get_query_result(
        &self,
        query: &str,
    ) -> Result<Box<dyn StateQueryIterator + '_>, ContractError>;
}

/// Owns a query cursor and closes it when dropped, unless it was already
/// closed explicitly through [`QueryCursor::close`].
pub struct QueryCursor<'a> {
    inner: Box<dyn StateQueryIterator + 'a>,
    closed: bool,
}

impl<'a> QueryCursor<'a> {
    /// Wraps an open cursor.
    #[must_use]
    pub fn new(inner: Box<dyn StateQueryIterator + 'a>) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Advances the wrapped cursor.
    ///
    /// # Errors
    ///
    /// Propagates the cursor's own failure.
    pub fn next(&mut self) -> Result<Option<KeyValue>, ContractError> {
        self.inner.next()
    }

    /// Closes the cursor and reports any failure to do so.
    ///
    /// # Errors
    ///
    /// Propagates the cursor's close failure.
    pub fn close(mut self) -> Result<(), ContractError> {
        self.closed = true;
        self.inner.close()
    }
}

impl Drop for QueryCursor<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.inner.close() {
            tracing::warn!(error = %e, "failed to close query cursor");
        }
    }
}

use std::sync::Arc;

use reqtx_core::error::{Result, TxError};

use crate::context::RequestItems;
use crate::session::Transaction;

pub const TRANSACTION_ITEM: &str = "reqtx.request_transaction";
pub const SIMULATION_ITEM: &str = "reqtx.request_simulation";

/// What `begin` hands over to `close` for one request.
#[derive(Clone)]
pub struct RequestTransactionState {
    pub transaction: Arc<dyn Transaction>,
    pub simulation: bool,
}

pub fn has_transaction(items: &RequestItems) -> bool {
    items.contains_key(TRANSACTION_ITEM)
}

/// The open transaction of this request, if any.
pub fn current_transaction(items: &RequestItems) -> Option<Arc<dyn Transaction>> {
    items.get::<Arc<dyn Transaction>>(TRANSACTION_ITEM)
}

pub fn is_simulation(items: &RequestItems) -> bool {
    items.contains_key(SIMULATION_ITEM)
}

pub(crate) fn store(items: &RequestItems, state: RequestTransactionState) -> Result<()> {
    if has_transaction(items) {
        return Err(TxError::Programming(
            "a request transaction is already registered".into(),
        ));
    }
    items.insert(TRANSACTION_ITEM, state.transaction);
    if state.simulation {
        items.insert(SIMULATION_ITEM, true);
    }
    Ok(())
}

/// Remove the handle and the simulation flag, whatever happens next.
pub(crate) fn take(items: &RequestItems) -> Option<RequestTransactionState> {
    let transaction = current_transaction(items);
    let simulation = is_simulation(items);
    items.remove(TRANSACTION_ITEM);
    items.remove(SIMULATION_ITEM);
    transaction.map(|transaction| RequestTransactionState { transaction, simulation })
}

//! Per-entity re-entrancy guard.
//!
//! Each task carries the set of pools and schedules it is currently operating
//! on. A ledger callback that calls back into the engine runs on the same task,
//! so it finds its target already entered and is rejected before it can wait
//! on the entity's lock.
//!
//! The set is per task. A callback that spawns a new task and calls the engine
//! from there is indistinguishable from an ordinary concurrent caller: it waits
//! on the entity's lock and runs after the outer operation commits. A callback
//! that spawns such a task and then awaits it from inside the settlement waits
//! on itself and never completes; ledgers must not block on work they spawn.

use crate::error::EngineError;
use crate::pair::PairKey;
use crate::token::AccountId;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;

tokio::task_local! {
    static ENTERED: RefCell<HashSet<EntityKey>>;
}

/// An entity that may be mid-operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Pair(PairKey),
    Beneficiary(AccountId),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair(key) => write!(f, "pool {key}"),
            Self::Beneficiary(account) => write!(f, "schedule of {account}"),
        }
    }
}

/// Removes the keys on exit, including when the operation is dropped early.
struct Exit(Vec<EntityKey>);

impl Drop for Exit {
    fn drop(&mut self) {
        let _ = ENTERED.try_with(|entered| {
            let mut entered = entered.borrow_mut();
            for key in &self.0 {
                entered.remove(key);
            }
        });
    }
}

/// Runs `operation` with `keys` marked as entered for the current task.
///
/// # Errors
/// `Reentrancy` if any key is already entered by this task, otherwise
/// whatever `operation` returns.
pub async fn exclusive<T, F>(keys: Vec<EntityKey>, operation: F) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    let nested = ENTERED.try_with(|entered| {
        let mut entered = entered.borrow_mut();
        if let Some(key) = keys.iter().find(|k| entered.contains(*k)) {
            return Err(EngineError::Reentrancy(key.to_string()));
        }
        entered.extend(keys.iter().cloned());
        Ok(())
    });

    match nested {
        Ok(Err(e)) => Err(e),
        Ok(Ok(())) => {
            let _exit = Exit(keys);
            operation.await
        }
        // Outermost call on this task.
        Err(_) => {
            ENTERED
                .scope(RefCell::new(keys.into_iter().collect()), operation)
                .await
        }
    }
}

/// Rejects reads of an entity the current task is mid-way through mutating.
///
/// Waiting on the entity's lock from inside its own operation would never
/// complete, so queries issued from a ledger callback fail fast instead.
pub fn ensure_not_entered(key: &EntityKey) -> Result<(), EngineError> {
    let entered = ENTERED
        .try_with(|entered| entered.borrow().contains(key))
        .unwrap_or(false);
    if entered {
        return Err(EngineError::Reentrancy(key.to_string()));
    }
    Ok(())
}

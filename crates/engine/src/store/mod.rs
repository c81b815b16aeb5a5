//! In-memory aggregate stores. Each store guards its map with one mutex;
//! the unit of consistency is a single record.

pub mod case_store;
pub mod cps_store;
pub mod material_store;

pub use case_store::CaseStore;
pub use cps_store::CpsStore;
pub use material_store::MaterialStore;

use shared_types::AppError;
use std::sync::{Mutex, MutexGuard};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, AppError> {
    mutex
        .lock()
        .map_err(|_| AppError::internal("Store lock poisoned"))
}

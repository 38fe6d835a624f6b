//! # Processor Module
//!
//! Pipeline concorrente suddivisa in sottomoduli:
//! - `directory`: Orchestratore con discovery e loop di retry
//! - `pool`: Pool di worker con code job/risultati e cancellazione
//! - `worker`: Pipeline per singolo file
//! - `result`: Esito per file (`ProcessResult`, `ProcessStatus`)

pub mod directory;
pub mod pool;
pub mod result;
pub mod worker;

pub use directory::{Processor, MAX_RETRIES};
pub use pool::{Pool, Toolchain};
pub use result::{ProcessResult, ProcessStatus};
pub use worker::Worker;

use crate::domain::ports::DiagnosticSink;
use crate::utils::error::LookupFailure;
use std::sync::{Mutex, PoisonError};

/// 預設：寫入 log，不打擾使用者
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, failure: &LookupFailure) {
        tracing::error!(
            service = %failure.service,
            occurred_at = %failure.occurred_at,
            "Failed to load sub-services: {}",
            failure.cause
        );
    }
}

/// 保留所有失敗紀錄，讓宿主程式自行決定如何顯示
#[derive(Debug, Default)]
pub struct CollectingSink {
    failures: Mutex<Vec<LookupFailure>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failures(&self) -> Vec<LookupFailure> {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, failure: &LookupFailure) {
        tracing::debug!("collected lookup failure: {}", failure);
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure.clone());
    }
}

use crate::domain::model::{OptionList, ServiceRef, SubServiceOption};
use crate::utils::error::LookupFailure;
use async_trait::async_trait;
use std::sync::Arc;

/// 變更監聽器的識別碼，用於解除綁定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

pub type ChangeHandler = Arc<dyn Fn(ServiceRef) + Send + Sync>;

/// 一個下拉選單欄位
pub trait SelectControl: Send + Sync {
    fn element_id(&self) -> &str;
    fn value(&self) -> ServiceRef;
    fn options(&self) -> OptionList;
    /// 取代整份選項，選取狀態回到第一個選項
    fn replace_options(&self, options: OptionList);
    fn on_change(&self, handler: ChangeHandler) -> ListenerId;
    fn off_change(&self, listener: ListenerId) -> bool;
}

/// 在目前的表單範圍內以 id 找欄位
pub trait ControlLocator: Send + Sync {
    fn locate(&self, id: &str) -> Option<Arc<dyn SelectControl>>;
}

#[async_trait]
pub trait SubServiceLookup: Send + Sync {
    async fn fetch(
        &self,
        service: &ServiceRef,
    ) -> std::result::Result<Vec<SubServiceOption>, LookupFailure>;
}

/// 查詢失敗的回報管道
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, failure: &LookupFailure);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&LookupFailure) + Send + Sync,
{
    fn report(&self, failure: &LookupFailure) {
        self(failure)
    }
}

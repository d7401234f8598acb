//! Cascading selector binding: keeps the sub-service control in sync with the
//! value of the service control.
//!
//! Every refresh takes the next sequence number when it is issued. A lookup
//! result is applied only while its number is still the latest one, so a slow
//! response for an older selection never overwrites a newer one.

use crate::config::toml_config::{BehaviorConfig, FieldConfig, FilterConfig};
use crate::core::diagnostics::TracingSink;
use crate::core::form::{FormPage, FormsetAdded};
use crate::domain::model::{OptionList, ServiceRef};
use crate::domain::ports::{
    ControlLocator, DiagnosticSink, ListenerId, SelectControl, SubServiceLookup,
};
use crate::utils::error::{FilterError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::task::JoinSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 服務未選擇，只留下空白選項
    Cleared,
    Applied { options: usize },
    /// 有更新的查詢已發出，這次結果被丟棄
    Discarded { sequence: u64 },
    /// 查詢失敗，選項維持原狀
    Failed,
}

struct Bound {
    service: Arc<dyn SelectControl>,
    sub_service: Arc<dyn SelectControl>,
    listener: ListenerId,
}

struct Inner {
    locator: Arc<dyn ControlLocator>,
    lookup: Arc<dyn SubServiceLookup>,
    sink: Arc<dyn DiagnosticSink>,
    fields: FieldConfig,
    discard_stale: bool,
    bound: Mutex<Option<Bound>>,
    sequence: AtomicU64,
    tasks: Mutex<RefreshTasks>,
}

/// 背景更新；已結束但還沒被 `settle` 取走的結果暫存在 `finished`
#[derive(Default)]
struct RefreshTasks {
    running: JoinSet<RefreshOutcome>,
    finished: Vec<RefreshOutcome>,
}

impl RefreshTasks {
    fn record(&mut self, joined: std::result::Result<RefreshOutcome, tokio::task::JoinError>) {
        match joined {
            Ok(outcome) => self.finished.push(outcome),
            Err(e) => tracing::warn!("Refresh task did not complete: {}", e),
        }
    }
}

impl Inner {
    fn bound(&self) -> MutexGuard<'_, Option<Bound>> {
        self.bound.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn tasks(&self) -> MutexGuard<'_, RefreshTasks> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sub_service(&self) -> Option<Arc<dyn SelectControl>> {
        self.bound().as_ref().map(|b| b.sub_service.clone())
    }

    fn locate(&self, id: &str) -> Result<Arc<dyn SelectControl>> {
        self.locator
            .locate(id)
            .ok_or_else(|| FilterError::ControlNotFound { id: id.to_string() })
    }

    fn issue(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, sequence: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == sequence
    }

    /// 檢查序號與寫入選項在同一把鎖內完成；已有更新的序號時回傳 false
    fn apply(&self, sequence: u64, options: OptionList) -> bool {
        let bound = self.bound();
        if self.discard_stale && !self.is_latest(sequence) {
            return false;
        }
        if let Some(target) = bound.as_ref() {
            target.sub_service.replace_options(options);
        }
        true
    }

    async fn run(&self, sequence: u64, service: ServiceRef) -> RefreshOutcome {
        let label = self.fields.placeholder_label.as_str();

        let Some(service_id) = service.as_str() else {
            if !self.apply(sequence, OptionList::placeholder(label)) {
                tracing::debug!("#{} discarding clear: newer refresh issued", sequence);
                return RefreshOutcome::Discarded { sequence };
            }
            tracing::debug!("#{} service cleared, sub-services reset", sequence);
            return RefreshOutcome::Cleared;
        };

        match self.lookup.fetch(&service).await {
            Ok(items) => {
                if !self.apply(sequence, OptionList::from_sub_services(label, &items)) {
                    tracing::debug!(
                        "#{} discarding sub-services for service {}: newer refresh issued",
                        sequence,
                        service_id
                    );
                    return RefreshOutcome::Discarded { sequence };
                }
                tracing::debug!(
                    "#{} loaded {} sub-services for service {}",
                    sequence,
                    items.len(),
                    service_id
                );
                RefreshOutcome::Applied {
                    options: items.len(),
                }
            }
            Err(failure) => {
                self.sink.report(&failure);
                RefreshOutcome::Failed
            }
        }
    }

    /// 由 change 監聽器呼叫：立即取號，查詢放到背景執行
    fn spawn_refresh(self: &Arc<Self>, service: ServiceRef) {
        // 沒有 runtime 就不取號，以免丟棄仍在進行中的查詢結果
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No tokio runtime available, refresh for '{}' skipped", service);
                return;
            }
        };
        let sequence = self.issue();

        let inner = self.clone();
        let mut tasks = self.tasks();
        while let Some(joined) = tasks.running.try_join_next() {
            tasks.record(joined);
        }
        tasks
            .running
            .spawn_on(async move { inner.run(sequence, service).await }, &handle);
    }

    fn attach(self: &Arc<Self>, service: &Arc<dyn SelectControl>) -> ListenerId {
        let weak: Weak<Inner> = Arc::downgrade(self);
        service.on_change(Arc::new(move |value: ServiceRef| {
            if let Some(inner) = weak.upgrade() {
                inner.spawn_refresh(value);
            }
        }))
    }
}

pub struct CascadingSelectorBuilder {
    locator: Arc<dyn ControlLocator>,
    lookup: Arc<dyn SubServiceLookup>,
    sink: Arc<dyn DiagnosticSink>,
    fields: FieldConfig,
    discard_stale: bool,
}

impl CascadingSelectorBuilder {
    pub fn fields(mut self, fields: FieldConfig) -> Self {
        self.fields = fields;
        self
    }

    pub fn behavior(mut self, behavior: &BehaviorConfig) -> Self {
        self.discard_stale = behavior.discard_stale_responses;
        self
    }

    pub fn diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// 找到兩個欄位、掛上監聽器，並以服務欄位目前的值做第一次更新
    pub async fn initialize(self) -> Result<CascadingSelector> {
        let inner = Arc::new(Inner {
            locator: self.locator,
            lookup: self.lookup,
            sink: self.sink,
            fields: self.fields,
            discard_stale: self.discard_stale,
            bound: Mutex::new(None),
            sequence: AtomicU64::new(0),
            tasks: Mutex::new(RefreshTasks::default()),
        });

        let selector = CascadingSelector { inner };
        selector.rebind()?;

        let initial = selector.service_control()?.value();
        tracing::info!(
            "Bound {} -> {} (initial service: '{}')",
            selector.inner.fields.service_id,
            selector.inner.fields.sub_service_id,
            initial
        );
        selector.refresh(initial).await;

        Ok(selector)
    }
}

#[derive(Clone)]
pub struct CascadingSelector {
    inner: Arc<Inner>,
}

impl CascadingSelector {
    pub fn builder(
        locator: Arc<dyn ControlLocator>,
        lookup: Arc<dyn SubServiceLookup>,
    ) -> CascadingSelectorBuilder {
        CascadingSelectorBuilder {
            locator,
            lookup,
            sink: Arc::new(TracingSink),
            fields: FieldConfig::default(),
            discard_stale: true,
        }
    }

    pub fn from_config(
        locator: Arc<dyn ControlLocator>,
        lookup: Arc<dyn SubServiceLookup>,
        config: &FilterConfig,
    ) -> CascadingSelectorBuilder {
        Self::builder(locator, lookup)
            .fields(config.fields.clone())
            .behavior(&config.behavior)
    }

    /// 依服務值重建子服務選項。失敗只回報給 diagnostic sink，不會往外拋
    pub async fn refresh(&self, service: impl Into<ServiceRef>) -> RefreshOutcome {
        let sequence = self.inner.issue();
        self.inner.run(sequence, service.into()).await
    }

    /// 重新找欄位並換上新的監聽器；舊欄位上的監聽器會被移除
    pub fn rebind(&self) -> Result<()> {
        let service = self.inner.locate(&self.inner.fields.service_id)?;
        let sub_service = self.inner.locate(&self.inner.fields.sub_service_id)?;

        let mut bound = self.inner.bound();
        if let Some(previous) = bound.take() {
            previous.service.off_change(previous.listener);
        }
        let listener = self.inner.attach(&service);
        tracing::debug!(
            "Listening for changes on {} ({:?})",
            service.element_id(),
            listener
        );
        *bound = Some(Bound {
            service,
            sub_service,
            listener,
        });
        Ok(())
    }

    /// 移除監聽器；之後服務欄位的變更不再觸發更新
    pub fn unbind(&self) {
        if let Some(previous) = self.inner.bound().take() {
            previous.service.off_change(previous.listener);
        }
    }

    /// 每次插入 formset 時自動 rebind
    pub fn watch_formsets(&self, page: &FormPage) {
        let weak = Arc::downgrade(&self.inner);
        page.on_formset_added(Arc::new(move |event: &FormsetAdded| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let selector = CascadingSelector { inner };
            if let Err(e) = selector.rebind() {
                tracing::warn!(
                    "Rebind after formset {}-{} failed: {}",
                    event.prefix,
                    event.index,
                    e
                );
            }
        }));
    }

    /// 等待所有背景中的更新完成
    pub async fn settle(&self) -> Vec<RefreshOutcome> {
        loop {
            let mut running = std::mem::take(&mut self.inner.tasks().running);
            if running.is_empty() {
                break;
            }
            while let Some(joined) = running.join_next().await {
                self.inner.tasks().record(joined);
            }
        }
        std::mem::take(&mut self.inner.tasks().finished)
    }

    pub fn service_control(&self) -> Result<Arc<dyn SelectControl>> {
        self.inner
            .bound()
            .as_ref()
            .map(|b| b.service.clone())
            .ok_or_else(|| FilterError::ControlNotFound {
                id: self.inner.fields.service_id.clone(),
            })
    }

    pub fn sub_service_control(&self) -> Result<Arc<dyn SelectControl>> {
        self.inner
            .sub_service()
            .ok_or_else(|| FilterError::ControlNotFound {
                id: self.inner.fields.sub_service_id.clone(),
            })
    }

    /// 目前為止發出的更新次數 (含初始化那一次)
    pub fn issued_refreshes(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }
}

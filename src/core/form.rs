//! In-memory model of an admin form page: select elements addressable by id,
//! plus the "formset added" notification fired when an inline row is inserted.

use crate::domain::model::{OptionList, ServiceRef};
use crate::domain::ports::{ChangeHandler, ControlLocator, ListenerId, SelectControl};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

struct ElementState {
    value: Option<String>,
    options: OptionList,
    listeners: Vec<(ListenerId, ChangeHandler)>,
}

pub struct SelectElement {
    id: String,
    state: Mutex<ElementState>,
    next_listener: AtomicU64,
}

impl SelectElement {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: Mutex::new(ElementState {
                value: None,
                options: OptionList::default(),
                listeners: Vec::new(),
            }),
            next_listener: AtomicU64::new(1),
        }
    }

    /// 預先選好值，例如編輯頁面
    pub fn with_value(id: impl Into<String>, value: impl Into<String>) -> Self {
        let element = Self::new(id);
        element.lock().value = Some(value.into());
        element
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ElementState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 模擬使用者選擇；會觸發所有 change 監聽器
    pub fn set_value(&self, value: impl Into<String>) {
        let value = value.into();
        let handlers: Vec<ChangeHandler> = {
            let mut state = self.lock();
            state.value = Some(value.clone());
            state.listeners.iter().map(|(_, h)| h.clone()).collect()
        };

        // 呼叫監聽器時不持有鎖，監聽器可能回頭讀取這個欄位
        let service = ServiceRef::from(value.as_str());
        for handler in handlers {
            handler(service.clone());
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn markup(&self) -> String {
        self.lock().options.to_markup()
    }
}

impl SelectControl for SelectElement {
    fn element_id(&self) -> &str {
        &self.id
    }

    fn value(&self) -> ServiceRef {
        ServiceRef::new(self.lock().value.clone())
    }

    fn options(&self) -> OptionList {
        self.lock().options.clone()
    }

    fn replace_options(&self, options: OptionList) {
        let mut state = self.lock();
        state.value = options.options().first().map(|o| o.value.clone());
        state.options = options;
    }

    fn on_change(&self, handler: ChangeHandler) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.lock().listeners.push((id, handler));
        id
    }

    fn off_change(&self, listener: ListenerId) -> bool {
        let mut state = self.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(id, _)| *id != listener);
        state.listeners.len() != before
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormsetAdded {
    pub prefix: String,
    pub index: usize,
}

pub type FormsetHook = Arc<dyn Fn(&FormsetAdded) + Send + Sync>;

#[derive(Default)]
pub struct FormPage {
    elements: RwLock<HashMap<String, Arc<SelectElement>>>,
    formset_hooks: Mutex<Vec<FormsetHook>>,
    formset_counts: Mutex<HashMap<String, usize>>,
}

impl FormPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入欄位；同 id 的舊欄位會被取代
    pub fn insert(&self, element: SelectElement) -> Arc<SelectElement> {
        let element = Arc::new(element);
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(element.id.clone(), element.clone());
        element
    }

    pub fn element(&self, id: &str) -> Option<Arc<SelectElement>> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn on_formset_added(&self, hook: FormsetHook) {
        self.formset_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }

    /// 插入一組新的 inline 表單欄位並發出 formset added 通知
    pub fn add_formset(&self, prefix: &str, elements: Vec<SelectElement>) -> FormsetAdded {
        for element in elements {
            self.insert(element);
        }

        let index = {
            let mut counts = self
                .formset_counts
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let count = counts.entry(prefix.to_string()).or_insert(0);
            let index = *count;
            *count += 1;
            index
        };
        let event = FormsetAdded {
            prefix: prefix.to_string(),
            index,
        };
        tracing::debug!("formset added: {}-{}", event.prefix, event.index);

        let hooks: Vec<FormsetHook> = self
            .formset_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(&event);
        }
        event
    }
}

impl ControlLocator for FormPage {
    fn locate(&self, id: &str) -> Option<Arc<dyn SelectControl>> {
        self.element(id).map(|e| e as Arc<dyn SelectControl>)
    }
}

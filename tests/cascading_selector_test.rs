use httpmock::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use sub_service_filter::config::{FieldConfig, FilterConfig, LookupConfig};
use sub_service_filter::core::SelectControl;
use sub_service_filter::utils::error::LookupCause;
use sub_service_filter::{
    CascadingSelector, CollectingSink, FormPage, HttpSubServiceLookup, RefreshOutcome,
    SelectElement,
};

const LOOKUP_PATH: &str = "/ai/get_sub_services/";

fn config_for(server: &MockServer) -> FilterConfig {
    FilterConfig {
        lookup: LookupConfig {
            base_url: server.base_url(),
            timeout_seconds: 5,
            ..LookupConfig::default()
        },
        ..FilterConfig::default()
    }
}

fn admin_form(service_value: Option<&str>) -> (Arc<FormPage>, Arc<SelectElement>, Arc<SelectElement>) {
    let page = Arc::new(FormPage::new());
    let service = match service_value {
        Some(value) => page.insert(SelectElement::with_value("id_service", value)),
        None => page.insert(SelectElement::new("id_service")),
    };
    let sub_service = page.insert(SelectElement::new("id_sub_service"));
    (page, service, sub_service)
}

async fn bind(
    page: Arc<FormPage>,
    config: &FilterConfig,
    sink: Arc<CollectingSink>,
) -> CascadingSelector {
    let lookup = Arc::new(HttpSubServiceLookup::new(&config.lookup).unwrap());
    CascadingSelector::from_config(page, lookup, config)
        .diagnostics(sink)
        .initialize()
        .await
        .unwrap()
}

/// 編輯頁面：服務已預選 5，載入時就要帶出子服務
#[tokio::test]
async fn test_prefilled_service_loads_on_ready() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "5");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([{"id": 7, "name": "Consulting"}]));
    });

    let (page, _, sub_service) = admin_form(Some("5"));
    let sink = Arc::new(CollectingSink::new());
    bind(page, &config_for(&server), sink.clone()).await;

    api_mock.assert();
    let options = sub_service.options();
    assert_eq!(options.labels(), vec!["---------", "Consulting"]);
    assert_eq!(options.values(), vec!["", "7"]);
    assert!(sub_service.value().is_blank());
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_change_rebuilds_options_in_response_order() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "3");
        then.status(200).json_body(serde_json::json!([
            {"id": 1, "name": "A"},
            {"id": 2, "name": "B"}
        ]));
    });

    let (page, service, sub_service) = admin_form(None);
    let selector = bind(page, &config_for(&server), Arc::new(CollectingSink::new())).await;

    service.set_value("3");
    let outcomes = selector.settle().await;

    api_mock.assert();
    assert_eq!(outcomes, vec![RefreshOutcome::Applied { options: 2 }]);
    assert_eq!(sub_service.options().labels(), vec!["---------", "A", "B"]);
    assert_eq!(sub_service.options().values(), vec!["", "1", "2"]);
    assert_eq!(
        sub_service.markup(),
        r#"<option value="">---------</option><option value="1">A</option><option value="2">B</option>"#
    );
}

#[tokio::test]
async fn test_blank_service_makes_no_request() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH);
        then.status(200).json_body(serde_json::json!([]));
    });

    let (page, service, sub_service) = admin_form(None);
    let selector = bind(page, &config_for(&server), Arc::new(CollectingSink::new())).await;

    service.set_value("");
    assert_eq!(selector.settle().await, vec![RefreshOutcome::Cleared]);

    api_mock.assert_hits(0);
    assert_eq!(sub_service.options().labels(), vec!["---------"]);
}

/// 已載入子服務後改選空白，子服務只剩空白選項
#[tokio::test]
async fn test_selecting_blank_after_load_resets_options() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "2");
        then.status(200)
            .json_body(serde_json::json!([{"id": 4, "name": "Hosting"}, {"id": 5, "name": "Backup"}]));
    });

    let (page, service, sub_service) = admin_form(Some("2"));
    let selector = bind(page, &config_for(&server), Arc::new(CollectingSink::new())).await;
    assert_eq!(sub_service.options().len(), 3);

    service.set_value("");
    selector.settle().await;

    api_mock.assert_hits(1);
    assert_eq!(sub_service.options().labels(), vec!["---------"]);
    assert_eq!(sub_service.options().values(), vec![""]);
}

#[tokio::test]
async fn test_lookup_failure_leaves_options_unchanged() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "1");
        then.status(200).json_body(serde_json::json!([{"id": 10, "name": "Kept"}]));
    });
    server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "2");
        then.status(500);
    });

    let (page, service, sub_service) = admin_form(Some("1"));
    let sink = Arc::new(CollectingSink::new());
    let selector = bind(page, &config_for(&server), sink.clone()).await;
    let before = sub_service.options();

    service.set_value("2");
    assert_eq!(selector.settle().await, vec![RefreshOutcome::Failed]);

    assert_eq!(sub_service.options(), before);
    let failures = sink.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].service, "2");
    assert_eq!(failures[0].cause, LookupCause::Status { status: 500 });
}

#[tokio::test]
async fn test_unreachable_endpoint_is_reported_not_raised() {
    // 沒有 mock server 在聽的 port
    let config = FilterConfig {
        lookup: LookupConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..LookupConfig::default()
        },
        ..FilterConfig::default()
    };

    let (page, _, sub_service) = admin_form(Some("8"));
    let sink = Arc::new(CollectingSink::new());
    bind(page, &config, sink.clone()).await;

    assert_eq!(sub_service.options().labels(), vec!["---------"]);
    assert_eq!(sink.len(), 1);
    assert!(matches!(
        sink.failures()[0].cause,
        LookupCause::Transport { .. }
    ));
}

/// formset added 之後，只有新的服務欄位會觸發一次查詢
#[tokio::test]
async fn test_formset_added_rebinds_without_duplicate_listener() {
    let server = MockServer::start();
    let api_mock = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "6");
        then.status(200).json_body(serde_json::json!([{"id": 60, "name": "Training"}]));
    });

    let (page, old_service, old_sub_service) = admin_form(None);
    let selector = bind(page.clone(), &config_for(&server), Arc::new(CollectingSink::new())).await;
    selector.watch_formsets(&page);

    page.add_formset(
        "tickets",
        vec![
            SelectElement::new("id_service"),
            SelectElement::new("id_sub_service"),
        ],
    );
    let new_service = page.element("id_service").unwrap();
    let new_sub_service = page.element("id_sub_service").unwrap();

    let issued = selector.issued_refreshes();
    old_service.set_value("6");
    new_service.set_value("6");
    let outcomes = selector.settle().await;

    assert_eq!(outcomes.len(), 1);
    assert_eq!(selector.issued_refreshes(), issued + 1);
    api_mock.assert_hits(1);
    assert_eq!(new_sub_service.options().labels(), vec!["---------", "Training"]);
    assert_eq!(old_sub_service.options().labels(), vec!["---------"]);
}

#[tokio::test]
async fn test_repeated_formsets_keep_single_listener() {
    let server = MockServer::start();
    let (page, _, _) = admin_form(None);
    let selector = bind(page.clone(), &config_for(&server), Arc::new(CollectingSink::new())).await;
    selector.watch_formsets(&page);

    // 同一個欄位沒有被替換時，rebind 也不能重複掛監聽器
    page.add_formset("tickets", vec![]);
    page.add_formset("tickets", vec![]);

    let service = page.element("id_service").unwrap();
    assert_eq!(service.listener_count(), 1);
}

/// 慢的舊查詢晚回來，不能蓋掉較新的選擇
#[tokio::test]
async fn test_slow_stale_response_does_not_overwrite_newer_selection() {
    let server = MockServer::start();
    let slow = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "1");
        then.status(200)
            .delay(Duration::from_millis(300))
            .json_body(serde_json::json!([{"id": 11, "name": "Stale"}]));
    });
    let fast = server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "2");
        then.status(200).json_body(serde_json::json!([{"id": 22, "name": "Fresh"}]));
    });

    let (page, service, sub_service) = admin_form(None);
    let selector = bind(page, &config_for(&server), Arc::new(CollectingSink::new())).await;

    service.set_value("1");
    service.set_value("2");
    let outcomes = selector.settle().await;

    slow.assert();
    fast.assert();
    assert!(outcomes.contains(&RefreshOutcome::Discarded { sequence: 2 }));
    assert_eq!(sub_service.options().labels(), vec!["---------", "Fresh"]);
}

#[tokio::test]
async fn test_formset_row_field_ids_from_config() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path(LOOKUP_PATH).query_param("service_id", "9");
        then.status(200).json_body(serde_json::json!({"sub_services": [{"id": 90, "name": "Audit"}]}));
    });

    let mut config = config_for(&server);
    config.fields = FieldConfig::default().for_formset_row("tickets", 0);

    let page = Arc::new(FormPage::new());
    page.insert(SelectElement::with_value("id_tickets-0-service", "9"));
    let sub_service = page.insert(SelectElement::new("id_tickets-0-sub_service"));

    bind(page, &config, Arc::new(CollectingSink::new())).await;

    assert_eq!(sub_service.options().labels(), vec!["---------", "Audit"]);
}

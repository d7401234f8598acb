use clap::Parser;
use std::sync::Arc;
use sub_service_filter::config::OutputFormat;
use sub_service_filter::core::{OptionList, SelectControl, SubServiceLookup};
use sub_service_filter::utils::{logger, validation::Validate};
use sub_service_filter::{
    CascadingSelector, CliConfig, CollectingSink, FilterError, FormPage, HttpSubServiceLookup,
    SelectElement, StaticLookup,
};

fn fail(e: &FilterError, exit_code: i32) -> ! {
    tracing::error!("❌ {}", e);
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    std::process::exit(exit_code);
}

fn render(options: &OptionList, format: OutputFormat) -> Result<String, FilterError> {
    Ok(match format {
        OutputFormat::Markup => options.to_markup(),
        OutputFormat::Json => serde_json::to_string_pretty(options.options())?,
        OutputFormat::Text => options
            .options()
            .iter()
            .map(|o| format!("{}\t{}", o.value, o.label))
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI arguments: {:?}", cli);

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => fail(&e, 1),
    };
    if let Err(e) = config.validate() {
        fail(&e, 1);
    }

    let lookup: Arc<dyn SubServiceLookup> = match &cli.catalog {
        Some(path) => match StaticLookup::from_file(path) {
            Ok(catalog) => {
                tracing::info!(
                    "📚 Using catalog {} ({} services)",
                    path.display(),
                    catalog.service_count()
                );
                Arc::new(catalog)
            }
            Err(e) => fail(&e, 1),
        },
        None => match HttpSubServiceLookup::new(&config.lookup) {
            Ok(lookup) => {
                tracing::info!("🌐 Using endpoint {}", lookup.endpoint());
                Arc::new(lookup)
            }
            Err(e) => fail(&e, 1),
        },
    };

    // 以設定中的欄位 id 建立表單
    let page = Arc::new(FormPage::new());
    match &cli.service {
        Some(service) => page.insert(SelectElement::with_value(
            config.fields.service_id.clone(),
            service.clone(),
        )),
        None => page.insert(SelectElement::new(config.fields.service_id.clone())),
    };
    page.insert(SelectElement::new(config.fields.sub_service_id.clone()));

    let sink = Arc::new(CollectingSink::new());
    let selector = match CascadingSelector::from_config(page.clone(), lookup, &config)
        .diagnostics(sink.clone())
        .initialize()
        .await
    {
        Ok(selector) => selector,
        Err(e) => fail(&e, 1),
    };
    selector.settle().await;

    if let Some(failure) = sink.failures().into_iter().next() {
        fail(&FilterError::Lookup(failure), 2);
    }

    let sub_service = match selector.sub_service_control() {
        Ok(control) => control,
        Err(e) => fail(&e, 1),
    };
    let options = sub_service.options();
    tracing::info!("✅ {} sub-services loaded", options.item_count());

    match render(&options, cli.format) {
        Ok(output) => println!("{}", output),
        Err(e) => fail(&e, 1),
    }
}

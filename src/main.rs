//! Storefront command-line helper.
//!
//! Usage:
//!   storefront translate <text> [--to en|id]   # Translate UI text (auto-detects when --to is omitted)
//!   storefront detect <text>                   # Detect English or Indonesian
//!   storefront card <number>                   # Format, classify and Luhn-check a card number
//!   storefront totals <subtotal>               # Shipping, tax and total for a subtotal
//!   storefront lang [en|id|toggle]             # Show or change the stored display language
//!   storefront draft [set <field> <value>]     # Show or edit the stored checkout draft
//!   storefront order <subtotal> <order-id>     # Validate the stored draft and submit payment
//!   storefront webhook [secret] < event.json   # Verify and parse a payment webhook event
//!
//! Optional environment variables (see `Config::from_env`):
//! - STOREFRONT_STORAGE_PATH, DRAFT_DEBOUNCE_MS
//! - PAYMENT_API_URL, PAYMENT_API_TOKEN, PAYMENT_CURRENCY, PAYMENT_WEBHOOK_SECRET,
//!   SIMULATED_PAYMENT_DELAY_MS
//! - FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, TAX_RATE

use anyhow::{bail, Context, Result};
use std::io::Read;
use std::sync::Arc;
use storefront_core::checkout::{
    card_type, compute_totals, format_card_number, luhn_check, AdvanceOutcome, CheckoutFlow,
    DefaultRuleSet, DraftPersister, Field, HttpPaymentGateway, PaymentEvent, PaymentSubmitter,
    ValidationResult,
};
use storefront_core::config::Config;
use storefront_core::i18n::{Language, LanguagePreference, TranslationEngine};
use storefront_core::storage::{FileStore, KeyValueStore};
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when absent)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("storefront_core=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        bail!("Usage: storefront <translate|detect|card|totals|lang|draft|order|webhook> <input>");
    };

    match command.as_str() {
        "translate" => {
            let (text, target) = parse_translate_args(rest)?;
            let engine = TranslationEngine::default();
            println!("{}", engine.translate(&text, target));
            debug!("Translation metrics: {:?}", engine.metrics().report());
        }
        "detect" => {
            let text = rest.join(" ");
            let language = TranslationEngine::default().detect_language(&text);
            println!("{} ({})", language.code(), language.name());
        }
        "card" => {
            let number = rest.join("");
            let kind = card_type(&number);
            println!("Number: {}", format_card_number(&number));
            println!("Type:   {}", kind.label());
            println!("Valid:  {}", luhn_check(&number));
        }
        "totals" => {
            let subtotal = parse_subtotal(rest.first())?;
            let totals = compute_totals(subtotal, &config.pricing);
            println!("{}", serde_json::to_string_pretty(&totals)?);
        }
        "lang" => run_lang(&config, rest.first().map(String::as_str))?,
        "draft" => run_draft(&config, rest)?,
        "order" => {
            let subtotal = parse_subtotal(rest.first())?;
            let order_id = rest.get(1).context("order requires an order id")?;
            run_order(&config, subtotal, order_id).await?;
        }
        "webhook" => {
            let mut payload = String::new();
            std::io::stdin()
                .read_to_string(&mut payload)
                .context("Failed to read webhook payload from stdin")?;
            let event = PaymentEvent::from_webhook(
                &payload,
                rest.first().map(String::as_str),
                config.payment_webhook_secret.as_deref(),
            )?;
            println!("{:?}", event);
        }
        other => bail!("Unknown command '{}'", other),
    }

    Ok(())
}

fn open_store(config: &Config) -> Arc<dyn KeyValueStore> {
    debug!("Using storage file {}", config.storage_path.display());
    Arc::new(FileStore::open(&config.storage_path))
}

fn parse_subtotal(arg: Option<&String>) -> Result<f64> {
    arg.context("a subtotal is required")?
        .parse()
        .context("subtotal must be a number")
}

fn run_lang(config: &Config, action: Option<&str>) -> Result<()> {
    let mut preference = LanguagePreference::load(open_store(config));

    match action {
        None => {}
        Some("toggle") => {
            preference.toggle()?;
            preference.finish_transition();
        }
        Some(code) => {
            let language = Language::from_code(code)
                .with_context(|| format!("Unsupported language '{}', use en or id", code))?;
            preference.set(language)?;
        }
    }

    let current = preference.current();
    println!("{} ({})", current.code(), current.native_name());
    Ok(())
}

fn run_draft(config: &Config, args: &[String]) -> Result<()> {
    let persister = DraftPersister::from_config(open_store(config), config);
    let mut draft = persister.load();

    match args {
        [] => {}
        [action, name, value @ ..] if action == "set" => {
            let field = Field::from_name(name)
                .with_context(|| format!("Unknown checkout field '{}'", name))?;
            draft.set(field, value.join(" "));
            persister.schedule(&draft);
            persister.flush();
        }
        _ => bail!("Usage: storefront draft [set <field> <value>]"),
    }

    println!("{}", serde_json::to_string_pretty(&draft)?);
    Ok(())
}

async fn run_order(config: &Config, subtotal: f64, order_id: &str) -> Result<()> {
    let persister = Arc::new(DraftPersister::from_config(open_store(config), config));
    let mut flow = CheckoutFlow::new(Arc::new(DefaultRuleSet::new()), config.pricing, subtotal)
        .with_persister(persister);

    // Walk the stored draft up to the payment step
    loop {
        match flow.advance() {
            AdvanceOutcome::Moved(step) => debug!("Draft passed into {:?}", step),
            AdvanceOutcome::ReadyForPayment => break,
            AdvanceOutcome::Blocked(result) => {
                print_errors(&result);
                bail!("Stored draft is incomplete at {}", flow.current_step().title());
            }
            AdvanceOutcome::Complete => bail!("Checkout already complete"),
        }
    }

    let gateway = HttpPaymentGateway::from_config(reqwest::Client::new(), config);
    let submitter = PaymentSubmitter::from_config(gateway, config);
    let receipt = flow.place_order(&submitter, order_id).await?;

    info!("Order {} paid by {}", receipt.order_id, receipt.method.code());
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

fn print_errors(result: &ValidationResult) {
    for (field, message) in &result.errors {
        eprintln!("  {}: {}", field.name(), message);
    }
}

/// Split `translate` arguments into the text and an optional `--to` target.
fn parse_translate_args(args: &[String]) -> Result<(String, Option<Language>)> {
    let mut words = Vec::new();
    let mut target = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        if arg == "--to" {
            let code = iter.next().context("--to requires a language code")?;
            target = Some(
                Language::from_code(code)
                    .with_context(|| format!("Unsupported language '{}', use en or id", code))?,
            );
        } else {
            words.push(arg.as_str());
        }
    }

    if words.is_empty() {
        bail!("translate requires some text");
    }
    Ok((words.join(" "), target))
}

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::Subcommand;
use quote_core::api::{Backend, BackendRegistry, MemoryBackendFactory};
use quote_core::calculations::{PricingBreakdown, PricingCalculator, reorder_suggestions, summarize_stock};
use quote_core::wizard::{PendingUpload, StepBlocked, WizardSession, WizardStep};
use quote_core::{ApiError, OptionFieldType, QuoteApi, Service, ServiceOption, is_answered};
use quote_store_sqlite::SqliteBackendFactory;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::utils::{
    content_type_for, format_money, format_optional_money, format_percent, format_size,
    parse_decimal,
};

/// Build a [`BackendRegistry`] with every backend compiled into this binary.
pub fn build_registry() -> BackendRegistry {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(SqliteBackendFactory));
    registry.register(Box::new(MemoryBackendFactory));
    registry
}

pub async fn open_backend(config: &AppConfig) -> Result<Backend> {
    let backend_config = config.backend_config();
    debug!(backend = %backend_config.backend, "opening backend");
    build_registry()
        .create(&backend_config)
        .await
        .with_context(|| format!("cannot open {} backend", backend_config.backend))
}

// ─── pricing ─────────────────────────────────────────────────────────────────

/// Render a pricing breakdown, or the pending notice when there is none.
pub fn render_pricing(pricing: Option<&PricingBreakdown>) -> String {
    let Some(p) = pricing else {
        return format!("  {}\n", format_optional_money(None));
    };
    let tax_label = format!("Tax ({})", format_percent(p.tax_rate));
    let rows = [
        ("Subtotal", p.subtotal),
        (tax_label.as_str(), p.tax_amount),
        ("Total", p.total),
        ("Deposit (50%)", p.deposit),
        ("Balance", p.balance),
    ];
    let mut out = String::new();
    for (label, amount) in rows {
        let _ = writeln!(out, "  {:<14} {:>14}", label, format_money(amount));
    }
    out
}

pub fn pricing_report(
    calculator: &PricingCalculator,
    subtotal: Option<Decimal>,
) -> String {
    render_pricing(calculator.compute(subtotal).as_ref())
}

// ─── inventory ───────────────────────────────────────────────────────────────

/// Stock summary plus either every item or only those needing reorder.
pub async fn inventory_report(
    api: &dyn QuoteApi,
    reorder_only: bool,
) -> Result<String> {
    let items = api
        .list_inventory()
        .await
        .context("cannot list inventory")?;
    let summary = summarize_stock(&items);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} items: {} in stock, {} low, {} out. Stock value {}.",
        summary.total,
        summary.in_stock,
        summary.low_stock,
        summary.out_of_stock,
        format_money(summary.stock_value)
    );

    if reorder_only {
        let suggestions = reorder_suggestions(&items);
        if suggestions.is_empty() {
            out.push_str("Nothing to reorder.\n");
            return Ok(out);
        }
        let mut total = Decimal::ZERO;
        for s in &suggestions {
            total = total.saturating_add(s.estimated_cost);
            let _ = writeln!(
                out,
                "  {:<12} {:<28} {:<12} order {:>8}  {:>12}  {}",
                s.sku,
                s.name,
                s.status.label(),
                s.suggested_qty.normalize(),
                format_money(s.estimated_cost),
                s.supplier.as_deref().unwrap_or("-")
            );
        }
        let _ = writeln!(out, "Estimated reorder cost {}.", format_money(total));
    } else {
        for item in &items {
            let _ = writeln!(
                out,
                "  {:<12} {:<28} {:>8} {:<8} {}",
                item.sku,
                item.name,
                item.qty_on_hand.normalize(),
                item.unit,
                item.status().label()
            );
        }
    }
    Ok(out)
}

// ─── wizard ──────────────────────────────────────────────────────────────────

/// One wizard action. Every invocation restores the draft, applies the
/// action, and writes the draft back.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum WizardCommand {
    /// Show the current draft
    Show,
    /// List the services on offer
    Services,
    /// Choose a service by id or slug
    SelectService { service: String },
    /// Answer a project detail question
    Answer { key: String, value: String },
    /// Remove an answer
    ClearAnswer { key: String },
    /// Upload artwork or reference files
    Attach {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Remove an uploaded file from the draft
    Detach { filename: String },
    /// Choose a tier by id or name
    Tier { tier: String },
    /// Jump to a step (1-5)
    Goto { step: u8 },
    /// Go to the next step
    Next,
    /// Go to the previous step
    Back,
    /// Set the notes sent with the quote
    Notes { text: String },
    /// Submit the quote
    Submit,
    /// Throw the draft away
    Discard,
}

pub async fn run_wizard(
    backend: &Backend,
    calculator: PricingCalculator,
    command: WizardCommand,
) -> Result<String> {
    let api = backend.api.as_ref();
    let mut session = WizardSession::mount(
        backend.api.clone(),
        backend.drafts.clone(),
        calculator,
    )
    .await;
    debug!(?command, step = %session.current_step(), "wizard command");

    let mut out = String::new();
    match command {
        WizardCommand::Show => {}
        WizardCommand::Services => {
            let services = api.list_services().await.context("cannot list services")?;
            for service in services {
                let _ = writeln!(out, "{:>4}  {:<24} {}", service.id, service.slug, service.name);
            }
            return Ok(out);
        }
        WizardCommand::SelectService { service } => {
            let service = resolve_service(api, &service).await?;
            session
                .select_service(service.id)
                .await
                .with_context(|| format!("cannot load options for '{}'", service.slug))?;
        }
        WizardCommand::Answer { key, value } => {
            if session.wizard().selected_service().is_none() {
                bail!(StepBlocked::ServiceNotSelected);
            }
            let option = session
                .wizard()
                .service_options()
                .iter()
                .find(|o| o.key == key)
                .ok_or_else(|| anyhow!("'{key}' is not a question for this service"))?;
            let answer = parse_answer(option, &value)?;
            session.set_detail(key, answer).await;
        }
        WizardCommand::ClearAnswer { key } => {
            if !session.clear_detail(&key).await {
                let _ = writeln!(out, "No answer for '{key}'.");
            }
        }
        WizardCommand::Attach { paths } => {
            let mut files = Vec::with_capacity(paths.len());
            for path in paths {
                files.push(read_upload(path).await?);
            }
            let report = session.upload_files(files).await;
            for (filename, percent) in &report.progress {
                let _ = writeln!(out, "Uploaded {filename} ({percent}%).");
            }
            for (filename, error) in &report.failed {
                let _ = writeln!(out, "Upload of {filename} failed: {error}");
            }
        }
        WizardCommand::Detach { filename } => {
            if session.remove_file(&filename).await.is_none() {
                let _ = writeln!(out, "No file named '{filename}'.");
            }
        }
        WizardCommand::Tier { tier } => {
            let tier_id = resolve_tier(&session, &tier)?;
            session.select_tier(tier_id).await?;
        }
        WizardCommand::Goto { step } => {
            let moved = match WizardStep::try_from(step) {
                Ok(to) => session.advance(to).await,
                Err(blocked) => Err(blocked),
            };
            note_blocked(&mut out, moved);
        }
        WizardCommand::Next => {
            let moved = session.next().await;
            note_blocked(&mut out, moved);
        }
        WizardCommand::Back => {
            session.back().await;
        }
        WizardCommand::Notes { text } => {
            session.set_notes(text).await;
        }
        WizardCommand::Submit => {
            let created = session
                .submit()
                .await
                .context("quote not submitted, your draft is kept")?;
            info!(reference = %created.reference, "quote submitted from cli");
            let _ = writeln!(
                out,
                "Quote {} submitted on {}.",
                created.reference,
                created.created_at.format("%Y-%m-%d")
            );
            return Ok(out);
        }
        WizardCommand::Discard => {
            session
                .discard()
                .await
                .context("cannot discard the draft")?;
            out.push_str("Draft discarded.\n");
            return Ok(out);
        }
    }

    out.push_str(&render_session(api, &session).await);
    Ok(out)
}

fn note_blocked(
    out: &mut String,
    moved: Result<WizardStep, StepBlocked>,
) {
    if let Err(blocked) = moved {
        let _ = writeln!(out, "Cannot continue: {blocked}.");
    }
}

async fn resolve_service(
    api: &dyn QuoteApi,
    key: &str,
) -> Result<Service> {
    let found = match key.parse::<i64>() {
        Ok(id) => api.get_service(id).await,
        Err(_) => api.get_service_by_slug(key).await,
    };
    match found {
        Ok(service) => Ok(service),
        Err(ApiError::NotFound) => bail!("no service '{key}'"),
        Err(other) => Err(other.into()),
    }
}

fn resolve_tier(
    session: &WizardSession,
    key: &str,
) -> Result<i64> {
    let tiers = session.tiers();
    let found = match key.parse::<i64>() {
        Ok(id) => tiers.iter().find(|t| t.id == id),
        Err(_) => tiers.iter().find(|t| t.name.eq_ignore_ascii_case(key)),
    };
    found
        .map(|t| t.id)
        .ok_or_else(|| anyhow!("no tier '{key}' for the selected service"))
}

/// Turns command-line text into the JSON value stored for an option.
pub fn parse_answer(
    option: &ServiceOption,
    raw: &str,
) -> Result<Value> {
    let raw = raw.trim();
    match option.field_type {
        OptionFieldType::Text | OptionFieldType::Textarea => Ok(Value::String(raw.to_string())),
        OptionFieldType::Select => {
            if option.choices.iter().any(|c| c == raw) {
                Ok(Value::String(raw.to_string()))
            } else {
                bail!(
                    "'{raw}' is not a choice for {} (choose one of: {})",
                    option.label,
                    option.choices.join(", ")
                )
            }
        }
        OptionFieldType::Number => {
            let number = parse_decimal(raw)?.normalize();
            if number.scale() == 0 {
                let whole = number
                    .to_i64()
                    .ok_or_else(|| anyhow!("{} is out of range", raw))?;
                Ok(Value::from(whole))
            } else {
                serde_json::from_str(&number.to_string())
                    .with_context(|| format!("{} is not a number", raw))
            }
        }
        OptionFieldType::Checkbox => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "off" | "0" => Ok(Value::Bool(false)),
            _ => bail!("answer yes or no for {}", option.label),
        },
    }
}

async fn read_upload(path: PathBuf) -> Result<PendingUpload> {
    let bytes = tokio::fs::read(&path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("{} is not a file", path.display()))?;
    Ok(PendingUpload {
        content_type: content_type_for(&path).to_string(),
        filename,
        bytes,
    })
}

/// Text view of the wizard: step checklist, the draft, and pricing.
pub async fn render_session(
    api: &dyn QuoteApi,
    session: &WizardSession,
) -> String {
    let wizard = session.wizard();
    let validation = wizard.step_validation();
    let current = session.current_step();

    let mut out = String::new();
    for step in WizardStep::ALL {
        let marker = if step == current { ">" } else { " " };
        let check = if step != WizardStep::Review && validation.is_valid(step) {
            "x"
        } else {
            " "
        };
        let _ = writeln!(out, "{marker} [{check}] {step}");
    }

    match wizard.selected_service() {
        Some(id) => {
            let name = match api.get_service(id).await {
                Ok(service) => service.name,
                Err(_) => format!("#{id}"),
            };
            let _ = writeln!(out, "Service: {name}");
        }
        None => out.push_str("Service: not selected\n"),
    }

    if !wizard.service_options().is_empty() {
        out.push_str("Details:\n");
        for option in wizard.service_options() {
            let answer = wizard.project_details().get(&option.key);
            let shown = match answer {
                Some(Value::String(s)) if is_answered(answer) => s.clone(),
                Some(value) if is_answered(answer) => value.to_string(),
                _ if option.required => "(required)".to_string(),
                _ => "-".to_string(),
            };
            let _ = writeln!(out, "  {} [{}]: {}", option.label, option.key, shown);
        }
    }

    if !wizard.uploaded_files().is_empty() {
        out.push_str("Files:\n");
        for file in wizard.uploaded_files() {
            let _ = writeln!(out, "  {} ({})", file.filename, format_size(file.size_bytes));
        }
    }

    if !session.tiers().is_empty() {
        out.push_str("Tiers:\n");
        for tier in session.tiers() {
            let marker = if wizard.selected_tier() == Some(tier.id) {
                "*"
            } else {
                " "
            };
            let _ = writeln!(
                out,
                "  {marker} {:>3}  {:<24} {}",
                tier.id,
                tier.name,
                format_optional_money(tier.price)
            );
        }
    }

    if !wizard.notes().is_empty() {
        let _ = writeln!(out, "Notes: {}", wizard.notes());
    }

    out.push_str("Pricing:\n");
    out.push_str(&render_pricing(session.pricing().as_ref()));
    out
}

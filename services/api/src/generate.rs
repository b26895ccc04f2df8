use crate::infra::{load_reference, load_weights, parse_date, parse_setting, DeclarationState};
use crate::routes::{classify, ClassificationResponse};
use asycuda_export::config::AppConfig;
use asycuda_export::error::AppError;
use asycuda_export::telemetry;
use asycuda_export::workflows::declaration::{DeclarationHeader, Entity};
use asycuda_export::workflows::encoders::{FormatError, OutputFormat};
use asycuda_export::workflows::feedback::{describe_error, describe_report, ProcessingContext};
use asycuda_export::workflows::pipeline::PipelineRun;
use asycuda_export::workflows::sales::SalesImporter;
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ExporterArgs {
    #[arg(long)]
    pub(crate) exporter_id: String,
    #[arg(long)]
    pub(crate) exporter_name: String,
    #[arg(long)]
    pub(crate) exporter_address: String,
    #[arg(long)]
    pub(crate) exporter_address2: Option<String>,
    #[arg(long, default_value = "")]
    pub(crate) exporter_city: String,
    #[arg(long, default_value = "")]
    pub(crate) exporter_country: String,
}

impl ExporterArgs {
    fn entity(&self) -> Result<Entity, AppError> {
        let entity = Entity::new(
            &self.exporter_id,
            &self.exporter_name,
            &self.exporter_address,
            &self.exporter_city,
            &self.exporter_country,
        )?;
        Ok(match &self.exporter_address2 {
            Some(line) => entity.with_address_line2(line),
            None => entity,
        })
    }
}

/// Declarant details; the exporter is used when no declarant id is given.
#[derive(Args, Debug, Default)]
pub(crate) struct DeclarantArgs {
    #[arg(long)]
    pub(crate) declarant_id: Option<String>,
    #[arg(long)]
    pub(crate) declarant_name: Option<String>,
    #[arg(long)]
    pub(crate) declarant_address: Option<String>,
    #[arg(long)]
    pub(crate) declarant_address2: Option<String>,
    #[arg(long)]
    pub(crate) declarant_city: Option<String>,
    #[arg(long)]
    pub(crate) declarant_country: Option<String>,
}

impl DeclarantArgs {
    fn entity(&self) -> Result<Option<Entity>, AppError> {
        let Some(id) = &self.declarant_id else {
            return Ok(None);
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        let entity = Entity::new(
            id,
            text(&self.declarant_name),
            text(&self.declarant_address),
            text(&self.declarant_city),
            text(&self.declarant_country),
        )?;
        Ok(Some(match &self.declarant_address2 {
            Some(line) => entity.with_address_line2(line),
            None => entity,
        }))
    }
}

#[derive(Args, Debug)]
pub(crate) struct GenerateArgs {
    /// Sales export (CSV or Excel)
    #[arg(long)]
    pub(crate) sales: PathBuf,
    /// Reference table of HS codes and prior documents (CSV or Excel).
    /// Defaults to ASYCUDA_REFERENCE_PATH.
    #[arg(long)]
    pub(crate) reference: Option<PathBuf>,
    #[command(flatten)]
    pub(crate) exporter: ExporterArgs,
    #[command(flatten)]
    pub(crate) declarant: DeclarantArgs,
    /// Registration number (generated from the current time when omitted)
    #[arg(long)]
    pub(crate) registration_number: Option<String>,
    #[arg(long)]
    pub(crate) commercial_reference: Option<String>,
    /// Declaration date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Declaration setting override, e.g. --set customs_office=LCCAP
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_setting)]
    pub(crate) settings: Vec<(String, String)>,
    /// Output directory. Defaults to ASYCUDA_OUTPUT_DIR.
    #[arg(long)]
    pub(crate) out: Option<PathBuf>,
    /// Output format (xml, txt, xlsx, html); repeat for several. Defaults to all.
    #[arg(long = "format")]
    pub(crate) formats: Vec<OutputFormat>,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Product description as it appears in the sales data
    pub(crate) description: String,
    /// Reference table (CSV or Excel). Defaults to ASYCUDA_REFERENCE_PATH.
    #[arg(long)]
    pub(crate) reference: Option<PathBuf>,
    #[arg(long, default_value_t = 1.0)]
    pub(crate) quantity: f64,
    #[arg(long)]
    pub(crate) product_code: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportReferenceArgs {
    /// Reference table to normalize (CSV or Excel). Defaults to ASYCUDA_REFERENCE_PATH.
    #[arg(long)]
    pub(crate) reference: Option<PathBuf>,
    /// Destination CSV file
    #[arg(long)]
    pub(crate) out: PathBuf,
}

/// Prints the user-facing rendition of `err` and hands it back for propagation.
fn report_failure(err: AppError, context: ProcessingContext) -> AppError {
    let feedback = describe_error(&err, context);
    eprintln!("{}", feedback.message);
    eprintln!("  {}", feedback.detail);
    for suggestion in &feedback.suggestions {
        eprintln!("  - {suggestion}");
    }
    err
}

pub(crate) fn run_generate(args: GenerateArgs) -> Result<(), AppError> {
    let GenerateArgs {
        sales,
        reference,
        exporter,
        declarant,
        registration_number,
        commercial_reference,
        date,
        settings: overrides,
        out,
        formats,
    } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let reference_path = reference.or_else(|| config.files.reference_path.clone());
    let store = load_reference(reference_path.as_deref())
        .map_err(|err| report_failure(err, ProcessingContext::ReferenceDataLoading))?;
    let weights = load_weights(config.files.weights_path.as_deref())
        .map_err(|err| report_failure(err, ProcessingContext::ReferenceDataLoading))?;
    let state = DeclarationState::new(store, config.resolution.clone()).with_weights(weights);

    let mut settings = state.settings.clone();
    settings
        .apply_overrides(
            overrides
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str())),
        )
        .map_err(|err| {
            report_failure(err.into(), ProcessingContext::DeclarationGeneration)
        })?;

    let exporter = Arc::new(exporter.entity()?);
    let declarant = match declarant.entity()? {
        Some(declarant) => Arc::new(declarant),
        None => exporter.clone(),
    };

    let rows = SalesImporter::from_path(&sales, &state.resolution.columns)
        .map_err(|err| report_failure(err.into(), ProcessingContext::SalesDataProcessing))?;

    let header = DeclarationHeader {
        registration_number,
        commercial_reference,
        issue_date: date,
        ..DeclarationHeader::new(exporter, declarant)
    };
    let pipeline = state.pipeline(state.reference.clone(), settings);
    let mut run = pipeline.run(&rows, header);

    let formats = if formats.is_empty() {
        OutputFormat::ALL.to_vec()
    } else {
        formats
    };
    let out = out.unwrap_or_else(|| config.files.output_dir.clone());
    let written = run.write_outputs(&out, &formats);

    render_run(&run);
    render_outputs(written);
    Ok(())
}

fn render_run(run: &PipelineRun) {
    let declaration = &run.declaration;
    let totals = declaration.totals();

    println!("Export declaration {}", declaration.registration_number);
    println!(
        "Type {} ({}) at {} on {}",
        declaration.declaration_type.code(),
        declaration.declaration_type.label(),
        declaration.customs_office,
        declaration.issue_date.format("%d/%m/%Y")
    );
    println!(
        "Exporter: {} ({})",
        declaration.exporter.name, declaration.exporter.id
    );
    println!(
        "Items: {} | Packages: {} | Gross: {:.2} kg | Net: {:.2} kg | Value: {:.2} {}",
        totals.total_items,
        totals.total_packages,
        totals.total_gross_weight,
        totals.total_net_weight,
        totals.total_value,
        declaration.currency_code
    );

    println!("\nClassification");
    for (method, count) in run.outcome.method_counts() {
        println!("  {:<8} {}", method.label(), count);
    }
    let low_confidence: Vec<_> = run.outcome.low_confidence().collect();
    if !low_confidence.is_empty() {
        println!("  Review suggested for:");
        for resolved in low_confidence {
            println!(
                "    #{} {} -> {} ({}%)",
                resolved.item.item_number,
                resolved.item.description,
                resolved.classification.code,
                resolved.classification.confidence
            );
        }
    }
    if !run.outcome.issues.is_empty() {
        println!("  Skipped rows:");
        for issue in &run.outcome.issues {
            println!(
                "    row {}: {}{}",
                issue.row_number,
                issue.reason,
                issue
                    .description
                    .as_deref()
                    .map(|description| format!(" ({description})"))
                    .unwrap_or_default()
            );
        }
    }

    println!("\nValidation");
    for feedback in describe_report(&run.report) {
        let status = if feedback.success { "PASS" } else { "FAIL" };
        println!("  [{status}] {}: {}", feedback.context, feedback.message);
        for suggestion in &feedback.suggestions {
            println!("         - {suggestion}");
        }
    }
    let overall = run.report.overall();
    for error in &overall.errors {
        println!("  error: {error}");
    }
    for warning in &overall.warnings {
        println!("  warning: {warning}");
    }
}

fn render_outputs(written: Vec<(OutputFormat, Result<PathBuf, FormatError>)>) {
    println!("\nOutputs");
    for (format, result) in written {
        match result {
            Ok(path) => println!("  {:<6} {}", format.label(), path.display()),
            Err(err) => {
                let feedback = describe_error(
                    &AppError::from(err),
                    ProcessingContext::ExportFormatGeneration,
                );
                println!("  {:<6} failed: {}", format.label(), feedback.detail);
            }
        }
    }
}

pub(crate) fn run_classify(args: ClassifyArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let reference_path = args
        .reference
        .or_else(|| config.files.reference_path.clone());
    let store = load_reference(reference_path.as_deref())
        .map_err(|err| report_failure(err, ProcessingContext::ReferenceDataLoading))?;
    let weights = load_weights(config.files.weights_path.as_deref())
        .map_err(|err| report_failure(err, ProcessingContext::ReferenceDataLoading))?;
    let state = DeclarationState::new(store, config.resolution.clone()).with_weights(weights);
    let engine = state.engine(state.reference.clone());

    let quantity = if args.quantity.is_finite() && args.quantity > 0.0 {
        args.quantity
    } else {
        1.0
    };
    let result = classify(
        &engine,
        &args.description,
        args.product_code.as_deref(),
        quantity,
    );
    render_classification(&result);
    Ok(())
}

fn render_classification(result: &ClassificationResponse) {
    println!("{}", result.description);
    println!(
        "  HS code:    {} ({}, {}% confidence)",
        result.code,
        result.method.label(),
        result.confidence
    );
    if let Some(detail) = &result.detail {
        println!("  Reference:  {}", detail.description);
    }
    if result.low_confidence {
        println!("  Review suggested: low-confidence match");
    }
    println!(
        "  Weight:     {:.3} kg gross / {:.3} kg net for {}",
        result.weight.gross, result.weight.net, result.quantity
    );
    println!("  Previous:   {}", result.previous_document);
}

pub(crate) fn run_export_reference(args: ExportReferenceArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let reference_path = args
        .reference
        .or_else(|| config.files.reference_path.clone());
    let store = load_reference(reference_path.as_deref())
        .map_err(|err| report_failure(err, ProcessingContext::ReferenceDataLoading))?;
    let rows = store
        .export_path(&args.out)
        .map_err(|err| report_failure(err.into(), ProcessingContext::ReferenceDataLoading))?;
    println!("Wrote {rows} reference rows to {}", args.out.display());
    Ok(())
}

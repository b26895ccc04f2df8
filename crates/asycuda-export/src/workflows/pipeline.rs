//! End-to-end declaration generation: resolve, assemble, validate, render.

use crate::workflows::declaration::{
    Declaration, DeclarationAssembler, DeclarationHeader, DeclarationSettings,
};
use crate::workflows::encoders::{self, FormatError, OutputFormat};
use crate::workflows::reference::ReferenceDataStore;
use crate::workflows::resolution::{
    FieldResolutionEngine, ResolutionOptions, ResolutionOutcome, WeightEstimator,
};
use crate::workflows::sales::SalesRow;
use crate::workflows::validation::{
    validate_delimited, validate_markup, ValidationContext, ValidationEngine, ValidationReport,
};
use chrono::{Local, NaiveDateTime};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// One configured generation run over a shared, read-only reference store.
///
/// The pipeline holds no per-run state, so a single instance can serve
/// several sales files, including concurrently.
#[derive(Debug, Clone)]
pub struct DeclarationPipeline {
    engine: FieldResolutionEngine,
    assembler: DeclarationAssembler,
    validator: ValidationEngine,
}

impl DeclarationPipeline {
    pub fn new(
        store: Arc<ReferenceDataStore>,
        settings: DeclarationSettings,
        options: ResolutionOptions,
    ) -> Self {
        let engine = FieldResolutionEngine::new(store, options, settings.item_defaults.clone());
        Self {
            engine,
            assembler: DeclarationAssembler::new(settings),
            validator: ValidationEngine::new(),
        }
    }

    pub fn with_engine(mut self, engine: FieldResolutionEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Replaces the weight tables used for every resolved item.
    pub fn with_weights(mut self, weights: WeightEstimator) -> Self {
        self.engine = self.engine.with_weights(weights);
        self
    }

    pub fn with_validator(mut self, validator: ValidationEngine) -> Self {
        self.validator = validator;
        self
    }

    pub fn engine(&self) -> &FieldResolutionEngine {
        &self.engine
    }

    pub fn settings(&self) -> &DeclarationSettings {
        self.assembler.settings()
    }

    pub fn run(&self, rows: &[SalesRow], header: DeclarationHeader) -> PipelineRun {
        self.run_at(rows, header, Local::now().naive_local())
    }

    /// Same as [`DeclarationPipeline::run`] with an explicit clock.
    pub fn run_at(
        &self,
        rows: &[SalesRow],
        header: DeclarationHeader,
        now: NaiveDateTime,
    ) -> PipelineRun {
        let outcome = self.engine.resolve_rows(rows);
        let items = outcome.items().cloned().collect::<Vec<_>>();
        let declaration = self.assembler.assemble_at(header, items, now);
        let report = self.validator.validate_all(&declaration, None, None);

        info!(
            registration = %declaration.registration_number,
            rows = rows.len(),
            items = declaration.items().len(),
            skipped = outcome.issues.len(),
            valid = report.is_valid(),
            "pipeline run complete"
        );

        PipelineRun {
            declaration,
            outcome,
            report,
        }
    }
}

/// The bytes produced for one output format, or why that format failed.
#[derive(Debug)]
pub struct RenderedOutput {
    pub format: OutputFormat,
    pub result: Result<Vec<u8>, FormatError>,
}

impl RenderedOutput {
    pub fn text(&self) -> Option<&str> {
        match &self.result {
            Ok(bytes) if self.format.is_text() => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct PipelineRun {
    pub declaration: Declaration,
    pub outcome: ResolutionOutcome,
    pub report: ValidationReport,
}

impl PipelineRun {
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }

    /// Renders one format. Markup and delimited output is checked again and
    /// the result recorded in the report.
    pub fn render(&mut self, format: OutputFormat) -> Result<Vec<u8>, FormatError> {
        let bytes = encoders::render(format, &self.declaration)?;

        let text = String::from_utf8_lossy(&bytes);
        match format {
            OutputFormat::Markup => {
                self.report
                    .insert(ValidationContext::MarkupFormat, validate_markup(&text));
            }
            OutputFormat::Delimited => {
                self.report
                    .insert(ValidationContext::DelimitedFormat, validate_delimited(&text));
            }
            OutputFormat::Spreadsheet | OutputFormat::PrintForm => {}
        }

        Ok(bytes)
    }

    /// Renders each format independently; one failing format does not stop
    /// the others.
    pub fn render_formats(&mut self, formats: &[OutputFormat]) -> Vec<RenderedOutput> {
        formats
            .iter()
            .map(|&format| {
                let result = self.render(format);
                if let Err(err) = &result {
                    warn!(format = %format, error = %err, "output format failed");
                }
                RenderedOutput { format, result }
            })
            .collect()
    }

    pub fn render_all(&mut self) -> Vec<RenderedOutput> {
        self.render_formats(&OutputFormat::ALL)
    }

    /// Renders `formats` into `dir` as `declaration_<registration>.<ext>`.
    pub fn write_outputs(
        &mut self,
        dir: &Path,
        formats: &[OutputFormat],
    ) -> Vec<(OutputFormat, Result<PathBuf, FormatError>)> {
        if let Err(err) = std::fs::create_dir_all(dir) {
            return formats
                .iter()
                .map(|&format| {
                    let err = std::io::Error::new(err.kind(), err.to_string());
                    (format, Err(FormatError::Io(err)))
                })
                .collect();
        }

        let registration = self.declaration.registration_number.clone();
        self.render_formats(formats)
            .into_iter()
            .map(|output| {
                let written = output.result.and_then(|bytes| {
                    let path = dir.join(output.format.file_name(&registration));
                    std::fs::write(&path, bytes)?;
                    info!(path = %path.display(), "output written");
                    Ok(path)
                });
                (output.format, written)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::declaration::domain::fixtures::entity;
    use chrono::NaiveDate;

    fn clock() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 10, 1)
            .and_then(|date| date.and_hms_opt(9, 15, 0))
            .expect("valid timestamp")
    }

    fn pipeline() -> DeclarationPipeline {
        let options = ResolutionOptions {
            current_year: 2025,
            ..ResolutionOptions::default()
        };
        DeclarationPipeline::new(
            Arc::new(ReferenceDataStore::new()),
            DeclarationSettings::default(),
            options,
        )
    }

    fn header() -> DeclarationHeader {
        DeclarationHeader::new(
            entity("EXP001", "Island Duty Free Ltd"),
            entity("DEC001", "Harbour Brokers"),
        )
    }

    #[test]
    fn run_resolves_assembles_and_validates() {
        let rows = vec![
            SalesRow::new(2, "LADIES STRAW HAT", "25.00").with_quantity("1"),
            SalesRow::new(3, "", "4.00"),
            SalesRow::new(4, "MENS LINEN SHIRT", "$40.00").with_quantity("2"),
        ];
        let run = pipeline().run_at(&rows, header(), clock());

        assert_eq!(run.declaration.registration_number, "A202510010915");
        assert_eq!(run.declaration.items().len(), 2);
        assert_eq!(run.declaration.totals().total_value, 65.0);
        assert!(run.outcome.issues.is_empty());
        assert!(run.report.get(ValidationContext::Declaration).is_some());
        assert!(run.is_valid(), "{:?}", run.report.overall().errors);
    }

    #[test]
    fn loaded_weights_reach_every_item() {
        let mut weights = WeightEstimator::standard();
        weights.register_prefix("6504", 0.5, 0.4);
        let rows = vec![SalesRow::new(2, "LADIES STRAW HAT", "25.00").with_quantity("2")];
        let run = pipeline().with_weights(weights).run_at(&rows, header(), clock());

        let item = &run.declaration.items()[0];
        assert_eq!((item.gross_weight, item.net_weight), (1.0, 0.8));
    }

    #[test]
    fn empty_sales_still_produce_a_failed_report() {
        let run = pipeline().run_at(&[], header(), clock());
        assert!(!run.is_valid());
        assert!(run
            .report
            .overall()
            .errors
            .contains(&"Declaration must have at least one item".to_string()));
    }

    #[test]
    fn rendering_text_formats_extends_the_report() {
        let rows = vec![SalesRow::new(2, "LADIES STRAW HAT", "25.00")];
        let mut run = pipeline().run_at(&rows, header(), clock());
        let outputs = run.render_formats(&[OutputFormat::Markup, OutputFormat::Delimited]);

        assert!(outputs.iter().all(|output| output.result.is_ok()));
        assert!(outputs[1]
            .text()
            .is_some_and(|text| text.starts_with("H|A202510010915|EX3|")));
        let contexts: Vec<_> = run.report.contexts().map(ValidationContext::key).collect();
        assert_eq!(contexts, vec!["declaration", "xml_format", "txt_format"]);
        assert!(run.is_valid());
    }

    #[test]
    fn write_outputs_names_files_by_registration() {
        let dir = tempfile::tempdir().expect("temp dir");
        let rows = vec![SalesRow::new(2, "LADIES STRAW HAT", "25.00")];
        let mut run = pipeline().run_at(&rows, header(), clock());

        let written = run.write_outputs(
            dir.path(),
            &[OutputFormat::Delimited, OutputFormat::PrintForm],
        );
        let paths: Vec<PathBuf> = written
            .into_iter()
            .map(|(_, result)| result.expect("written"))
            .collect();
        assert_eq!(
            paths[0].file_name().and_then(|name| name.to_str()),
            Some("declaration_A202510010915.txt")
        );
        assert!(paths[1].exists());
    }
}

//! Pipeline
//!
//! Runs the stages in order: load the three source tables and report their
//! shape, build the panel, validate it, then estimate and export. The first
//! fatal error halts the run and is reported with the stage that raised it.
//! A specification that fails to estimate is recorded in the robustness
//! outputs instead.

use crate::config::PipelineConfig;
use credence_data::{
    SourceFormatError, SourceKind, SourceSummary, SourceTable, load_source_path,
};
use credence_model::{
    EstimationError, Estimator, RegressionResult, RobustnessEngine, RobustnessReport,
    SpecificationRegistry,
};
use credence_output::{ExportError, OutputWriter, PanelSummary, RunManifest};
use credence_panel::{
    PanelBuilder, PanelError, PanelQualityReport, PanelRejected, PanelValidator, SourceSet,
    ValidatedPanel,
};
use derive_more::Display;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

/// Pipeline stages, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    /// Reading source tables
    #[display("load")]
    Load,
    /// Joining and deriving the panel
    #[display("build")]
    Build,
    /// Checking panel integrity
    #[display("validate")]
    Validate,
    /// Fitting specifications
    #[display("estimate")]
    Estimate,
    /// Writing outputs
    #[display("export")]
    Export,
}

/// A fatal error, tagged with the stage that raised it.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A source table is malformed or unreadable
    #[error("[load] {source_kind} source: {source}")]
    Load {
        /// Which source table
        source_kind: SourceKind,
        /// Path read
        path: PathBuf,
        /// Underlying error
        source: SourceFormatError,
    },

    /// The panel could not be built
    #[error("[build] {0}")]
    Build(#[from] PanelError),

    /// The panel failed validation
    #[error("[validate] {source}")]
    Rejected {
        /// Quality report, violations included
        report: Box<PanelQualityReport>,
        /// Violations found
        source: PanelRejected,
    },

    /// The registry has no baseline specification
    #[error("[estimate] no baseline specification registered")]
    NoBaseline,

    /// The baseline specification could not be estimated
    #[error("[estimate] {0}")]
    Baseline(#[from] EstimationError),

    /// An output could not be written
    #[error("[export] {0}")]
    Export(#[from] ExportError),
}

impl PipelineError {
    /// Stage that raised the error.
    pub const fn stage(&self) -> Stage {
        match self {
            Self::Load { .. } => Stage::Load,
            Self::Build(_) => Stage::Build,
            Self::Rejected { .. } => Stage::Validate,
            Self::NoBaseline | Self::Baseline(_) => Stage::Estimate,
            Self::Export(_) => Stage::Export,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// How far a run goes past validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Mode {
    /// Panel, dictionary and quality report only
    #[display("build")]
    Build,
    /// Build, then the baseline specification
    #[display("fit")]
    Fit,
    /// Build, then the robustness battery
    #[display("robustness")]
    Robustness,
    /// Build, baseline and battery
    #[display("run")]
    Full,
}

impl Mode {
    const fn fits_baseline(self) -> bool {
        matches!(self, Self::Fit | Self::Full)
    }

    const fn runs_battery(self) -> bool {
        matches!(self, Self::Robustness | Self::Full)
    }
}

/// What a run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Per-source input summaries
    pub sources: Vec<SourceSummary>,
    /// Validated panel
    pub panel: ValidatedPanel,
    /// Panel quality report
    pub report: PanelQualityReport,
    /// Baseline estimates, when fitted
    pub baseline: Option<RegressionResult>,
    /// Robustness battery, when run
    pub robustness: Option<RobustnessReport>,
    /// Manifest written last
    pub manifest: RunManifest,
}

/// One configured pipeline.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    registry: SpecificationRegistry,
}

impl Pipeline {
    /// Pipeline over the standard specifications.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            registry: SpecificationRegistry::standard(),
        }
    }

    /// Replace the specification registry.
    pub fn with_registry(mut self, registry: SpecificationRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Current configuration.
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Registered specifications.
    pub const fn registry(&self) -> &SpecificationRegistry {
        &self.registry
    }

    /// Load one source table from its configured path.
    pub fn load_source(&self, kind: SourceKind) -> Result<SourceTable> {
        let path = self.config.sources.get(kind);
        let table = load_source_path(kind, path).map_err(|source| PipelineError::Load {
            source_kind: kind,
            path: path.to_path_buf(),
            source,
        })?;
        info!(source = %kind, path = %path.display(), rows = table.len(), "loaded source");
        Ok(table)
    }

    /// Load all three source tables.
    pub fn load_sources(&self) -> Result<SourceSet> {
        let anchor = self.load_source(SourceKind::Macro)?;
        let capital = self.load_source(SourceKind::Capital)?;
        let leverage = self.load_source(SourceKind::Leverage)?;
        Ok(SourceSet::new(anchor, capital, leverage)?)
    }

    /// Per-source input summaries, in anchor, capital, leverage order.
    pub fn source_summaries(&self, sources: &SourceSet) -> Vec<SourceSummary> {
        [sources.anchor(), sources.capital(), sources.leverage()]
            .into_iter()
            .map(|table| {
                let path = self.config.sources.get(table.kind);
                table.summary().with_path(path.display().to_string())
            })
            .collect()
    }

    /// Build and validate the panel from loaded sources.
    pub fn build_panel(&self, sources: &SourceSet) -> Result<(ValidatedPanel, PanelQualityReport)> {
        let panel = PanelBuilder::with_config(self.config.builder.clone()).build(sources)?;
        let validation = PanelValidator::with_config(self.config.validation.clone()).validate(panel);
        let report = validation.report.clone();
        match validation.into_validated() {
            Ok(panel) => Ok((panel, report)),
            Err(source) => Err(PipelineError::Rejected {
                report: Box::new(report),
                source,
            }),
        }
    }

    /// Fit the registry's baseline specification.
    pub fn fit_baseline(&self, panel: &ValidatedPanel) -> Result<RegressionResult> {
        let spec = self.registry.baseline().ok_or(PipelineError::NoBaseline)?;
        let result = Estimator::with_config(self.config.estimator.clone()).fit(spec, panel)?;
        info!(
            specification = %result.specification,
            n_obs = result.n_obs,
            r2 = result.r_squared,
            "fitted baseline"
        );
        Ok(result)
    }

    /// Fit every registered specification.
    pub fn robustness(&self, panel: &ValidatedPanel) -> RobustnessReport {
        RobustnessEngine::with_config(self.config.estimator.clone()).run(&self.registry, panel)
    }

    /// Run every stage `mode` needs and write the outputs.
    ///
    /// A rejected panel still gets its quality report written before the
    /// error is returned.
    pub fn run(&self, mode: Mode) -> Result<PipelineOutput> {
        info!(%mode, out_dir = %self.config.out_dir.display(), "starting pipeline");
        let mut writer = OutputWriter::new(&self.config.out_dir);

        let sources = self.load_sources()?;
        let source_summaries = self.source_summaries(&sources);
        writer.write_source_summary(&source_summaries)?;
        let (panel, report) = match self.build_panel(&sources) {
            Ok(built) => built,
            Err(PipelineError::Rejected { report, source }) => {
                warn!(violations = source.violations.len(), "panel rejected");
                writer.write_quality_report(&report)?;
                return Err(PipelineError::Rejected { report, source });
            }
            Err(e) => return Err(e),
        };

        writer.write_panel(&panel)?;
        writer.write_dictionary()?;
        writer.write_quality_report(&report)?;

        let robustness = mode.runs_battery().then(|| self.robustness(&panel));
        let baseline = match (&robustness, mode.fits_baseline()) {
            (_, true) => Some(self.fit_baseline(&panel)?),
            (Some(battery), false) => self
                .registry
                .baseline()
                .and_then(|spec| battery.result(&spec.name))
                .cloned(),
            (None, false) => None,
        };

        if let Some(result) = &baseline {
            writer.write_baseline(result)?;
        }
        match &robustness {
            Some(battery) => {
                writer.write_robustness(battery)?;
            }
            None => {
                if let Some(result) = &baseline {
                    writer.write_regression(result)?;
                }
            }
        }

        let mut manifest = RunManifest::new(crate::VERSION);
        manifest.panel = Some(PanelSummary {
            rows: report.rows,
            first_year: report.first_year,
            last_year: report.last_year,
            accepted: report.is_accepted(),
            warnings: report.warnings.len(),
        });
        match &robustness {
            Some(battery) => {
                for outcome in &battery.outcomes {
                    let name = outcome.specification.name.clone();
                    if outcome.outcome.result().is_some() {
                        manifest.fitted.push(name);
                    } else {
                        manifest.failed.push(name);
                    }
                }
            }
            None => manifest
                .fitted
                .extend(baseline.iter().map(|r| r.specification.clone())),
        }
        writer.write_manifest(&mut manifest)?;

        info!(
            %mode,
            files = writer.written().len(),
            failed = manifest.failed.len(),
            "pipeline complete"
        );
        Ok(PipelineOutput {
            sources: source_summaries,
            panel,
            report,
            baseline,
            robustness,
            manifest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Mode::Build, false, false)]
    #[case(Mode::Fit, true, false)]
    #[case(Mode::Robustness, false, true)]
    #[case(Mode::Full, true, true)]
    fn test_mode_stages(#[case] mode: Mode, #[case] baseline: bool, #[case] battery: bool) {
        assert_eq!(mode.fits_baseline(), baseline);
        assert_eq!(mode.runs_battery(), battery);
    }

    #[test]
    fn test_missing_source_names_load_stage() {
        let mut config = PipelineConfig::default();
        config.sources.set(SourceKind::Macro, "/nonexistent/business_cycle.csv");
        let err = Pipeline::new(config).load_sources().unwrap_err();
        assert_eq!(err.stage(), Stage::Load);
        let message = err.to_string();
        assert!(message.starts_with("[load] business_cycle source"), "{message}");
    }

    #[test]
    fn test_empty_registry_has_no_baseline() {
        let pipeline = Pipeline::new(PipelineConfig::default()).with_registry(SpecificationRegistry::new());
        assert!(pipeline.registry().baseline().is_none());
        assert_eq!(PipelineError::NoBaseline.stage(), Stage::Estimate);
    }
}

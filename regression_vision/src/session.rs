// THEORY:
// A `Session` is the explicit application state of a host: the current settings,
// the two inputs, the latest result, its annotations, and the history. The engine
// takes immutable inputs and returns an immutable result; everything that needs to
// be remembered between interactions lives here, owned by the host, instead of in
// process-wide globals.

use crate::config::ComparisonConfig;
use crate::core_modules::frame::RgbFrame;
use crate::core_modules::history::{ComparisonHistory, HistoryEntry};
use crate::error::{DiffError, Result};
use crate::pipeline::{ComparisonResult, compare};

#[derive(Debug, Clone, Default)]
pub struct Session {
    settings: ComparisonConfig,
    baseline: Option<RgbFrame>,
    candidate: Option<RgbFrame>,
    current: Option<ComparisonResult>,
    annotations: Vec<serde_json::Value>,
    history: ComparisonHistory,
}

impl Session {
    pub fn new(settings: ComparisonConfig) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            ..Self::default()
        })
    }

    pub fn settings(&self) -> &ComparisonConfig {
        &self.settings
    }

    /// Replaces the settings if they validate; the old ones stay otherwise.
    pub fn update_settings(&mut self, settings: ComparisonConfig) -> Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn set_baseline(&mut self, frame: RgbFrame) {
        self.baseline = Some(frame);
    }

    pub fn set_candidate(&mut self, frame: RgbFrame) {
        self.candidate = Some(frame);
    }

    pub fn baseline(&self) -> Option<&RgbFrame> {
        self.baseline.as_ref()
    }

    pub fn candidate(&self) -> Option<&RgbFrame> {
        self.candidate.as_ref()
    }

    /// Compares the current inputs with the current settings. On success the result
    /// becomes the current one and a snapshot is recorded in the history. On failure
    /// the previous result is left in place.
    pub fn run_comparison(&mut self) -> Result<&ComparisonResult> {
        let (Some(baseline), Some(candidate)) = (&self.baseline, &self.candidate) else {
            return Err(DiffError::InvalidImage(
                "both a baseline and a candidate are required".to_string(),
            ));
        };

        let result = compare(baseline.clone(), candidate.clone(), self.settings.clone())?;
        let entry = HistoryEntry::from_result(baseline, candidate, &result, Vec::new())?;

        self.history.push(entry);
        self.annotations.clear();
        Ok(&*self.current.insert(result))
    }

    pub fn current_result(&self) -> Option<&ComparisonResult> {
        self.current.as_ref()
    }

    /// Attaches annotations to the current result. They are stored verbatim.
    pub fn set_annotations(&mut self, annotations: Vec<serde_json::Value>) {
        self.annotations = annotations;
    }

    pub fn annotations(&self) -> &[serde_json::Value] {
        &self.annotations
    }

    /// Records the current result, with its annotations, as a new history entry.
    pub fn save_current_to_history(&mut self) -> Result<()> {
        let (Some(result), Some(baseline), Some(candidate)) =
            (&self.current, &self.baseline, &self.candidate)
        else {
            return Err(DiffError::InvalidImage(
                "no comparison result to save".to_string(),
            ));
        };
        let entry = HistoryEntry::from_result(baseline, candidate, result, self.annotations.clone())?;
        self.history.push(entry);
        Ok(())
    }

    pub fn history(&self) -> &ComparisonHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut ComparisonHistory {
        &mut self.history
    }
}

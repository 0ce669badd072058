//! Annotation session state machine.
//!
//! An [`Annotator`] owns everything that lives for the whole process: the
//! dataset cache, the judgments collected across every source, and the one
//! [`Session`] currently being worked through. Front ends drive it with
//! [`Action`]s and render whatever state it is left in.

use crate::config::{Config, Source};
use crate::dataset::DatasetLoader;
use crate::error::AnnotateError;
use crate::export::{self, Export, ExportFormat};
use crate::models::{Judgment, Record, Rubric, ScoreSheet, Scores};
use crate::sampler;
use chrono::Local;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Where the annotator stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoFileSelected,
    /// A source is selected but has nothing to annotate
    EmptyOrFailed,
    Active,
    Complete,
}

/// A user action
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Select(String),
    Deselect,
    Reset,
    Submit(Submission),
}

/// The evaluator's answers for the current item
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub scores: Scores,
    pub comment: String,
}

/// What an action changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The action had no effect, e.g. re-selecting the active source
    Unchanged,
    Started { key: String, sampled: usize },
    Cleared,
    /// A judgment was stored and the next item is up
    Advanced { position: usize, total: usize },
    Completed { key: String, judged: usize },
}

/// One pass over a sample of a single source
#[derive(Debug)]
pub struct Session {
    key: String,
    path: PathBuf,
    sample: Rc<[Record]>,
    judgments: Vec<Judgment>,
}

impl Session {
    fn new(key: &str, path: &Path, sample: Vec<Record>) -> Self {
        Self {
            key: key.to_string(),
            path: path.to_path_buf(),
            sample: Rc::from(sample),
            judgments: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample(&self) -> &Rc<[Record]> {
        &self.sample
    }

    /// Index of the next item to judge; always equal to the number of judgments
    pub fn cursor(&self) -> usize {
        self.judgments.len()
    }

    pub fn judgments(&self) -> &[Judgment] {
        &self.judgments
    }

    /// The item awaiting a judgment, with its position in the sample
    pub fn current(&self) -> Option<(usize, &Record)> {
        let position = self.cursor();
        self.sample.get(position).map(|record| (position, record))
    }

    pub fn is_complete(&self) -> bool {
        !self.sample.is_empty() && self.cursor() == self.sample.len()
    }

    pub fn phase(&self) -> Phase {
        if self.sample.is_empty() {
            Phase::EmptyOrFailed
        } else if self.is_complete() {
            Phase::Complete
        } else {
            Phase::Active
        }
    }
}

/// Long-lived owner of the loader cache, the global judgment map and the live session
pub struct Annotator {
    sources: Vec<Source>,
    rubric: Rubric,
    sample_fraction: f64,
    loader: DatasetLoader,
    rng: StdRng,
    session: Option<Session>,
    collected: BTreeMap<String, Vec<Judgment>>,
}

impl Annotator {
    pub fn new(sources: Vec<Source>, rubric: Rubric, sample_fraction: f64, rng: StdRng) -> Self {
        Self {
            sources,
            rubric,
            sample_fraction,
            loader: DatasetLoader::new(),
            rng,
            session: None,
            collected: BTreeMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self::new(
            config.sources.clone(),
            config.rubric()?,
            config.sample_fraction,
            rng,
        ))
    }

    /// Apply one user action
    pub fn handle(&mut self, action: Action) -> Result<Outcome, AnnotateError> {
        match action {
            Action::Select(key) => self.select_file(&key),
            Action::Deselect => Ok(self.deselect()),
            Action::Reset => self.reset_current_file(),
            Action::Submit(submission) => self.submit_judgment(submission),
        }
    }

    /// Switch to `key`, drawing a fresh sample unless it is already active
    pub fn select_file(&mut self, key: &str) -> Result<Outcome, AnnotateError> {
        if self.active_key() == Some(key) {
            debug!(key, "source already active");
            return Ok(Outcome::Unchanged);
        }
        self.start(key)
    }

    /// Draw a new sample for the active source, dropping this pass's judgments.
    ///
    /// Judgments already in the global map stay there.
    pub fn reset_current_file(&mut self) -> Result<Outcome, AnnotateError> {
        let key = self
            .active_key()
            .ok_or(AnnotateError::NoActiveSource)?
            .to_string();
        info!(key = %key, "resetting source");
        self.start(&key)
    }

    pub fn deselect(&mut self) -> Outcome {
        match self.session.take() {
            Some(session) => {
                info!(key = %session.key, "source deselected");
                Outcome::Cleared
            }
            None => Outcome::Unchanged,
        }
    }

    /// Record a judgment for the current item and move to the next one
    pub fn submit_judgment(&mut self, submission: Submission) -> Result<Outcome, AnnotateError> {
        let session = self
            .session
            .as_mut()
            .ok_or(AnnotateError::NotAwaitingJudgment)?;
        let (position, record) = session.current().ok_or(AnnotateError::NotAwaitingJudgment)?;

        let judgment = Judgment {
            original_file_key: session.key.clone(),
            original_file_path: session.path.display().to_string(),
            data_id: record.display_id(position),
            sampled_item_user_a: record.speaker_a_utterance.clone(),
            sampled_item_background: record.background_context.clone(),
            sampled_item_user_b: record.speaker_b_response.clone(),
            evaluation_scores: ScoreSheet::new(&self.rubric, &submission.scores),
            evaluator_comment: submission.comment,
            evaluation_timestamp: Local::now(),
        };
        debug!(key = %session.key, data_id = %judgment.data_id, position, "judgment recorded");

        self.collected
            .entry(session.key.clone())
            .or_default()
            .push(judgment.clone());
        session.judgments.push(judgment);

        let total = session.sample.len();
        if session.is_complete() {
            info!(key = %session.key, judged = total, "source complete");
            Ok(Outcome::Completed {
                key: session.key.clone(),
                judged: total,
            })
        } else {
            Ok(Outcome::Advanced {
                position: session.cursor(),
                total,
            })
        }
    }

    /// Serialize the active source's judgments from this pass
    pub fn export_current_file(&self, format: ExportFormat) -> Result<Export, AnnotateError> {
        let session = self.session.as_ref().ok_or(AnnotateError::NoActiveSource)?;
        if session.judgments.is_empty() {
            return Err(AnnotateError::NothingToExport {
                key: session.key.clone(),
            });
        }
        let bytes = export::render(&session.judgments, format)?;
        Ok(Export {
            file_name: export::file_name(&session.key, format, Local::now()),
            bytes,
        })
    }

    pub fn phase(&self) -> Phase {
        self.session
            .as_ref()
            .map_or(Phase::NoFileSelected, Session::phase)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn active_key(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.key.as_str())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Every judgment made for `key` during this process, across resets
    pub fn collected(&self, key: &str) -> &[Judgment] {
        self.collected.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn loader(&self) -> &DatasetLoader {
        &self.loader
    }

    fn start(&mut self, key: &str) -> Result<Outcome, AnnotateError> {
        let source = self
            .sources
            .iter()
            .find(|source| source.key == key)
            .ok_or_else(|| AnnotateError::UnknownSource(key.to_string()))?;
        let path = source.path.clone();

        self.session = None;
        debug!(key, path = %path.display(), "loading source");

        let dataset = match self.loader.load(&path) {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(key, error = %err, "source unavailable");
                self.session = Some(Session::new(key, &path, Vec::new()));
                return Err(err);
            }
        };

        let sample = sampler::sample(dataset.as_slice(), self.sample_fraction, &mut self.rng);
        let sampled = sample.len();
        self.session = Some(Session::new(key, &path, sample));

        if sampled == 0 {
            warn!(key, "source yielded no records");
            return Err(AnnotateError::EmptySample {
                key: key.to_string(),
            });
        }

        info!(key, sampled, "annotation started");
        Ok(Outcome::Started {
            key: key.to_string(),
            sampled,
        })
    }
}

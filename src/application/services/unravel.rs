//! Unravel service
//!
//! Reads morphology files, unravels them and writes the results, either one
//! file at a time or for a whole directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::application::error_ext::IoResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{self, Morphology, UnravelOptions};
use crate::infrastructure::swc;
use crate::infrastructure::traits::FileSystem;
use crate::util::path::PathExt;

/// Figures describing one unravelled morphology.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnravelSummary {
    pub sections: usize,
    pub points: usize,
    /// Largest distance between a point and its unravelled position.
    pub max_displacement: f64,
}

impl UnravelSummary {
    pub fn between(original: &Morphology, unravelled: &Morphology) -> Self {
        let max_displacement = original
            .iter()
            .filter_map(|(idx, section)| {
                unravelled.section(idx).map(|new| {
                    section
                        .points()
                        .iter()
                        .zip(new.points())
                        .map(|(a, b)| (b - a).norm())
                        .fold(0.0_f64, f64::max)
                })
            })
            .fold(0.0_f64, f64::max);

        Self {
            sections: original.section_count(),
            points: original.point_count(),
            max_displacement,
        }
    }
}

/// Result for one file of a directory run.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Unravelled {
        input: PathBuf,
        output: PathBuf,
        summary: UnravelSummary,
    },
    Failed {
        input: PathBuf,
        reason: String,
    },
}

impl FileOutcome {
    pub fn input(&self) -> &Path {
        match self {
            FileOutcome::Unravelled { input, .. } | FileOutcome::Failed { input, .. } => input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Unravelled { .. })
    }
}

/// Outcomes of a directory run, in input file name order.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

/// Service for unravelling morphology files.
pub struct UnravelService {
    fs: Arc<dyn FileSystem>,
    options: UnravelOptions,
}

impl UnravelService {
    /// Create a new unravel service.
    pub fn new(fs: Arc<dyn FileSystem>, options: UnravelOptions) -> Self {
        Self { fs, options }
    }

    /// Read and parse a morphology file.
    pub fn load(&self, path: &Path) -> ApplicationResult<Morphology> {
        if !path.is_swc_file() {
            return Err(ApplicationError::UnsupportedFormat(path.to_path_buf()));
        }
        if !self.fs.exists(path) {
            return Err(ApplicationError::NotFound(path.to_path_buf()));
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read morphology", path)?;
        swc::parse(&content).map_err(|source| ApplicationError::Format {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write a morphology file atomically.
    pub fn save(&self, morphology: &Morphology, path: &Path) -> ApplicationResult<()> {
        if !path.is_swc_file() {
            return Err(ApplicationError::UnsupportedFormat(path.to_path_buf()));
        }
        self.fs
            .write_atomic(path, &swc::render(morphology))
            .with_path_context("write morphology", path)
    }

    /// Unravel one file and return the new morphology without writing it.
    pub fn unravel_file(&self, input: &Path) -> ApplicationResult<Morphology> {
        let morphology = self.load(input)?;
        domain::unravel(&morphology, &self.options).map_err(|source| ApplicationError::Domain {
            path: input.to_path_buf(),
            source,
        })
    }

    /// Unravel `input` and write the result to `output`.
    ///
    /// Nothing is written when any step fails.
    pub fn unravel_to(&self, input: &Path, output: &Path) -> ApplicationResult<UnravelSummary> {
        debug!(
            "unravel_to: input={}, output={}, window_half_length={}",
            input.display(),
            output.display(),
            self.options.window_half_length
        );
        let original = self.load(input)?;
        let unravelled =
            domain::unravel(&original, &self.options).map_err(|source| ApplicationError::Domain {
                path: input.to_path_buf(),
                source,
            })?;
        self.save(&unravelled, output)?;
        Ok(UnravelSummary::between(&original, &unravelled))
    }

    /// Morphology files directly inside `dir`, sorted by path.
    pub fn collect_files(&self, dir: &Path, extensions: &[String]) -> ApplicationResult<Vec<PathBuf>> {
        if !self.fs.exists(dir) {
            return Err(ApplicationError::NotFound(dir.to_path_buf()));
        }
        if !self.fs.is_dir(dir) {
            return Err(ApplicationError::NotADirectory(dir.to_path_buf()));
        }
        let files = self
            .fs
            .list_files(dir)
            .with_path_context("list directory", dir)?;
        Ok(files
            .into_iter()
            .filter(|f| f.has_extension_in(extensions))
            .sorted()
            .collect())
    }

    /// Unravel every morphology file of `input_dir` into `output_dir`.
    ///
    /// A failing file becomes a [`FileOutcome::Failed`] and the run goes on.
    /// Only problems with the directories themselves are returned as errors.
    pub fn unravel_dir(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        extensions: &[String],
        parallel: bool,
    ) -> ApplicationResult<BatchReport> {
        let files = self.collect_files(input_dir, extensions)?;
        debug!(
            "unravel_dir: {} files in {}",
            files.len(),
            input_dir.display()
        );

        if !self.fs.exists(output_dir) {
            self.fs
                .create_dir_all(output_dir)
                .with_path_context("create output directory", output_dir)?;
        } else if !self.fs.is_dir(output_dir) {
            return Err(ApplicationError::NotADirectory(output_dir.to_path_buf()));
        }

        let process = |input: &PathBuf| -> FileOutcome {
            info!("{}", input.display());
            // list_files only returns entries with a file name
            let output = match input.file_name() {
                Some(name) => output_dir.join(name),
                None => output_dir.to_path_buf(),
            };
            match self.unravel_to(input, &output) {
                Ok(summary) => FileOutcome::Unravelled {
                    input: input.clone(),
                    output,
                    summary,
                },
                Err(e) => FileOutcome::Failed {
                    input: input.clone(),
                    reason: e.chain(),
                },
            }
        };

        // Indexed parallel iterators keep input order
        let outcomes: Vec<FileOutcome> = if parallel {
            files.par_iter().map(process).collect()
        } else {
            files.iter().map(process).collect()
        };

        Ok(BatchReport { outcomes })
    }
}

use std::borrow::Cow;

use osu_schema::{Beatmap, Difficulty, GameMode, Metadata};
use rayon::prelude::*;
use tracing::{debug, info, warn};

pub mod cursor;
mod error;
mod parser;
mod playfield;
mod timing;
mod validate;

pub use error::{LoadError, LoadErrorKind};

use parser::parse_chart;
use playfield::build_playfield;
use timing::resolve_timing_points;
use validate::validate_chart;

/// One chart file handed over by the file source (directory listing, archive, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl ChartFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Parse the difficulties of a set on the rayon thread pool. Output order is unaffected.
    pub parallel: bool,
    /// Stop each chart at `[TimingPoints]`/`[HitObjects]`. Timing points, hit objects and the
    /// playfield stay empty.
    pub meta_only: bool,
}

/// A fully resolved difficulty plus the set-level fields it declared.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDifficulty {
    pub set_id: Option<i64>,
    pub meta: Metadata,
    pub difficulty: Difficulty,
    /// Recoverable line errors. The offending lines were skipped.
    pub warnings: Vec<LoadError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub beatmap: Beatmap,
    /// Fatal errors of the difficulties that were left out of the set.
    pub rejected: Vec<LoadError>,
    pub warnings: Vec<LoadError>,
}

pub fn load_beatmapset(files: Vec<ChartFile>) -> Result<LoadReport, LoadError> {
    load_beatmapset_with_options(files, &LoadOptions::default())
}

/// Loads every chart of a set. Charts that fail are reported in `rejected`; the call only fails
/// when no chart could be loaded.
pub fn load_beatmapset_with_options(
    files: Vec<ChartFile>,
    options: &LoadOptions,
) -> Result<LoadReport, LoadError> {
    let total = files.len();
    let results: Vec<Result<LoadedDifficulty, LoadError>> = if options.parallel {
        files
            .par_iter()
            .map(|f| load_difficulty_with_options(&f.name, &f.content, options))
            .collect()
    } else {
        files
            .iter()
            .map(|f| load_difficulty_with_options(&f.name, &f.content, options))
            .collect()
    };
    drop(files);

    let mut beatmap = Beatmap::default();
    let mut rejected = Vec::new();
    let mut warnings = Vec::new();

    for result in results {
        match result {
            Ok(loaded) => {
                if beatmap.difficulties.is_empty() {
                    beatmap.id = loaded.set_id;
                    beatmap.meta = loaded.meta;
                } else if loaded.meta.title != beatmap.meta.title {
                    debug!(
                        kept = %beatmap.meta.title,
                        ignored = %loaded.meta.title,
                        "difficulty declares a different title; keeping the first"
                    );
                }
                warnings.extend(loaded.warnings);
                beatmap.difficulties.push(loaded.difficulty);
            }
            Err(e) => {
                warn!(code = e.code, "rejected difficulty: {e}");
                rejected.push(e);
            }
        }
    }

    if beatmap.difficulties.is_empty() {
        let message = match rejected.first() {
            Some(first) => format!("no difficulty could be loaded ({total} rejected, first: {first})"),
            None => "no difficulty could be loaded (set is empty)".to_string(),
        };
        return Err(LoadError::new("E5001", message, 0));
    }

    info!(
        title = %beatmap.meta.title,
        loaded = beatmap.difficulties.len(),
        rejected = rejected.len(),
        "loaded beatmap set"
    );

    Ok(LoadReport {
        beatmap,
        rejected,
        warnings,
    })
}

pub fn load_difficulty(name: &str, content: &[u8]) -> Result<LoadedDifficulty, LoadError> {
    load_difficulty_with_options(name, content, &LoadOptions::default())
}

/// Runs the whole pipeline for one chart. Every error carries `name` as its file.
pub fn load_difficulty_with_options(
    name: &str,
    content: &[u8],
    options: &LoadOptions,
) -> Result<LoadedDifficulty, LoadError> {
    let src = String::from_utf8_lossy(content);
    if let Cow::Owned(_) = src {
        warn!(file = name, "chart is not valid UTF-8; invalid bytes were replaced");
    }

    let mut loaded = load_chart(&src, options).map_err(|e| e.with_file(name))?;
    for w in &mut loaded.warnings {
        w.file = Some(name.to_string());
        warn!(code = w.code, line = w.line, section = w.section, "{w}");
    }
    Ok(loaded)
}

pub fn load_difficulty_str(src: &str) -> Result<LoadedDifficulty, LoadError> {
    load_chart(src, &LoadOptions::default())
}

fn load_chart(src: &str, options: &LoadOptions) -> Result<LoadedDifficulty, LoadError> {
    let parsed = parse_chart(src, options.meta_only)?;
    validate_chart(&parsed, options.meta_only)?;

    if options.meta_only {
        return Ok(LoadedDifficulty {
            set_id: parsed.set_id,
            meta: parsed.meta,
            difficulty: parsed.difficulty,
            warnings: parsed.warnings,
        });
    }

    let mut difficulty = parsed.difficulty;
    if difficulty.mode != GameMode::Mania {
        debug!(mode = ?difficulty.mode, "chart is not a mania chart; columns follow CircleSize");
    }

    let timing_points = std::mem::take(&mut difficulty.timing_points);
    difficulty.timing_points = resolve_timing_points(timing_points, difficulty.sv)?;
    difficulty.playfield = build_playfield(
        &difficulty.hit_objects,
        &difficulty.timing_points,
        difficulty.column_count(),
    );

    Ok(LoadedDifficulty {
        set_id: parsed.set_id,
        meta: parsed.meta,
        difficulty,
        warnings: parsed.warnings,
    })
}

use std::str::FromStr;

use osu_schema::{
    column_count, column_for_x, BreakEvent, Difficulty, GameMode, HitObject, Metadata, Seconds,
    TimingPoint, VideoEvent, MAX_COLUMNS,
};
use tracing::debug;

use crate::cursor::{Line, LineCursor};
use crate::LoadError;

const FORMAT_MAGIC: &str = "osu file format v";

const EFFECT_KIAI: u32 = 1 << 0;
const EFFECT_OMIT_FIRST_BARLINE: u32 = 1 << 3;

const OBJECT_TAP: u32 = 1 << 0;
const OBJECT_HOLD: u32 = 1 << 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    NoSection,
    General,
    Metadata,
    Difficulty,
    Events,
    TimingPoints,
    HitObjects,
    Unknown,
}

impl Section {
    fn from_name(name: &str) -> Self {
        match name {
            "General" => Self::General,
            "Metadata" => Self::Metadata,
            "Difficulty" => Self::Difficulty,
            "Events" => Self::Events,
            "TimingPoints" => Self::TimingPoints,
            "HitObjects" => Self::HitObjects,
            _ => Self::Unknown,
        }
    }

    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::NoSection => "",
            Self::General => "General",
            Self::Metadata => "Metadata",
            Self::Difficulty => "Difficulty",
            Self::Events => "Events",
            Self::TimingPoints => "TimingPoints",
            Self::HitObjects => "HitObjects",
            Self::Unknown => "Unknown",
        }
    }

    fn is_chart_body(self) -> bool {
        matches!(self, Self::TimingPoints | Self::HitObjects)
    }

    fn lookup(self, key: &str) -> Option<Field> {
        let table: &[(&str, Field)] = match self {
            Self::General => GENERAL_FIELDS,
            Self::Metadata => METADATA_FIELDS,
            Self::Difficulty => DIFFICULTY_FIELDS,
            _ => &[],
        };
        table.iter().find(|(name, _)| *name == key).map(|(_, field)| *field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AudioFilename,
    AudioLeadIn,
    PreviewTime,
    StackLeniency,
    Mode,
    Title,
    Artist,
    Creator,
    Version,
    Source,
    Tags,
    BeatmapId,
    BeatmapSetId,
    HpDrainRate,
    CircleSize,
    OverallDifficulty,
    ApproachRate,
    SliderMultiplier,
    SliderTickRate,
}

const GENERAL_FIELDS: &[(&str, Field)] = &[
    ("AudioFilename", Field::AudioFilename),
    ("AudioLeadIn", Field::AudioLeadIn),
    ("PreviewTime", Field::PreviewTime),
    ("StackLeniency", Field::StackLeniency),
    ("Mode", Field::Mode),
];

const METADATA_FIELDS: &[(&str, Field)] = &[
    ("Title", Field::Title),
    ("Artist", Field::Artist),
    ("Creator", Field::Creator),
    ("Version", Field::Version),
    ("Source", Field::Source),
    ("Tags", Field::Tags),
    ("BeatmapID", Field::BeatmapId),
    ("BeatmapSetID", Field::BeatmapSetId),
];

const DIFFICULTY_FIELDS: &[(&str, Field)] = &[
    ("HPDrainRate", Field::HpDrainRate),
    ("CircleSize", Field::CircleSize),
    ("OverallDifficulty", Field::OverallDifficulty),
    ("ApproachRate", Field::ApproachRate),
    ("SliderMultiplier", Field::SliderMultiplier),
    ("SliderTickRate", Field::SliderTickRate),
];

/// One chart as read from its text, before validation and timing resolution.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedChart {
    pub(crate) set_id: Option<i64>,
    pub(crate) meta: Metadata,
    pub(crate) difficulty: Difficulty,
    pub(crate) warnings: Vec<LoadError>,
}

/// Reads one chart. With `meta_only` set, reading stops at the first `[TimingPoints]` or
/// `[HitObjects]` header.
pub(crate) fn parse_chart(src: &str, meta_only: bool) -> Result<ParsedChart, LoadError> {
    let mut cursor = LineCursor::new(src);
    let first = cursor.next().ok_or_else(|| {
        LoadError::new("E1001", "empty chart: missing `osu file format v<N>` line", 0)
    })?;

    let mut parser = SectionParser::new(parse_format_version(first)?);
    for line in cursor {
        parser.feed(line)?;
        if meta_only && parser.section.is_chart_body() {
            debug!(line = line.number, "metadata read; skipping the chart body");
            break;
        }
    }
    parser.finish()
}

fn parse_format_version(line: Line<'_>) -> Result<u32, LoadError> {
    let Some(rest) = line.text.strip_prefix(FORMAT_MAGIC) else {
        return Err(LoadError::new(
            "E1001",
            format!("expected `{FORMAT_MAGIC}<N>` as the first line"),
            line.number,
        )
        .with_context(line.text));
    };

    rest.trim().parse().map_err(|_| {
        LoadError::new(
            "E1002",
            format!("invalid format version `{}`", rest.trim()),
            line.number,
        )
        .with_context(line.text)
    })
}

struct SectionParser {
    section: Section,
    chart: ParsedChart,
    /// Timing points with their source line, in file order.
    timing_points: Vec<(usize, TimingPoint)>,
}

impl SectionParser {
    fn new(format_version: u32) -> Self {
        let mut chart = ParsedChart::default();
        chart.difficulty.format_version = format_version;
        Self {
            section: Section::NoSection,
            chart,
            timing_points: Vec::new(),
        }
    }

    fn feed(&mut self, line: Line<'_>) -> Result<(), LoadError> {
        if let Some(name) = section_header(line.text) {
            self.section = Section::from_name(name);
            if self.section == Section::Unknown {
                debug!(section = name, line = line.number, "skipping unrecognized section");
            }
            return Ok(());
        }

        let result = match self.section {
            Section::NoSection | Section::Unknown => Ok(()),
            Section::General | Section::Metadata | Section::Difficulty => self.key_value(line),
            Section::Events => self.event(line),
            Section::TimingPoints => self.timing_point(line),
            Section::HitObjects => self.hit_object(line),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) => {
                let e = e.with_section(self.section.name());
                if e.kind.is_recoverable() {
                    self.chart.warnings.push(e);
                    Ok(())
                } else {
                    Err(e)
                }
            }
        }
    }

    fn finish(mut self) -> Result<ParsedChart, LoadError> {
        // stable: equal times keep file order
        self.timing_points
            .sort_by(|(_, a), (_, b)| a.start_time.total_cmp(&b.start_time));
        if let Some((line, first)) = self.timing_points.first() {
            if !first.is_uninherited {
                return Err(LoadError::new(
                    "E1101",
                    "earliest timing point must be uninherited",
                    *line,
                )
                .with_section(Section::TimingPoints.name())
                .with_time(first.start_time));
            }
        }

        let d = &mut self.chart.difficulty;
        d.timing_points = self.timing_points.into_iter().map(|(_, p)| p).collect();
        d.hit_objects
            .sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        Ok(self.chart)
    }

    fn key_value(&mut self, line: Line<'_>) -> Result<(), LoadError> {
        let Some((key, value)) = line.text.split_once(':') else {
            return Err(line_error("E4001", "expected `Key: Value`", line));
        };
        match self.section.lookup(key) {
            Some(field) => self.apply(field, key, value.trim(), line),
            None => Ok(()),
        }
    }

    fn apply(&mut self, field: Field, key: &str, value: &str, line: Line<'_>) -> Result<(), LoadError> {
        let d = &mut self.chart.difficulty;
        let meta = &mut self.chart.meta;

        match field {
            Field::AudioFilename => d.audio_filename = value.to_string(),
            Field::AudioLeadIn => {
                d.audio_lead_in = parse_ms(value).ok_or_else(|| invalid_value(key, value, line))?
            }
            Field::PreviewTime => {
                let t = parse_ms(value).ok_or_else(|| invalid_value(key, value, line))?;
                d.preview_time = (t >= 0.0).then_some(t);
            }
            Field::StackLeniency => d.stack_leniency = parse_value(key, value, line)?,
            Field::Mode => {
                let id: u8 = parse_value(key, value, line)?;
                d.mode = GameMode::from_id(id).ok_or_else(|| invalid_value(key, value, line))?;
            }

            Field::Title => meta.title = value.to_string(),
            Field::Artist => meta.artist = value.to_string(),
            Field::Creator => meta.creator = value.to_string(),
            Field::Version => d.name = value.to_string(),
            Field::Source => meta.source = value.to_string(),
            Field::Tags => meta.tags = value.split_whitespace().map(str::to_string).collect(),
            Field::BeatmapId => d.id = Some(parse_value(key, value, line)?),
            Field::BeatmapSetId => self.chart.set_id = Some(parse_value(key, value, line)?),

            Field::HpDrainRate => d.hp = parse_value(key, value, line)?,
            Field::CircleSize => {
                let cs: f64 = parse_value(key, value, line)?;
                if !(cs.is_finite() && cs <= MAX_COLUMNS as f64) {
                    return Err(LoadError::new(
                        "E2002",
                        format!("CircleSize `{value}` is not a usable column count (max {MAX_COLUMNS})"),
                        line.number,
                    )
                    .with_context(line.text));
                }
                d.cs = cs;
            }
            Field::OverallDifficulty => d.od = parse_value(key, value, line)?,
            Field::ApproachRate => d.ar = parse_value(key, value, line)?,
            Field::SliderMultiplier => d.sv = parse_value(key, value, line)?,
            Field::SliderTickRate => d.slider_tick_rate = parse_value(key, value, line)?,
        }
        Ok(())
    }

    fn event(&mut self, line: Line<'_>) -> Result<(), LoadError> {
        let params = split_params(line.text);
        let d = &mut self.chart.difficulty;

        match params[0] {
            "0" | "Background" => {
                let filename = params
                    .get(2)
                    .ok_or_else(|| line_error("E4002", "background event needs a filename", line))?;
                d.background_filename = unquote(filename).to_string();
            }
            "1" | "Video" => {
                let (Some(offset), Some(filename)) = (params.get(1), params.get(2)) else {
                    return Err(line_error("E4002", "video event needs an offset and a filename", line));
                };
                let start_time =
                    parse_ms(offset).ok_or_else(|| line_error("E4002", "invalid video offset", line))?;
                d.video = Some(VideoEvent {
                    start_time,
                    filename: unquote(filename).to_string(),
                });
            }
            "2" | "Break" => {
                let (Some(start), Some(end)) = (params.get(1), params.get(2)) else {
                    return Err(line_error("E4002", "break event needs a start and an end", line));
                };
                let bad = || line_error("E4002", "invalid break time", line);
                let start_time = parse_ms(start).ok_or_else(bad)?;
                let end_time = parse_ms(end).ok_or_else(bad)?;
                if end_time < start_time {
                    return Err(line_error("E4002", "break ends before it starts", line));
                }
                d.breaks.push(BreakEvent {
                    start_time,
                    end_time,
                });
            }
            other => debug!(event = other, line = line.number, "ignoring event"),
        }
        Ok(())
    }

    fn timing_point(&mut self, line: Line<'_>) -> Result<(), LoadError> {
        let params = split_params(line.text);
        if params.len() != 8 {
            return Err(line_error(
                "E4003",
                format!("timing point needs 8 params, found {}", params.len()),
                line,
            ));
        }

        let bad = |what: &str| line_error("E4003", format!("invalid timing point {what}"), line);

        let start_time = parse_ms(params[0]).ok_or_else(|| bad("time"))?;
        let raw_length: f64 = params[1]
            .parse()
            .ok()
            .filter(|v: &f64| v.is_finite())
            .ok_or_else(|| bad("beat length"))?;
        let meter = params[2]
            .parse::<u32>()
            .ok()
            .filter(|m| *m >= 1)
            .ok_or_else(|| bad("meter"))?;
        let sample_set: u8 = params[3].parse().map_err(|_| bad("sample set"))?;
        let sample_index: u32 = params[4].parse().map_err(|_| bad("sample index"))?;
        let volume: i32 = params[5].parse().map_err(|_| bad("volume"))?;
        let is_uninherited = params[6] == "1";
        let effects: u32 = params[7].parse().map_err(|_| bad("effects"))?;

        if is_uninherited && raw_length <= 0.0 {
            return Err(bad("beat length"));
        }

        if self.timing_points.is_empty() && !is_uninherited {
            return Err(LoadError::new(
                "E1101",
                "first timing point must be uninherited",
                line.number,
            )
            .with_time(start_time)
            .with_context(line.text));
        }
        let point = TimingPoint {
            start_time,
            beat_length: if is_uninherited {
                raw_length / 1000.0
            } else {
                raw_length
            },
            meter,
            sample_set,
            sample_index,
            volume: volume.clamp(0, 100) as f64 / 100.0,
            is_uninherited,
            kiai: effects & EFFECT_KIAI != 0,
            omit_first_barline: effects & EFFECT_OMIT_FIRST_BARLINE != 0,
            ..TimingPoint::default()
        };
        self.timing_points.push((line.number, point));
        Ok(())
    }

    fn hit_object(&mut self, line: Line<'_>) -> Result<(), LoadError> {
        let cs = self.chart.difficulty.cs;
        if column_count(cs) == 0 {
            return Err(LoadError::new(
                "E2001",
                "hit objects require CircleSize (column count) to be set first",
                line.number,
            )
            .with_context(line.text));
        }

        let params = split_params(line.text);
        if params.len() < 5 {
            return Err(line_error(
                "E4004",
                format!("hit object needs at least 5 params, found {}", params.len()),
                line,
            ));
        }

        let bad = |what: &str| line_error("E4004", format!("invalid hit object {what}"), line);

        let x = params[0]
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| bad("x"))? as i32;
        let start_time = parse_ms(params[2]).ok_or_else(|| bad("time"))?;
        let kind: u32 = params[3].parse().map_err(|_| bad("type"))?;
        let column = column_for_x(x, cs);

        let object = if kind & OBJECT_HOLD != 0 {
            let extras = params
                .get(5)
                .ok_or_else(|| line_error("E4004", "hold note needs at least 6 params", line))?;
            let end_time = extras
                .split(':')
                .next()
                .and_then(parse_ms)
                .ok_or_else(|| bad("hold end time"))?;
            if end_time <= start_time {
                return Err(line_error("E4005", "hold note must end after it starts", line)
                    .with_column(column)
                    .with_time(start_time));
            }
            HitObject {
                x,
                start_time,
                end_time,
                column,
                is_hold: true,
            }
        } else if kind & OBJECT_TAP != 0 {
            HitObject {
                x,
                start_time,
                end_time: 0.0,
                column,
                is_hold: false,
            }
        } else {
            debug!(kind, line = line.number, "ignoring non-mania hit object");
            return Ok(());
        };

        self.chart.difficulty.hit_objects.push(object);
        Ok(())
    }
}

fn section_header(text: &str) -> Option<&str> {
    text.strip_prefix('[')?.strip_suffix(']')
}

fn split_params(text: &str) -> Vec<&str> {
    text.split(',').map(str::trim).collect()
}

fn unquote(s: &str) -> &str {
    s.trim_matches('"')
}

fn parse_ms(s: &str) -> Option<Seconds> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|ms| ms / 1000.0)
}

fn parse_value<T: FromStr>(key: &str, value: &str, line: Line<'_>) -> Result<T, LoadError> {
    value.parse().map_err(|_| invalid_value(key, value, line))
}

fn invalid_value(key: &str, value: &str, line: Line<'_>) -> LoadError {
    line_error("E4001", format!("invalid value for {key}: `{value}`"), line)
}

fn line_error(code: &'static str, message: impl Into<String>, line: Line<'_>) -> LoadError {
    LoadError::new(code, message, line.number).with_context(line.text)
}

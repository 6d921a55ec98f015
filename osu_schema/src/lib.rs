use serde::{Deserialize, Serialize};

pub type Seconds = f64;

/// Width of the osu! playfield in osu!pixels. Hit object `x` is mapped onto mania columns against it.
pub const PLAYFIELD_WIDTH: f64 = 512.0;

/// Largest column count a chart may declare through CircleSize.
pub const MAX_COLUMNS: usize = u16::MAX as usize;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Beatmap {
    pub id: Option<i64>,
    pub meta: Metadata,
    pub difficulties: Vec<Difficulty>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub creator: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    #[default]
    Standard,
    Taiko,
    Catch,
    Mania,
}

impl GameMode {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Standard),
            1 => Some(Self::Taiko),
            2 => Some(Self::Catch),
            3 => Some(Self::Mania),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Difficulty {
    pub id: Option<i64>,
    pub format_version: u32,
    pub name: String,

    // [General]
    pub audio_filename: String,
    pub audio_lead_in: Seconds,
    pub preview_time: Option<Seconds>,
    pub stack_leniency: f64,
    pub mode: GameMode,

    // [Difficulty]; zero means the key was absent
    pub hp: f64,
    /// Column count in mania.
    pub cs: f64,
    pub od: f64,
    pub ar: f64,
    pub sv: f64,
    pub slider_tick_rate: f64,

    // [Events]
    pub background_filename: String,
    pub video: Option<VideoEvent>,
    pub breaks: Vec<BreakEvent>,

    pub timing_points: Vec<TimingPoint>,
    pub hit_objects: Vec<HitObject>,

    #[serde(default)]
    pub playfield: Playfield,
}

impl Difficulty {
    pub fn column_count(&self) -> usize {
        column_count(self.cs)
    }

    /// Timing point with the greatest `start_time <= time`. A later point at the same instant wins.
    pub fn timing_point_for(&self, time: Seconds) -> Option<&TimingPoint> {
        let idx = self.timing_points.partition_point(|p| p.start_time <= time);
        idx.checked_sub(1).map(|i| &self.timing_points[i])
    }

    /// Absolute playfield Y at `time`.
    pub fn position(&self, time: Seconds) -> f64 {
        scroll_position(&self.timing_points, time)
    }

    /// Event in `column` at exactly `time`, or the closest one by absolute time difference when
    /// `find_nearest` is set. Equidistant neighbours resolve to the earlier event.
    pub fn event_for(&self, time: Seconds, column: usize, find_nearest: bool) -> Option<&NoteEvent> {
        let events = &self.playfield.columns.get(column)?.events;
        let idx = events.partition_point(|e| e.time < time);

        if !find_nearest {
            return events.get(idx).filter(|e| e.time == time);
        }

        let before = idx.checked_sub(1).map(|i| &events[i]);
        let after = events.get(idx);
        match (before, after) {
            (Some(b), Some(a)) => {
                if time - b.time <= a.time - time {
                    Some(b)
                } else {
                    Some(a)
                }
            }
            (b, a) => b.or(a),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TimingPoint {
    pub start_time: Seconds,
    /// Seconds per beat on uninherited points. On inherited points this is the raw negative
    /// percentage from the chart (`-50` doubles scroll speed).
    pub beat_length: f64,
    pub meter: u32,
    pub sample_set: u8,
    pub sample_index: u32,
    /// 0..=1
    pub volume: f64,
    pub is_uninherited: bool,
    pub kiai: bool,
    pub omit_first_barline: bool,

    // --- Resolved by the timing engine ---
    /// Beat length of the governing uninherited point.
    #[serde(default)]
    pub segment_beat_length: Seconds,
    #[serde(default)]
    pub bpm: f64,
    /// Effective scroll multiplier.
    #[serde(default)]
    pub sv: f64,
    /// Absolute playfield Y at `start_time`.
    #[serde(default)]
    pub y: f64,
}

impl TimingPoint {
    /// Playfield Y units travelled per second while this point is active.
    pub fn scroll_speed(&self) -> f64 {
        let denom = self.segment_beat_length * self.meter as f64;
        if denom > 0.0 {
            self.sv * 100.0 / denom
        } else {
            0.0
        }
    }

    pub fn position_at(&self, time: Seconds) -> f64 {
        self.y + self.scroll_speed() * (time - self.start_time)
    }
}

/// Position function over a resolved, time-ordered timing point sequence. Times before the first
/// point extrapolate backwards from it.
pub fn scroll_position(points: &[TimingPoint], time: Seconds) -> f64 {
    let idx = points.partition_point(|p| p.start_time <= time);
    let active = idx.checked_sub(1).and_then(|i| points.get(i)).or_else(|| points.first());
    match active {
        Some(point) => point.position_at(time),
        None => 0.0,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HitObject {
    pub x: i32,
    pub start_time: Seconds,
    /// 0 unless `is_hold`.
    pub end_time: Seconds,
    pub column: u16,
    pub is_hold: bool,
}

/// Column count for a CircleSize, or 0 when it is below 1, above [`MAX_COLUMNS`] or not finite.
pub fn column_count(cs: f64) -> usize {
    if (1.0..=MAX_COLUMNS as f64).contains(&cs) {
        cs.floor() as usize
    } else {
        0
    }
}

/// `clamp(floor(x * cs / 512), 0, cs - 1)`
pub fn column_for_x(x: i32, cs: f64) -> u16 {
    let max = column_count(cs).saturating_sub(1) as f64;
    let col = (x as f64 * cs / PLAYFIELD_WIDTH).floor();
    col.clamp(0.0, max) as u16
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct BreakEvent {
    pub start_time: Seconds,
    pub end_time: Seconds,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoEvent {
    pub start_time: Seconds,
    pub filename: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Playfield {
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Column {
    pub events: Vec<NoteEvent>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NoteEvent {
    #[serde(flatten)]
    pub kind: NoteEventKind,
    pub time: Seconds,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum NoteEventKind {
    #[serde(rename = "click")]
    Click,

    #[serde(rename = "hold_start")]
    HoldStart,

    #[serde(rename = "hold_end")]
    HoldEnd,
}

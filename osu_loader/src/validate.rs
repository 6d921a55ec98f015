use crate::parser::ParsedChart;
use crate::LoadError;

/// Checks every required field of a parsed chart and reports all missing ones at once. A
/// metadata-only read does not require timing points or hit objects.
pub(crate) fn validate_chart(chart: &ParsedChart, meta_only: bool) -> Result<(), LoadError> {
    let d = &chart.difficulty;
    let meta = &chart.meta;

    let required_strings = [
        ("AudioFilename", d.audio_filename.as_str()),
        ("Background", d.background_filename.as_str()),
        ("Title", meta.title.as_str()),
        ("Artist", meta.artist.as_str()),
        ("Creator", meta.creator.as_str()),
        ("Version", d.name.as_str()),
    ];
    let required_numbers = [
        ("HPDrainRate", d.hp),
        ("CircleSize", d.cs),
        ("OverallDifficulty", d.od),
        ("ApproachRate", d.ar),
        ("SliderMultiplier", d.sv),
    ];

    let mut missing: Vec<&'static str> = required_strings
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();
    missing.extend(
        required_numbers
            .iter()
            .filter(|(_, value)| *value == 0.0)
            .map(|(name, _)| *name),
    );
    if !meta_only {
        if d.timing_points.is_empty() {
            missing.push("TimingPoints");
        }
        if d.hit_objects.is_empty() {
            missing.push("HitObjects");
        }
    }

    if missing.is_empty() {
        return Ok(());
    }
    Err(LoadError::new(
        "E3001",
        format!("missing required fields: {}", missing.join(", ")),
        0,
    )
    .with_missing(missing))
}

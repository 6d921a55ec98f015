use osu_schema::TimingPoint;

use crate::LoadError;

const MIN_INHERITED_PERCENT: f64 = 10.0;
const MAX_INHERITED_PERCENT: f64 = 1000.0;

/// Resolves BPM and scroll-speed inheritance over time-ordered timing points and assigns each
/// point its absolute playfield Y. `base_sv` is the chart's SliderMultiplier.
pub(crate) fn resolve_timing_points(
    points: Vec<TimingPoint>,
    base_sv: f64,
) -> Result<Vec<TimingPoint>, LoadError> {
    let len = points.len();
    points
        .into_iter()
        .try_fold(Vec::with_capacity(len), |mut resolved: Vec<TimingPoint>, point| {
            let next = resolve_point(resolved.last(), point, base_sv)?;
            resolved.push(next);
            Ok(resolved)
        })
}

fn resolve_point(
    prev: Option<&TimingPoint>,
    point: TimingPoint,
    base_sv: f64,
) -> Result<TimingPoint, LoadError> {
    let segment_beat_length = match (point.is_uninherited, prev) {
        (true, _) => point.beat_length,
        (false, Some(prev)) => prev.segment_beat_length,
        (false, None) => {
            return Err(LoadError::new("E1101", "first timing point must be uninherited", 0)
                .with_time(point.start_time));
        }
    };

    let sv = if point.is_uninherited {
        base_sv
    } else {
        base_sv * inherited_multiplier(point.beat_length)
    };

    // continuous at segment boundaries: the previous segment is extended up to this point
    let y = prev.map_or(0.0, |p| p.position_at(point.start_time));

    Ok(TimingPoint {
        segment_beat_length,
        bpm: 60.0 / segment_beat_length,
        sv,
        y,
        ..point
    })
}

/// Scroll multiplier of an inherited point: `-100 / raw`, with `raw` the negative percentage.
pub(crate) fn inherited_multiplier(raw: f64) -> f64 {
    if raw < 0.0 {
        100.0 / (-raw).clamp(MIN_INHERITED_PERCENT, MAX_INHERITED_PERCENT)
    } else {
        1.0
    }
}

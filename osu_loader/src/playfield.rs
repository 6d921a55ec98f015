use osu_schema::{scroll_position, Column, HitObject, NoteEvent, NoteEventKind, Playfield, TimingPoint};

/// Builds the per-column event streams from time-ordered hit objects and resolved timing points.
pub(crate) fn build_playfield(
    hit_objects: &[HitObject],
    timing_points: &[TimingPoint],
    column_count: usize,
) -> Playfield {
    let mut columns = vec![Column::default(); column_count];
    let event = |kind, time| NoteEvent {
        kind,
        time,
        y: scroll_position(timing_points, time),
    };

    for object in hit_objects {
        let Some(column) = columns.get_mut(object.column as usize) else {
            continue;
        };
        if object.is_hold {
            column.events.push(event(NoteEventKind::HoldStart, object.start_time));
            column.events.push(event(NoteEventKind::HoldEnd, object.end_time));
        } else {
            column.events.push(event(NoteEventKind::Click, object.start_time));
        }
    }

    // a tap placed inside a hold would otherwise land after the hold's end
    for column in &mut columns {
        column.events.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    Playfield { columns }
}

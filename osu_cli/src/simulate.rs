use std::collections::BTreeMap;

use osu_schema::{Difficulty, NoteEventKind, Seconds};

/// Rows are keyed by whole milliseconds so that they can be ordered.
fn ms(time: Seconds) -> i64 {
    (time * 1000.0).round() as i64
}

/// Events of one column that fall on the same millisecond.
#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    count: usize,
    mark: char,
    /// Whether the column is held after this cell, when it holds a hold event.
    held_after: Option<bool>,
}

impl Cell {
    fn push(&mut self, kind: NoteEventKind) {
        self.count += 1;
        self.mark = match (self.count, kind) {
            (1, NoteEventKind::Click) => 'N',
            (1, NoteEventKind::HoldStart) => 'H',
            (1, NoteEventKind::HoldEnd) => '#',
            _ => '*',
        };
        // events arrive in time order, so the last hold event decides
        match kind {
            NoteEventKind::HoldStart => self.held_after = Some(true),
            NoteEventKind::HoldEnd => self.held_after = Some(false),
            NoteEventKind::Click => {}
        }
    }
}

struct Row {
    cells: Vec<Cell>,
    info: Vec<String>,
}

fn row_at(rows: &mut BTreeMap<i64, Row>, time: Seconds, columns: usize) -> &mut Row {
    rows.entry(ms(time)).or_insert_with(|| Row {
        cells: vec![Cell::default(); columns],
        info: Vec::new(),
    })
}

pub fn run_simulation(difficulty: &Difficulty, limit: Option<usize>) -> anyhow::Result<()> {
    let columns = difficulty.playfield.columns.len();
    let mut rows: BTreeMap<i64, Row> = BTreeMap::new();

    for (idx, column) in difficulty.playfield.columns.iter().enumerate() {
        for event in &column.events {
            row_at(&mut rows, event.time, columns).cells[idx].push(event.kind);
        }
    }

    for tp in &difficulty.timing_points {
        let info = if tp.is_uninherited {
            format!("BPM: {:.1} {}/4", tp.bpm, tp.meter)
        } else {
            format!("SV: {:.2}x", tp.sv)
        };
        let r = row_at(&mut rows, tp.start_time, columns);
        r.info.push(info);
        if tp.kiai {
            r.info.push("kiai".to_string());
        }
    }

    for b in &difficulty.breaks {
        row_at(&mut rows, b.start_time, columns).info.push("break start".to_string());
        row_at(&mut rows, b.end_time, columns).info.push("break end".to_string());
    }

    if rows.is_empty() {
        println!("Chart is empty.");
        return Ok(());
    }

    println!(
        "Simulation of [{}] ({} columns, {} objects)",
        difficulty.name,
        columns,
        difficulty.hit_objects.len()
    );
    println!("N tap, H hold start, # hold end, * several events in one column");
    println!("Time(ms) |        Y | Columns | Info");
    println!("---------|----------|---------|------------------");

    // holds stay drawn as '|' between their start and end rows
    let mut holding = vec![false; columns];

    for (&t, row) in rows.iter().take(limit.unwrap_or(usize::MAX)) {
        let mut lanes = String::with_capacity(columns * 2);
        for (idx, cell) in row.cells.iter().enumerate() {
            let ch = if cell.count > 0 {
                cell.mark
            } else if holding[idx] {
                '|'
            } else {
                '.'
            };
            if let Some(held) = cell.held_after {
                holding[idx] = held;
            }
            lanes.push(ch);
            lanes.push(' ');
        }

        let y = difficulty.position(t as f64 / 1000.0);
        println!(
            "{:8} | {:8.1} | {:7} | {}",
            t,
            y,
            lanes.trim_end(),
            row.info.join(", ")
        );
    }

    Ok(())
}

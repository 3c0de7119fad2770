// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scrolling a large grid and printing what is laid out.
//!
//! Shows:
//! - a host `Visual` type the grid sizes and positions,
//! - column factories built from plain functions,
//! - sorting through a header click and recycling while scrolling.
//!
//! Run:
//! - `RUST_LOG=trellis_grid=debug cargo run -p trellis_demos --example grid_scroll`

use kurbo::{Rect, Size};
use trellis_grid::{
    CellError, Column, ColumnId, ColumnWidth, DataGrid, FnCells, GridConfig, Visual,
};
use tracing_subscriber::EnvFilter;

/// A text cell that wraps at roughly eight pixels per character.
#[derive(Debug, Default)]
struct Text {
    text: String,
    frame: Rect,
    attached: bool,
}

impl Text {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ..Self::default()
        }
    }
}

impl Visual for Text {
    fn measure_height(&mut self, width: f64) -> f64 {
        let per_line = (width / 8.0).floor().max(1.0);
        let lines = (self.text.chars().count() as f64 / per_line).ceil().max(1.0);
        lines * 18.0
    }

    fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn attach(&mut self) {
        self.attached = true;
    }

    fn detach(&mut self) {
        self.attached = false;
    }
}

#[derive(Debug)]
struct Person {
    id: u32,
    name: String,
    note: String,
}

fn columns() -> Vec<Column<Person, Text>> {
    vec![
        Column::new(
            ColumnId(0),
            "Id",
            FnCells::new(
                |p: &Person| p.id,
                |title| Ok::<_, CellError>(Text::new(title)),
                || Ok(Text::default()),
                |cell: &mut Text, id: u32| cell.text = id.to_string(),
            )
            .with_natural_order(),
        )
        .with_width(ColumnWidth::Fixed(48.0)),
        Column::new(
            ColumnId(1),
            "Name",
            FnCells::new(
                |p: &Person| p.name.clone(),
                |title| Ok::<_, CellError>(Text::new(title)),
                || Ok(Text::default()),
                |cell: &mut Text, name: String| cell.text = name,
            )
            .with_natural_order(),
        )
        .with_width(ColumnWidth::Percent(30.0)),
        Column::new(
            ColumnId(2),
            "Note",
            FnCells::new(
                |p: &Person| p.note.clone(),
                |title| Ok::<_, CellError>(Text::new(title)),
                || Ok(Text::default()),
                |cell: &mut Text, note: String| cell.text = note,
            ),
        )
        .with_min_width(80.0),
    ]
}

fn print_visible(grid: &DataGrid<Person, Text>) {
    let metrics = grid.metrics();
    println!(
        "rows {:.2}..{:.2} of {} (max scroll {:.2})",
        metrics.start_position(),
        metrics.end_position(),
        grid.total_rows(),
        grid.max_scroll_position()
    );
    for position in metrics.positions() {
        let cells: Vec<&Text> = (0..grid.columns().len())
            .filter_map(|column| grid.body_cell(position, column))
            .filter(|cell| cell.attached)
            .collect();
        let top = cells.first().map_or(0.0, |cell| cell.frame.y0);
        let texts: Vec<String> = cells.iter().map(|cell| format!("{:<12}", cell.text)).collect();
        println!("  {position:>4} @ {top:>6.1}  {}", texts.join(" "));
    }
}

fn main() -> Result<(), trellis_grid::GridError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let people = (0..2_000)
        .map(|i| Person {
            id: i,
            name: format!("person {:04}", (i * 7919) % 2_000),
            note: "lorem ipsum ".repeat((i % 4) as usize + 1),
        })
        .collect();
    let mut grid = DataGrid::new(GridConfig::default(), people);
    for column in columns() {
        grid.add_column(column);
    }
    grid.set_size(Size::new(480.0, 240.0));
    grid.validate()?;
    println!("widths {:?}", grid.column_widths());
    print_visible(&grid);

    grid.set_scroll_position(1_000.5);
    grid.validate()?;
    print_visible(&grid);

    // Sort by name, as a click on its header would.
    grid.click_header(1);
    grid.validate()?;
    print_visible(&grid);

    for event in grid.take_events() {
        println!("event {event:?}");
    }
    Ok(())
}

// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Grouped rows with header and footer visuals, plus keyboard editing.
//!
//! Shows:
//! - partitioning rows into groups with their own filters,
//! - collapsing a group,
//! - focus moving over group rows and an editor writing back to a row.
//!
//! Run:
//! - `RUST_LOG=trellis_grid=trace cargo run -p trellis_demos --example grid_groups`

use kurbo::{Rect, Size};
use trellis_grid::{
    CellError, CellLocation, Column, ColumnFlags, ColumnId, DataGrid, FnCells, GridConfig,
    GridError, Group, GroupCellFactory, GroupPart, NavigationKey, Visual,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Label {
    text: String,
    frame: Rect,
}

impl Visual for Label {
    fn measure_height(&mut self, _width: f64) -> f64 {
        22.0
    }

    fn set_frame(&mut self, frame: Rect) {
        self.frame = frame;
    }

    fn attach(&mut self) {}

    fn detach(&mut self) {}
}

#[derive(Debug)]
struct Task {
    title: &'static str,
    estimate: u32,
}

struct GroupLabels;

impl GroupCellFactory<Task, Label> for GroupLabels {
    fn create(&self, _part: GroupPart) -> Result<Label, CellError> {
        Ok(Label::default())
    }

    fn set_group_data(
        &self,
        cell: &mut Label,
        group: &Group<Task>,
        part: GroupPart,
        rows: usize,
    ) {
        cell.text = match part {
            GroupPart::Header => format!("== {} ==", group.name()),
            GroupPart::Footer => format!("   {rows} tasks"),
        };
    }
}

fn print_rows(grid: &DataGrid<Task, Label>) {
    for position in grid.metrics().positions() {
        let row = grid.row_at(position);
        let cells: Vec<&Label> = if row.is_element_row() {
            (0..grid.columns().len())
                .filter_map(|column| grid.body_cell(position, column))
                .collect()
        } else {
            let part = if row.is_header() {
                GroupPart::Header
            } else {
                GroupPart::Footer
            };
            grid.group_cell(row.group_index(), part).into_iter().collect()
        };
        let y = cells.first().map_or(0.0, |cell| cell.frame.y0);
        let text: Vec<&str> = cells.iter().map(|cell| cell.text.as_str()).collect();
        println!("{position:>3} {y:>6.1}  {}", text.join(" | "));
    }
}

fn main() -> Result<(), GridError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let tasks = vec![
        Task { title: "parse config", estimate: 2 },
        Task { title: "write docs", estimate: 5 },
        Task { title: "fix scroll bug", estimate: 1 },
        Task { title: "profile layout", estimate: 8 },
        Task { title: "review patch", estimate: 1 },
        Task { title: "release", estimate: 3 },
    ];
    let config = GridConfig {
        editable: true,
        ..GridConfig::default()
    };
    let mut grid = DataGrid::new(config, tasks);
    grid.add_column(Column::new(
        ColumnId(0),
        "Task",
        FnCells::new(
            |t: &Task| t.title,
            |title| Ok::<_, CellError>(Label { text: title.to_owned(), ..Label::default() }),
            || Ok(Label::default()),
            |cell: &mut Label, title: &'static str| cell.text = title.to_owned(),
        ),
    ));
    grid.add_column(
        Column::new(
            ColumnId(1),
            "Estimate",
            FnCells::new(
                |t: &Task| t.estimate,
                |title| Ok::<_, CellError>(Label { text: title.to_owned(), ..Label::default() }),
                || Ok(Label::default()),
                |cell: &mut Label, days: u32| cell.text = format!("{days}d"),
            )
            .with_natural_order()
            .with_editor(
                || Ok(Label::default()),
                |cell: &Label| cell.text.trim_end_matches('d').parse().ok(),
                |task: &mut Task, days: u32| task.estimate = days,
            ),
        )
        .with_flags(ColumnFlags::default() | ColumnFlags::EDITABLE),
    );
    grid.set_group_cell_factory(GroupLabels);
    grid.set_groups(Some(vec![
        Group::new("quick").with_filter(|t: &Task| t.estimate <= 2).with_footer(true),
        Group::new("long").with_filter(|t: &Task| t.estimate > 2).with_footer(true),
    ]));
    grid.set_size(Size::new(320.0, 400.0));
    grid.validate()?;
    print_rows(&grid);

    // Focus the first estimate and bump it past the "quick" threshold.
    let first = grid
        .seek_to_source(0)
        .map(|row| CellLocation::new(row, 1));
    if let Some(location) = first {
        grid.focus_cell(&location)?;
        if let Some(editor) = grid.editor_cell_mut() {
            editor.text = "4d".into();
        }
        grid.handle_key(NavigationKey::Enter)?;
    }
    grid.validate()?;
    println!("-- after edit");
    print_rows(&grid);

    grid.set_group_collapsed(1, true);
    grid.validate()?;
    println!("-- long tasks collapsed");
    print_rows(&grid);

    for event in grid.take_events() {
        println!("event {event:?}");
    }
    Ok(())
}

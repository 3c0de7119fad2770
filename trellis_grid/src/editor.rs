// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The cell editor lifecycle.
//!
//! At most one editor is open. Opening an editor on another cell commits the
//! current one first; a commit the column rejects keeps the editor open.

use kurbo::Rect;

use crate::addressing::CellLocation;
use crate::error::GridError;
use crate::event::{CellRef, GridEvent};
use crate::grid::{DataGrid, Dirty, Editor};
use crate::recycle::Visual;

impl<T: 'static, V: Visual + 'static> DataGrid<T, V> {
    /// Opens an editor on `location`.
    ///
    /// Returns `false` if editing is disabled or the cell is not editable.
    pub fn open_editor(&mut self, location: &CellLocation) -> Result<bool, GridError> {
        if !self.config.editable || !location.is_editable(&self.columns) {
            return Ok(false);
        }
        let Some(source) = self.source_index(&location.row) else {
            return Ok(false);
        };
        let index = location.column;
        let id = self.columns[index].id();
        if let Some(editor) = &self.editor {
            if editor.position == location.position() && editor.column == id {
                return Ok(true);
            }
            self.commit_edit()?;
        }

        let factory = self.columns[index].factory();
        let mut cell = factory
            .create_editor()
            .map_err(|source| GridError::EditorCell {
                column: index,
                source,
            })?;
        if let Some(row) = self.view.source(source) {
            factory.set_editor_data(&mut cell, row);
        }
        cell.attach();
        if let Some((y, height)) = self.metrics.row_extent(location.position()) {
            let x = self.geometry.position(index) - self.scroll_x;
            let top = self.header_height + y;
            cell.set_frame(Rect::new(
                x,
                top,
                x + self.geometry.width(index),
                top + height,
            ));
        }
        tracing::trace!(position = location.position(), column = index, "editor opened");
        self.editor = Some(Editor {
            position: location.position(),
            column: id,
            source,
            cell,
        });
        Ok(true)
    }

    /// Writes the open editor's value back to its row and closes it.
    ///
    /// Returns `false` if no editor was open. If the column rejects the value
    /// the editor stays open and [`GridError::EditRejected`] is returned.
    pub fn commit_edit(&mut self) -> Result<bool, GridError> {
        let Some(mut editor) = self.editor.take() else {
            return Ok(false);
        };
        let Some(index) = self.column_index(editor.column) else {
            editor.cell.detach();
            return Ok(false);
        };

        let factory = self.columns[index].factory();
        let mut written = false;
        self.view.modify(editor.source, |row| {
            written = factory.commit_cell_data(&editor.cell, row);
        });
        if !written {
            self.editor = Some(editor);
            return Err(GridError::EditRejected { column: index });
        }

        editor.cell.detach();
        self.dirty |= Dirty::DATA;
        self.events.push(GridEvent::EditCommitted(CellRef {
            position: editor.position,
            column: editor.column,
            source: Some(editor.source),
        }));
        Ok(true)
    }

    /// Closes the open editor without writing. Returns `false` if none was
    /// open.
    pub fn cancel_edit(&mut self) -> bool {
        let Some(mut editor) = self.editor.take() else {
            return false;
        };
        editor.cell.detach();
        self.events.push(GridEvent::EditCancelled(CellRef {
            position: editor.position,
            column: editor.column,
            source: Some(editor.source),
        }));
        true
    }

    /// Location of the open editor.
    #[must_use]
    pub fn editor_location(&self) -> Option<CellLocation> {
        let editor = self.editor.as_ref()?;
        let column = self.column_index(editor.column)?;
        Some(CellLocation::seek(&self.layout, editor.position, column))
    }

    /// The open editor visual.
    #[must_use]
    pub fn editor_cell(&self) -> Option<&V> {
        self.editor.as_ref().map(|editor| &editor.cell)
    }

    /// The open editor visual, for host input.
    pub fn editor_cell_mut(&mut self) -> Option<&mut V> {
        self.editor.as_mut().map(|editor| &mut editor.cell)
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Rect, Size};

    use crate::addressing::CellLocation;
    use crate::columns::{ColumnFlags, ColumnId, SortDirection};
    use crate::error::GridError;
    use crate::event::{CellRef, GridEvent, NavigationKey};
    use crate::grid::DataGrid;
    use crate::grid::tests::{Label, config, value_column};

    fn editable_grid() -> DataGrid<u32, Label> {
        let mut config = config();
        config.editable = true;
        let mut grid = DataGrid::new(config, (0..20).collect());
        grid.add_column(value_column(0).with_flags(ColumnFlags::default() | ColumnFlags::EDITABLE));
        grid.add_column(value_column(1));
        grid.set_size(Size::new(200.0, 200.0));
        grid.validate().unwrap();
        grid
    }

    fn cell(position: usize) -> CellRef {
        CellRef {
            position,
            column: ColumnId(0),
            source: Some(position),
        }
    }

    #[test]
    fn focusing_an_editable_cell_opens_its_editor() {
        let mut grid = editable_grid();
        let location = CellLocation::seek(grid.layout(), 3, 0);
        assert!(grid.focus_cell(&location).unwrap());
        assert_eq!(grid.editor_location(), Some(location));
        let editor = grid.editor_cell().unwrap();
        assert_eq!(editor.text, "3");
        assert!(editor.attached);
        assert_eq!(editor.frame, Some(Rect::new(0.0, 60.0, 100.0, 80.0)));

        let other = CellLocation::seek(grid.layout(), 3, 1);
        assert!(!grid.open_editor(&other).unwrap());
    }

    #[test]
    fn enter_writes_the_value_back() {
        let mut grid = editable_grid();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 3, 0)).unwrap();
        grid.editor_cell_mut().unwrap().text = "42".into();
        assert!(grid.handle_key(NavigationKey::Enter).unwrap());
        assert!(grid.editor_cell().is_none());
        assert_eq!(grid.view().source(3), Some(&42));
        assert_eq!(
            grid.take_events().last(),
            Some(&GridEvent::EditCommitted(cell(3)))
        );

        grid.validate().unwrap();
        assert_eq!(grid.body_cell(3, 0).unwrap().text, "42");
        // Enter on a focused cell reopens the editor.
        assert!(grid.handle_key(NavigationKey::Enter).unwrap());
        assert_eq!(grid.editor_cell().unwrap().text, "42");
    }

    #[test]
    fn rejected_values_keep_the_editor_open() {
        let mut grid = editable_grid();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 3, 0)).unwrap();
        grid.editor_cell_mut().unwrap().text = "forty".into();
        let err = grid.commit_edit().unwrap_err();
        assert!(matches!(err, GridError::EditRejected { column: 0 }));
        assert!(grid.editor_cell().is_some());

        assert!(grid.handle_key(NavigationKey::Escape).unwrap());
        assert!(grid.editor_cell().is_none());
        assert!(!grid.cancel_edit());
        assert_eq!(
            grid.take_events().last(),
            Some(&GridEvent::EditCancelled(cell(3)))
        );
        assert_eq!(grid.view().source(3), Some(&3));
    }

    #[test]
    fn tab_commits_and_moves_to_the_next_editable_cell() {
        let mut grid = editable_grid();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 3, 0)).unwrap();
        grid.editor_cell_mut().unwrap().text = "7".into();
        assert!(grid.handle_key(NavigationKey::Tab).unwrap());
        let location = grid.editor_location().unwrap();
        assert_eq!((location.position(), location.column), (4, 0));
        assert_eq!(grid.editor_cell().unwrap().text, "4");
        assert_eq!(grid.view().source(3), Some(&7));
        assert!(
            grid.take_events()
                .contains(&GridEvent::EditCommitted(cell(3)))
        );
    }

    #[test]
    fn removing_an_earlier_row_keeps_the_editor_on_its_row() {
        let mut grid = editable_grid();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 5, 0)).unwrap();
        assert_eq!(grid.view_mut().remove(2), Some(2));
        grid.validate().unwrap();
        assert_eq!(grid.editor_location().unwrap().position(), 4);
        assert_eq!(grid.editor_cell().unwrap().text, "5");

        grid.editor_cell_mut().unwrap().text = "99".into();
        assert!(grid.commit_edit().unwrap());
        assert_eq!(grid.view().source(4), Some(&99));
        assert_eq!(grid.view().source(5), Some(&6));
        assert_eq!(
            grid.take_events().last(),
            Some(&GridEvent::EditCommitted(CellRef {
                position: 4,
                column: ColumnId(0),
                source: Some(4),
            }))
        );
    }

    #[test]
    fn removing_the_edited_row_cancels_the_editor() {
        let mut grid = editable_grid();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 5, 0)).unwrap();
        grid.editor_cell_mut().unwrap().text = "99".into();
        grid.take_events();
        assert_eq!(grid.view_mut().remove(5), Some(5));
        grid.validate().unwrap();
        assert!(grid.editor_cell().is_none());
        assert!(grid.focused_cell().is_none());
        assert_eq!(
            grid.take_events(),
            vec![
                GridEvent::FocusChanged(None),
                GridEvent::EditCancelled(cell(5)),
            ]
        );
        assert!(!grid.view().items().contains(&99));
    }

    #[test]
    fn edited_rows_are_followed_through_the_sort() {
        let mut grid = editable_grid();
        grid.sort_by_column(0, SortDirection::Ascending);
        grid.validate().unwrap();
        grid.focus_cell(&CellLocation::seek(grid.layout(), 3, 0)).unwrap();
        grid.editor_cell_mut().unwrap().text = "50".into();
        assert!(grid.commit_edit().unwrap());
        grid.validate().unwrap();

        let focused = grid.focused_cell().unwrap();
        assert_eq!(focused.position(), 19);
        assert_eq!(grid.source_index(&focused.row), Some(3));
        assert_eq!(grid.scroll_position(), 0.0);
    }
}

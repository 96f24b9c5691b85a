// Paged display of a dataset preview

use crate::data::TabularPreview;

/// Rows shown before the first "show more"
pub const INITIAL_ROWS: usize = 5;
/// Rows added by each "show more"
pub const PAGE_STEP: usize = 5;

/// Tracks how many preview rows are currently displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewPager {
    shown: usize,
    total: usize,
}

impl PreviewPager {
    pub fn new(preview: &TabularPreview) -> Self {
        Self {
            shown: INITIAL_ROWS.min(preview.len()),
            total: preview.len(),
        }
    }

    pub fn shown(&self) -> usize {
        self.shown
    }

    pub fn has_more(&self) -> bool {
        self.shown < self.total
    }

    pub fn show_more(&mut self) {
        self.shown = (self.shown + PAGE_STEP).min(self.total);
    }

    /// Cell text of the visible rows, in column order; null and missing cells are blank
    pub fn visible_cells(&self, preview: &TabularPreview) -> Vec<Vec<String>> {
        preview
            .rows()
            .iter()
            .take(self.shown)
            .map(|row| {
                preview
                    .columns()
                    .iter()
                    .map(|col| row.get(col).map(|v| v.cell_text()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

use crate::matte::mask::{AlphaMask, MaskLayer};

/// Linear undo/redo history over mask states
///
/// Snapshots are owned copies in chronological order. `cursor` points at the
/// snapshot equal to the live mask; `None` means the history is empty.
#[derive(Debug, Clone, Default)]
pub struct History {
    snapshots: Vec<AlphaMask>,
    cursor: Option<usize>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a copy of `mask` as the newest state.
    ///
    /// Everything after the cursor (the redo branch) is discarded first.
    pub fn push(&mut self, mask: &AlphaMask) {
        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        self.snapshots.truncate(keep);
        self.snapshots.push(mask.clone());
        self.cursor = Some(self.snapshots.len() - 1);
    }

    /// Steps back one state and restores it into `mask`.
    ///
    /// Returns `false` without touching anything when there is no earlier state.
    pub fn undo(&mut self, mask: &mut AlphaMask) -> bool {
        match self.cursor {
            Some(cursor) if cursor > 0 => self.restore(cursor - 1, mask),
            _ => false,
        }
    }

    /// Steps forward one state and restores it into `mask`.
    ///
    /// Returns `false` without touching anything when the cursor is at the newest state.
    pub fn redo(&mut self, mask: &mut AlphaMask) -> bool {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.snapshots.len() => self.restore(cursor + 1, mask),
            _ => false,
        }
    }

    /// Drops every snapshot and clears `mask` to fully opaque.
    pub fn reset(&mut self, mask: &mut AlphaMask) {
        self.snapshots.clear();
        self.cursor = None;
        mask.clear_to_opaque();
    }

    /// Number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Index of the snapshot matching the live mask.
    #[must_use]
    pub const fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.snapshots.len())
    }

    /// Snapshot at the cursor, if any.
    #[must_use]
    pub fn current(&self) -> Option<&AlphaMask> {
        self.cursor.and_then(|cursor| self.snapshots.get(cursor))
    }

    fn restore(&mut self, index: usize, mask: &mut AlphaMask) -> bool {
        let Some(snapshot) = self.snapshots.get(index) else {
            return false;
        };
        // Snapshots share the mask's dimensions; a foreign-sized mask is left untouched.
        if mask.copy_from_mask(snapshot).is_err() {
            tracing::warn!(index, "history snapshot does not match mask dimensions");
            return false;
        }
        self.cursor = Some(index);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matte::mask::empty_mask;
    use image::Luma;

    fn mask_with(value: u8) -> AlphaMask {
        AlphaMask::from_pixel(3, 3, Luma([value]))
    }

    #[test]
    fn push_advances_cursor() {
        let mut history = History::new();
        assert_eq!(history.cursor(), None);
        assert!(history.is_empty());

        history.push(&mask_with(1));
        history.push(&mask_with(2));

        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
        assert_eq!(history.current(), Some(&mask_with(2)));
    }

    #[test]
    fn undo_and_redo_restore_snapshots() {
        let mut history = History::new();
        let mut mask = mask_with(1);
        history.push(&mask);
        mask = mask_with(2);
        history.push(&mask);

        assert!(history.undo(&mut mask));
        assert_eq!(mask, mask_with(1));
        assert_eq!(history.cursor(), Some(0));

        assert!(history.redo(&mut mask));
        assert_eq!(mask, mask_with(2));
        assert_eq!(history.cursor(), Some(1));
    }

    #[test]
    fn undo_at_start_and_redo_at_end_are_noops() {
        let mut history = History::new();
        let mut mask = mask_with(5);

        assert!(!history.undo(&mut mask));
        assert!(!history.redo(&mut mask));

        history.push(&mask);
        assert!(!history.undo(&mut mask));
        assert!(!history.redo(&mut mask));
        assert_eq!(mask, mask_with(5));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn push_after_undo_prunes_redo_branch() {
        let mut history = History::new();
        let mut mask = mask_with(0);
        for value in [10, 20, 30] {
            mask = mask_with(value);
            history.push(&mask);
        }

        assert!(history.undo(&mut mask));
        assert!(history.undo(&mut mask));
        assert_eq!(mask, mask_with(10));

        mask = mask_with(40);
        history.push(&mask);

        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), Some(1));
        assert!(!history.can_redo());
        assert!(!history.redo(&mut mask));
        assert_eq!(mask, mask_with(40));

        assert!(history.undo(&mut mask));
        assert_eq!(mask, mask_with(10));
    }

    #[test]
    fn reset_clears_snapshots_and_mask() {
        let mut history = History::new();
        let mut mask = mask_with(9);
        history.push(&mask);
        history.push(&mask);

        history.reset(&mut mask);

        assert!(history.is_empty());
        assert_eq!(history.cursor(), None);
        assert_eq!(mask, empty_mask(3, 3));
        assert!(!history.undo(&mut mask));
    }

    #[test]
    fn restore_rejects_foreign_sized_mask() {
        let mut history = History::new();
        history.push(&mask_with(1));
        history.push(&mask_with(2));

        let mut other = AlphaMask::new(2, 2);
        assert!(!history.undo(&mut other));
        assert_eq!(history.cursor(), Some(1));
    }
}

//! Selection state owned by the rotation engine.

use crate::catalog::ImageRef;
use crate::config::Weekday;

/// Identity of the sequence currently being shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveGroup {
    /// Weekly layout: an option's day set
    Day { option: String, day: Weekday },
    /// Grouped layout: a named rotation group
    Named(String),
}

/// Manual step direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

/// Everything needed to answer "which image is on screen".
///
/// Invariant: `index < images.len()` whenever `images` is non-empty, and
/// `index == 0` when it is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionState {
    pub(super) group: ActiveGroup,
    pub(super) images: Vec<ImageRef>,
    pub(super) index: usize,
    pub(super) auto_advancing: bool,
    pub(super) current: Option<ImageRef>,
    pub(super) generation: u64,
    /// Bumped by every selection; the timer restarts its countdown on change
    pub(super) epoch: u64,
}

impl SelectionState {
    /// Start auto-advancing at the first image of `images`
    pub fn new(group: ActiveGroup, images: Vec<ImageRef>) -> Self {
        let current = images.first().cloned();
        Self {
            group,
            images,
            index: 0,
            auto_advancing: true,
            current,
            generation: 0,
            epoch: 0,
        }
    }

    #[cfg(test)]
    pub fn group(&self) -> &ActiveGroup {
        &self.group
    }

    #[cfg(test)]
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    #[cfg(test)]
    pub fn index(&self) -> usize {
        self.index
    }

    #[cfg(test)]
    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advancing
    }

    #[cfg(test)]
    pub fn current(&self) -> Option<&ImageRef> {
        self.current.as_ref()
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Switch to another sequence at `index`.
    ///
    /// An empty sequence keeps whatever image was last shown.
    pub(super) fn enter(
        &mut self,
        group: ActiveGroup,
        images: Vec<ImageRef>,
        index: usize,
        auto_advancing: bool,
    ) {
        self.index = if images.is_empty() {
            0
        } else {
            index.min(images.len() - 1)
        };
        self.group = group;
        self.images = images;
        self.auto_advancing = auto_advancing;
        self.sync_current();
        self.epoch += 1;
        self.generation += 1;
    }

    /// Move one position with wraparound. Single-image groups stay put.
    pub(super) fn step(&mut self, direction: Direction) {
        let len = self.images.len();
        if len > 1 {
            self.index = match direction {
                Direction::Next => (self.index + 1) % len,
                Direction::Prev => (self.index + len - 1) % len,
            };
        }
        self.sync_current();
        self.generation += 1;
    }

    /// Re-point `index` at the displayed image if it belongs to the group.
    ///
    /// Returns whether a match was found; a placeholder never matches.
    pub(super) fn reconcile_index(&mut self) -> bool {
        let Some(current) = &self.current else {
            return false;
        };
        match self.images.iter().position(|image| image == current) {
            Some(position) => {
                self.index = position;
                true
            }
            None => false,
        }
    }

    fn sync_current(&mut self) {
        if let Some(image) = self.images.get(self.index) {
            self.current = Some(image.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(len: usize) -> SelectionState {
        let images = (0..len).map(|i| ImageRef::new(format!("{i}.jpg"))).collect();
        SelectionState::new(ActiveGroup::Named("test".into()), images)
    }

    #[test]
    fn test_step_wraps_both_directions() {
        let mut s = state(3);
        s.step(Direction::Prev);
        assert_eq!(s.index(), 2);
        s.step(Direction::Next);
        assert_eq!(s.index(), 0);
        assert_eq!(s.current().map(ImageRef::as_str), Some("0.jpg"));
    }

    #[test]
    fn test_step_single_image_keeps_index() {
        let mut s = state(1);
        s.step(Direction::Next);
        assert_eq!(s.index(), 0);
        assert_eq!(s.generation(), 1);
    }

    #[test]
    fn test_enter_empty_keeps_last_image() {
        let mut s = state(2);
        s.enter(ActiveGroup::Named("empty".into()), Vec::new(), 0, true);
        assert_eq!(s.index(), 0);
        assert_eq!(s.current().map(ImageRef::as_str), Some("0.jpg"));
    }

    #[test]
    fn test_enter_clamps_index() {
        let mut s = state(1);
        s.enter(ActiveGroup::Named("other".into()), vec!["a".into(), "b".into()], 9, false);
        assert_eq!(s.index(), 1);
    }

    #[test]
    fn test_reconcile_index_ignores_foreign_image() {
        let mut s = state(3);
        s.index = 2;
        s.current = Some("placeholder".into());
        assert!(!s.reconcile_index());
        assert_eq!(s.index(), 2);

        s.current = Some("1.jpg".into());
        assert!(s.reconcile_index());
        assert_eq!(s.index(), 1);
    }
}

//! Undo/redo command stack for balloon edits
//!
//! Every user-visible change to the balloon set goes through an [`Edit`].
//! An edit carries both the old and new state, so undo never has to
//! re-derive anything.

use crate::balloon::{Balloon, DocPoint};
use crate::error::BalloonError;
use crate::sheet::BalloonSet;
use uuid::Uuid;

/// Circle centre and arrow tip of one balloon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub center: DocPoint,
    pub target: DocPoint,
}

impl Placement {
    pub fn of(balloon: &Balloon) -> Self {
        Self {
            center: balloon.balloon_center,
            target: balloon.target_point,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberChange {
    pub uid: Uuid,
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Place {
        balloon: Balloon,
    },
    Delete {
        balloon: Balloon,
    },
    Move {
        uid: Uuid,
        from: Placement,
        to: Placement,
    },
    SetNumber {
        uid: Uuid,
        from: u32,
        to: u32,
    },
    SetDescription {
        uid: Uuid,
        from: String,
        to: String,
    },
    Renumber {
        changes: Vec<NumberChange>,
    },
}

impl Edit {
    pub fn label(&self) -> String {
        match self {
            Edit::Place { balloon } => format!("Place balloon #{}", balloon.number),
            Edit::Delete { balloon } => format!("Delete balloon #{}", balloon.number),
            Edit::Move { .. } => "Move balloon".to_string(),
            Edit::SetNumber { to, .. } => format!("Renumber balloon to #{}", to),
            Edit::SetDescription { .. } => "Edit description".to_string(),
            Edit::Renumber { .. } => "Renumber all balloons".to_string(),
        }
    }

    pub fn apply(&self, set: &mut BalloonSet) -> Result<(), BalloonError> {
        match self {
            Edit::Place { balloon } => {
                set.insert(balloon.clone());
                Ok(())
            }
            Edit::Delete { balloon } => set.remove(balloon.uid).map(|_| ()),
            Edit::Move { uid, to, .. } => set.place(*uid, *to),
            Edit::SetNumber { uid, to, .. } => set.get_mut(*uid).map(|b| b.number = *to),
            Edit::SetDescription { uid, to, .. } => {
                set.get_mut(*uid).map(|b| b.description = to.clone())
            }
            Edit::Renumber { changes } => {
                for change in changes {
                    set.get_mut(change.uid)?.number = change.to;
                }
                Ok(())
            }
        }
    }

    pub fn revert(&self, set: &mut BalloonSet) -> Result<(), BalloonError> {
        match self {
            Edit::Place { balloon } => set.remove(balloon.uid).map(|_| ()),
            Edit::Delete { balloon } => {
                set.insert(balloon.clone());
                Ok(())
            }
            Edit::Move { uid, from, .. } => set.place(*uid, *from),
            Edit::SetNumber { uid, from, .. } => set.get_mut(*uid).map(|b| b.number = *from),
            Edit::SetDescription { uid, from, .. } => {
                set.get_mut(*uid).map(|b| b.description = from.clone())
            }
            Edit::Renumber { changes } => {
                for change in changes {
                    set.get_mut(change.uid)?.number = change.from;
                }
                Ok(())
            }
        }
    }
}

/// Linear undo stack. Pushing a new edit discards anything that was undone.
#[derive(Debug, Clone, Default)]
pub struct History {
    done: Vec<Edit>,
    undone: Vec<Edit>,
    /// Length of `done` when the document was last saved
    clean: Option<usize>,
    limit: Option<usize>,
}

impl History {
    pub fn new() -> Self {
        Self {
            clean: Some(0),
            ..Self::default()
        }
    }

    /// Keep at most `limit` undo steps.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::new()
        }
    }

    /// Apply `edit` and record it.
    pub fn push(&mut self, edit: Edit, set: &mut BalloonSet) -> Result<(), BalloonError> {
        edit.apply(set)?;
        tracing::debug!(edit = %edit.label(), "push");
        self.done.push(edit);
        self.undone.clear();
        if matches!(self.clean, Some(c) if c >= self.done.len()) {
            // The saved state was on the discarded redo branch
            self.clean = None;
        }
        if let Some(limit) = self.limit {
            let overflow = self.done.len().saturating_sub(limit);
            if overflow > 0 {
                self.done.drain(..overflow);
                self.clean = self.clean.and_then(|c| c.checked_sub(overflow));
            }
        }
        Ok(())
    }

    /// Revert the most recent edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, set: &mut BalloonSet) -> Result<bool, BalloonError> {
        let Some(edit) = self.done.pop() else {
            return Ok(false);
        };
        if let Err(e) = edit.revert(set) {
            self.done.push(edit);
            return Err(e);
        }
        tracing::debug!(edit = %edit.label(), "undo");
        self.undone.push(edit);
        Ok(true)
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self, set: &mut BalloonSet) -> Result<bool, BalloonError> {
        let Some(edit) = self.undone.pop() else {
            return Ok(false);
        };
        if let Err(e) = edit.apply(set) {
            self.undone.push(edit);
            return Err(e);
        }
        tracing::debug!(edit = %edit.label(), "redo");
        self.done.push(edit);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.done.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    pub fn undo_label(&self) -> Option<String> {
        self.done.last().map(Edit::label)
    }

    pub fn redo_label(&self) -> Option<String> {
        self.undone.last().map(Edit::label)
    }

    pub fn mark_clean(&mut self) {
        self.clean = Some(self.done.len());
    }

    pub fn is_clean(&self) -> bool {
        self.clean == Some(self.done.len())
    }

    pub fn clear(&mut self) {
        *self = Self {
            limit: self.limit,
            ..Self::new()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn balloon(number: u32) -> Balloon {
        Balloon::new(number, 0, DocPoint::new(10.0, 10.0), DocPoint::new(50.0, 50.0))
    }

    #[test]
    fn test_push_undo_redo_place() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        let b = balloon(1);
        let uid = b.uid;

        history.push(Edit::Place { balloon: b }, &mut set).unwrap();
        assert!(set.get(uid).is_ok());
        assert_eq!(history.undo_label().as_deref(), Some("Place balloon #1"));

        assert!(history.undo(&mut set).unwrap());
        assert!(set.get(uid).is_err());
        assert!(history.can_redo());

        assert!(history.redo(&mut set).unwrap());
        assert!(set.get(uid).is_ok());
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        assert!(!history.undo(&mut set).unwrap());
        assert!(!history.redo(&mut set).unwrap());
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        history.push(Edit::Place { balloon: balloon(1) }, &mut set).unwrap();
        history.undo(&mut set).unwrap();
        history.push(Edit::Place { balloon: balloon(2) }, &mut set).unwrap();
        assert!(!history.can_redo());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_move_restores_both_points() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        let b = balloon(1);
        let uid = b.uid;
        let from = Placement::of(&b);
        history.push(Edit::Place { balloon: b }, &mut set).unwrap();

        let to = Placement {
            center: DocPoint::new(200.0, 300.0),
            target: DocPoint::new(180.0, 250.0),
        };
        history.push(Edit::Move { uid, from, to }, &mut set).unwrap();
        assert_eq!(Placement::of(set.get(uid).unwrap()), to);

        history.undo(&mut set).unwrap();
        assert_eq!(Placement::of(set.get(uid).unwrap()), from);
    }

    #[test]
    fn test_clean_marker_tracks_save_point() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        assert!(history.is_clean());

        history.push(Edit::Place { balloon: balloon(1) }, &mut set).unwrap();
        assert!(!history.is_clean());
        history.mark_clean();
        assert!(history.is_clean());

        history.undo(&mut set).unwrap();
        assert!(!history.is_clean());
        history.redo(&mut set).unwrap();
        assert!(history.is_clean());

        // Saved state becomes unreachable once its branch is discarded
        history.undo(&mut set).unwrap();
        history.push(Edit::Place { balloon: balloon(2) }, &mut set).unwrap();
        assert!(!history.is_clean());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut set = BalloonSet::default();
        let mut history = History::with_limit(2);
        for n in 1..=3 {
            history.push(Edit::Place { balloon: balloon(n) }, &mut set).unwrap();
        }
        assert!(history.undo(&mut set).unwrap());
        assert!(history.undo(&mut set).unwrap());
        assert!(!history.undo(&mut set).unwrap());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_failed_revert_keeps_stack_intact() {
        let mut set = BalloonSet::default();
        let mut history = History::new();
        let b = balloon(1);
        let uid = b.uid;
        history.push(Edit::Place { balloon: b }, &mut set).unwrap();
        set.remove(uid).unwrap();

        assert!(history.undo(&mut set).is_err());
        assert!(history.can_undo());
    }
}

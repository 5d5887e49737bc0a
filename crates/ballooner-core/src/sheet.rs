//! The set of balloons on one document and the editing operations on it
//!
//! All mutations of a [`Sheet`] are recorded in its [`History`], so every
//! operation here is undoable.

use crate::balloon::{Balloon, BalloonStyle, DocPoint};
use crate::error::BalloonError;
use crate::history::{Edit, History, NumberChange, Placement};
use std::cmp::Ordering;
use uuid::Uuid;

/// Balloons keyed by uid, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BalloonSet {
    balloons: Vec<Balloon>,
}

impl BalloonSet {
    pub fn insert(&mut self, balloon: Balloon) {
        match self.position(balloon.uid) {
            Some(pos) => self.balloons[pos] = balloon,
            None => self.balloons.push(balloon),
        }
    }

    pub fn remove(&mut self, uid: Uuid) -> Result<Balloon, BalloonError> {
        let pos = self.position(uid).ok_or(BalloonError::UnknownBalloon(uid))?;
        Ok(self.balloons.remove(pos))
    }

    pub fn get(&self, uid: Uuid) -> Result<&Balloon, BalloonError> {
        self.balloons
            .iter()
            .find(|b| b.uid == uid)
            .ok_or(BalloonError::UnknownBalloon(uid))
    }

    pub fn get_mut(&mut self, uid: Uuid) -> Result<&mut Balloon, BalloonError> {
        self.balloons
            .iter_mut()
            .find(|b| b.uid == uid)
            .ok_or(BalloonError::UnknownBalloon(uid))
    }

    pub(crate) fn place(&mut self, uid: Uuid, placement: Placement) -> Result<(), BalloonError> {
        let b = self.get_mut(uid)?;
        b.balloon_center = placement.center;
        b.target_point = placement.target;
        Ok(())
    }

    pub fn contains(&self, uid: Uuid) -> bool {
        self.position(uid).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Balloon> {
        self.balloons.iter()
    }

    pub fn len(&self) -> usize {
        self.balloons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balloons.is_empty()
    }

    pub fn clear(&mut self) {
        self.balloons.clear();
    }

    fn position(&self, uid: Uuid) -> Option<usize> {
        self.balloons.iter().position(|b| b.uid == uid)
    }
}

/// Settings applied to newly placed balloons.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDefaults {
    pub style: BalloonStyle,
    pub diameter: f64,
    /// 0 selects the automatic size
    pub font_size: f64,
    /// Circle offset from the clicked target, giving the leader room
    pub offset: (f64, f64),
}

impl Default for PlacementDefaults {
    fn default() -> Self {
        Self {
            style: BalloonStyle::Default,
            diameter: 36.0,
            font_size: 0.0,
            offset: (40.0, 40.0),
        }
    }
}

/// Sort by page, then number.
pub fn by_page_and_number(a: &Balloon, b: &Balloon) -> Ordering {
    (a.page, a.number).cmp(&(b.page, b.number))
}

/// Reading order on the page: top to bottom, then left to right.
fn reading_order(a: &Balloon, b: &Balloon) -> Ordering {
    a.page
        .cmp(&b.page)
        .then(b.balloon_center.y.total_cmp(&a.balloon_center.y))
        .then(a.balloon_center.x.total_cmp(&b.balloon_center.x))
}

#[derive(Debug, Clone)]
pub struct Sheet {
    balloons: BalloonSet,
    history: History,
    defaults: PlacementDefaults,
    selected: Option<Uuid>,
}

impl Default for Sheet {
    fn default() -> Self {
        Self::new(PlacementDefaults::default())
    }
}

impl Sheet {
    pub fn new(defaults: PlacementDefaults) -> Self {
        Self {
            balloons: BalloonSet::default(),
            history: History::new(),
            defaults,
            selected: None,
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = History::with_limit(limit);
        self
    }

    pub fn defaults(&self) -> &PlacementDefaults {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut PlacementDefaults {
        &mut self.defaults
    }

    pub fn balloons(&self) -> &BalloonSet {
        &self.balloons
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn get(&self, uid: Uuid) -> Result<&Balloon, BalloonError> {
        self.balloons.get(uid)
    }

    pub fn len(&self) -> usize {
        self.balloons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.balloons.is_empty()
    }

    /// All balloons ordered by (page, number)
    pub fn sorted(&self) -> Vec<&Balloon> {
        let mut out: Vec<&Balloon> = self.balloons.iter().collect();
        out.sort_by(|a, b| by_page_and_number(a, b));
        out
    }

    pub fn on_page(&self, page: u32) -> Vec<&Balloon> {
        self.sorted().into_iter().filter(|b| b.page == page).collect()
    }

    /// Find a balloon by its displayed number, optionally restricted to a page.
    pub fn by_number(&self, page: Option<u32>, number: u32) -> Option<&Balloon> {
        self.sorted()
            .into_iter()
            .find(|b| b.number == number && page.map_or(true, |p| b.page == p))
    }

    /// Lowest positive integer not used by any balloon
    pub fn next_free_number(&self) -> u32 {
        let mut used: Vec<u32> = self.balloons.iter().map(|b| b.number).collect();
        used.sort_unstable();
        used.dedup();
        let mut n = 1;
        for u in used {
            if u == n {
                n += 1;
            } else if u > n {
                break;
            }
        }
        n
    }

    /// Place a new balloon pointing at `target` on `page`.
    pub fn place(&mut self, page: u32, target: DocPoint) -> Result<Uuid, BalloonError> {
        let defaults = &self.defaults;
        let center = match defaults.style {
            BalloonStyle::NoArrow => target,
            _ => target.offset(defaults.offset.0, defaults.offset.1),
        };
        let mut balloon = Balloon::new(self.next_free_number(), page, target, center);
        balloon.diameter = defaults.diameter;
        balloon.style = defaults.style;
        balloon.font_size_override = defaults.font_size;
        let uid = balloon.uid;
        self.apply(Edit::Place { balloon })?;
        Ok(uid)
    }

    pub fn delete(&mut self, uid: Uuid) -> Result<(), BalloonError> {
        let balloon = self.balloons.get(uid)?.clone();
        self.apply(Edit::Delete { balloon })
    }

    pub fn move_balloon(&mut self, uid: Uuid, center: DocPoint, target: DocPoint) -> Result<(), BalloonError> {
        let from = Placement::of(self.balloons.get(uid)?);
        let to = Placement { center, target };
        if from == to {
            return Ok(());
        }
        self.apply(Edit::Move { uid, from, to })
    }

    pub fn set_number(&mut self, uid: Uuid, number: u32) -> Result<(), BalloonError> {
        if number == 0 {
            return Err(BalloonError::OperationError(
                "Balloon numbers start at 1".into(),
            ));
        }
        let from = self.balloons.get(uid)?.number;
        if from == number {
            return Ok(());
        }
        self.apply(Edit::SetNumber {
            uid,
            from,
            to: number,
        })
    }

    pub fn set_description(&mut self, uid: Uuid, description: impl Into<String>) -> Result<(), BalloonError> {
        let to = description.into();
        let from = self.balloons.get(uid)?.description.clone();
        if from == to {
            return Ok(());
        }
        self.apply(Edit::SetDescription { uid, from, to })
    }

    /// Renumber all balloons 1..N in reading order (page, then top to bottom, then left to right).
    pub fn renumber(&mut self) -> Result<(), BalloonError> {
        let mut ordered: Vec<&Balloon> = self.balloons.iter().collect();
        ordered.sort_by(|a, b| reading_order(a, b));
        let changes: Vec<NumberChange> = ordered
            .iter()
            .zip(1u32..)
            .filter(|(b, n)| b.number != *n)
            .map(|(b, n)| NumberChange {
                uid: b.uid,
                from: b.number,
                to: n,
            })
            .collect();
        if changes.is_empty() {
            return Ok(());
        }
        self.apply(Edit::Renumber { changes })
    }

    pub fn undo(&mut self) -> Result<bool, BalloonError> {
        let undone = self.history.undo(&mut self.balloons)?;
        self.sync_selection();
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool, BalloonError> {
        let redone = self.history.redo(&mut self.balloons)?;
        self.sync_selection();
        Ok(redone)
    }

    pub fn select(&mut self, uid: Uuid) -> Result<&Balloon, BalloonError> {
        let balloon = self.balloons.get(uid)?;
        self.selected = Some(uid);
        Ok(balloon)
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&Balloon> {
        self.selected.and_then(|uid| self.balloons.get(uid).ok())
    }

    /// Replace every balloon without recording history (used when loading a session).
    pub fn load(&mut self, balloons: impl IntoIterator<Item = Balloon>) {
        self.balloons.clear();
        for b in balloons {
            self.balloons.insert(b);
        }
        self.selected = None;
        self.history.clear();
    }

    pub fn mark_saved(&mut self) {
        self.history.mark_clean();
    }

    pub fn is_modified(&self) -> bool {
        !self.history.is_clean()
    }

    fn apply(&mut self, edit: Edit) -> Result<(), BalloonError> {
        self.history.push(edit, &mut self.balloons)?;
        self.sync_selection();
        Ok(())
    }

    fn sync_selection(&mut self) {
        if let Some(uid) = self.selected {
            if !self.balloons.contains(uid) {
                self.selected = None;
            }
        }
    }
}

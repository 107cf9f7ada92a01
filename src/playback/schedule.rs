/// Time-ordered index of note onsets, consumed as the playhead advances
use float_ord::FloatOrd;

use crate::roll::{GridModel, NoteId};

#[derive(Debug, Clone, Copy)]
struct Onset {
    beat: FloatOrd<f32>,
    /// Position in the grid's insertion order.
    order: usize,
    id: NoteId,
}

#[derive(Debug, Default)]
pub struct OnsetSchedule {
    onsets: Vec<Onset>,
    cursor: usize,
    revision: Option<u64>,
}

impl OnsetSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the grid changed since the last rebuild.
    pub fn is_stale(&self, grid: &GridModel) -> bool {
        self.revision != Some(grid.revision())
    }

    pub fn invalidate(&mut self) {
        self.revision = None;
    }

    /// Re-reads every onset. With `after_beat` set, onsets at or before it
    /// count as already fired.
    pub fn rebuild(&mut self, grid: &GridModel, after_beat: Option<f32>) {
        self.onsets = grid
            .notes()
            .iter()
            .enumerate()
            .map(|(order, note)| Onset {
                beat: FloatOrd(note.start_beat),
                order,
                id: note.id,
            })
            .collect();
        self.onsets.sort_by_key(|onset| (onset.beat, onset.order));
        self.cursor = match after_beat {
            Some(after) => self.onsets.partition_point(|onset| onset.beat.0 <= after),
            None => 0,
        };
        self.revision = Some(grid.revision());
    }

    /// Consumes the onsets up to and including `through_beat`, returned in
    /// insertion order.
    pub fn take_through(&mut self, through_beat: f32) -> Vec<NoteId> {
        let pending = &self.onsets[self.cursor..];
        let end = self.cursor + pending.partition_point(|onset| onset.beat.0 <= through_beat);

        let mut due = self.onsets[self.cursor..end].to_vec();
        due.sort_by_key(|onset| onset.order);
        self.cursor = end;
        due.into_iter().map(|onset| onset.id).collect()
    }

    pub fn remaining(&self) -> usize {
        self.onsets.len() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roll::{Note, NoteSource, Pitch};

    fn grid_with(starts: &[f32]) -> GridModel {
        let mut grid = GridModel::default();
        grid.add_notes(
            starts
                .iter()
                .map(|&start| Note::new(Pitch::A4, start, 0.25, NoteSource::Human)),
        );
        grid
    }

    #[test]
    fn test_take_through_includes_the_window_end() {
        let grid = grid_with(&[0.0, 0.125, 0.25, 1.0]);
        let mut schedule = OnsetSchedule::new();
        schedule.rebuild(&grid, None);

        assert_eq!(schedule.take_through(0.125), vec![NoteId(1), NoteId(2)]);
        assert_eq!(schedule.take_through(0.25), vec![NoteId(3)]);
        assert!(schedule.take_through(0.875).is_empty());
        assert_eq!(schedule.take_through(1.0), vec![NoteId(4)]);
        assert_eq!(schedule.remaining(), 0);
    }

    #[test]
    fn test_due_onsets_come_back_in_insertion_order() {
        let grid = grid_with(&[0.0625, 0.0]);
        let mut schedule = OnsetSchedule::new();
        schedule.rebuild(&grid, None);

        assert_eq!(schedule.take_through(0.125), vec![NoteId(1), NoteId(2)]);
    }

    #[test]
    fn test_rebuild_skips_fired_onsets() {
        let grid = grid_with(&[0.0, 2.0, 2.125, 4.0]);
        let mut schedule = OnsetSchedule::new();
        schedule.rebuild(&grid, Some(2.0));

        assert_eq!(schedule.remaining(), 2);
        assert_eq!(schedule.take_through(16.0), vec![NoteId(3), NoteId(4)]);
    }

    #[test]
    fn test_staleness_tracks_revision() {
        let mut grid = grid_with(&[0.0]);
        let mut schedule = OnsetSchedule::new();
        assert!(schedule.is_stale(&grid));

        schedule.rebuild(&grid, None);
        assert!(!schedule.is_stale(&grid));

        grid.create(0.0, 0.0);
        assert!(schedule.is_stale(&grid));
    }
}

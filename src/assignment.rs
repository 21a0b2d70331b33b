use std::collections::HashSet;

use crate::puzzle::{Puzzle, Slot};
use crate::{SlotId, WordId};

/// A mapping from slots to chosen words, with at most one word per slot. Search grows and shrinks
/// a single `Assignment` in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Assignment {
    words: Vec<Option<WordId>>,
    assigned_count: usize,
}

impl Assignment {
    /// An empty assignment with room for `slot_count` slots.
    pub fn new(slot_count: usize) -> Assignment {
        Assignment {
            words: vec![None; slot_count],
            assigned_count: 0,
        }
    }

    /// Number of slots that currently have a word.
    pub fn len(&self) -> usize {
        self.assigned_count
    }

    pub fn is_empty(&self) -> bool {
        self.assigned_count == 0
    }

    pub fn get(&self, slot_id: SlotId) -> Option<WordId> {
        self.words.get(slot_id).copied().flatten()
    }

    pub fn contains(&self, slot_id: SlotId) -> bool {
        self.get(slot_id).is_some()
    }

    /// Put `word_id` in `slot_id`, returning the word it replaced.
    pub fn assign(&mut self, slot_id: SlotId, word_id: WordId) -> Option<WordId> {
        let previous = self.words[slot_id].replace(word_id);
        if previous.is_none() {
            self.assigned_count += 1;
        }
        previous
    }

    pub fn unassign(&mut self, slot_id: SlotId) -> Option<WordId> {
        let previous = self.words.get_mut(slot_id).and_then(Option::take);
        if previous.is_some() {
            self.assigned_count -= 1;
        }
        previous
    }

    /// Assigned (slot, word) pairs in `SlotId` order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, WordId)> + '_ {
        self.words
            .iter()
            .enumerate()
            .filter_map(|(slot_id, word_id)| word_id.map(|word_id| (slot_id, word_id)))
    }

    /// Assigned pairs resolved against the puzzle they were made for.
    pub fn entries<'a>(
        &'a self,
        puzzle: &'a Puzzle,
    ) -> impl Iterator<Item = (&'a Slot, &'a str)> + 'a {
        self.iter().map(move |(slot_id, word_id)| {
            (puzzle.slot(slot_id), puzzle.word(word_id).string.as_str())
        })
    }
}

/// Do two words agree at the cell where their slots cross? Slots that don't cross always agree.
fn crossing_agrees(
    puzzle: &Puzzle,
    slot_id: SlotId,
    word_id: WordId,
    other_slot_id: SlotId,
    other_word_id: WordId,
) -> bool {
    match puzzle.overlap(slot_id, other_slot_id) {
        Some(overlap) => {
            let glyph = puzzle.word(word_id).glyph(overlap.cell);
            let other_glyph = puzzle.word(other_word_id).glyph(overlap.other_cell);
            matches!((glyph, other_glyph), (Some(a), Some(b)) if a == b)
        }
        None => true,
    }
}

/// Does `assignment` violate no constraint? Assigned words must be pairwise distinct, must fit
/// their slots' lengths, and must agree wherever two assigned slots cross. Unassigned slots are
/// ignored.
pub fn consistent(puzzle: &Puzzle, assignment: &Assignment) -> bool {
    let mut seen: HashSet<WordId> = HashSet::with_capacity(assignment.len());

    assignment.iter().all(|(slot_id, word_id)| {
        seen.insert(word_id)
            && puzzle.word(word_id).length() == puzzle.slot(slot_id).length
            && puzzle.neighbors(slot_id).iter().all(|&neighbor| {
                assignment.get(neighbor).map_or(true, |neighbor_word_id| {
                    crossing_agrees(puzzle, slot_id, word_id, neighbor, neighbor_word_id)
                })
            })
    })
}

/// Would `assignment` stay consistent if `slot_id` were given `word_id`? Assumes `assignment` is
/// already consistent, so only constraints touching `slot_id` are checked.
pub fn is_consistent_extension(
    puzzle: &Puzzle,
    assignment: &Assignment,
    slot_id: SlotId,
    word_id: WordId,
) -> bool {
    if puzzle.word(word_id).length() != puzzle.slot(slot_id).length {
        return false;
    }

    if assignment
        .iter()
        .any(|(other_slot_id, other_word_id)| other_slot_id != slot_id && other_word_id == word_id)
    {
        return false;
    }

    puzzle.neighbors(slot_id).iter().all(|&neighbor| {
        assignment.get(neighbor).map_or(true, |neighbor_word_id| {
            crossing_agrees(puzzle, slot_id, word_id, neighbor, neighbor_word_id)
        })
    })
}

use std::collections::{BTreeSet, HashMap};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;

use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Error, Result};
use crate::{SlotId, WordId, MAX_SLOT_LENGTH};

/// Zero-indexed (row, column) coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// Direction that a slot is facing. Across sorts before Down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Across,
    Down,
}

/// A fixed-position word placement in the grid. Slots order lexicographically on
/// (row, col, direction, length), which is also the order of their `SlotId`s within a `Puzzle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub row: usize,
    pub col: usize,
    pub direction: Direction,
    pub length: usize,
}

impl Slot {
    pub fn new(row: usize, col: usize, direction: Direction, length: usize) -> Slot {
        Slot { row, col, direction, length }
    }

    /// The coords of the cell at `cell_idx` within this slot.
    pub fn cell(&self, cell_idx: usize) -> GridCoord {
        match self.direction {
            Direction::Across => (self.row, self.col + cell_idx),
            Direction::Down => (self.row + cell_idx, self.col),
        }
    }

    /// Generate the coords for each cell of this slot.
    pub fn cells(&self) -> impl Iterator<Item = GridCoord> + '_ {
        (0..self.length).map(move |cell_idx| self.cell(cell_idx))
    }
}

/// A word from the pool, with its characters split out so that crossings can be checked by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub string: String,
    pub glyphs: SmallVec<[char; MAX_SLOT_LENGTH]>,
}

impl Word {
    fn new(string: String) -> Word {
        let glyphs = string.chars().collect();
        Word { string, glyphs }
    }

    /// Length in characters, not bytes.
    pub fn length(&self) -> usize {
        self.glyphs.len()
    }

    pub fn glyph(&self, cell_idx: usize) -> Option<char> {
        self.glyphs.get(cell_idx).copied()
    }
}

/// A shared cell between two slots: character `cell` of the first slot's word must equal
/// character `other_cell` of the second slot's word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub cell: usize,
    pub other_cell: usize,
}

/// The static description of a crossword: which cells are fillable, the slots those cells form,
/// how the slots cross, and the pool of words available to fill them.
pub struct Puzzle {
    structure: Vec<Vec<bool>>,
    height: usize,
    width: usize,
    words: Vec<Word>,
    slots: Vec<Slot>,
    overlaps: HashMap<(SlotId, SlotId), Overlap>,
    // Each cell of a slot is crossed by at most one other slot, so a slot has no more neighbors
    // than cells.
    neighbors: Vec<SmallVec<[SlotId; MAX_SLOT_LENGTH]>>,
}

impl Debug for Puzzle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Puzzle")
            .field("height", &self.height)
            .field("width", &self.width)
            .field("slots", &self.slots)
            .field("words", &format!("({} entries)", self.words.len()))
            .finish()
    }
}

impl Puzzle {
    /// Build a puzzle from a matrix of fillable cells. Rows may have different lengths; missing
    /// cells are treated as blocks.
    pub fn new<I, S>(structure: Vec<Vec<bool>>, words: I) -> Puzzle
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let height = structure.len();
        let width = structure.iter().map(|row| row.len()).max().unwrap_or(0);
        let structure: Vec<Vec<bool>> = structure
            .into_iter()
            .map(|mut row| {
                row.resize(width, false);
                row
            })
            .collect();

        let slots = find_slots(&structure, height, width);
        let overlaps = find_overlaps(&slots);

        let mut neighbors: Vec<SmallVec<[SlotId; MAX_SLOT_LENGTH]>> =
            slots.iter().map(|_| SmallVec::new()).collect();
        for &(slot_id, other_slot_id) in overlaps.keys() {
            neighbors[slot_id].push(other_slot_id);
        }
        for slot_neighbors in &mut neighbors {
            slot_neighbors.sort_unstable();
        }

        let words = normalize_words(words);

        debug!(
            height,
            width,
            slots = slots.len(),
            crossings = overlaps.len() / 2,
            words = words.len(),
            "built puzzle"
        );

        Puzzle { structure, height, width, words, slots, overlaps, neighbors }
    }

    /// Build a puzzle from a template string, with `_` marking fillable cells and anything else
    /// marking a block.
    pub fn from_template<I, S>(template: &str, words: I) -> Puzzle
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let structure: Vec<Vec<bool>> = template
            .lines()
            .map(|line| line.chars().map(|c| c == '_').collect::<Vec<bool>>())
            .collect();

        Puzzle::new(structure, words)
    }

    /// Read a structure template and a newline-separated word list from disk.
    pub fn load(structure_path: impl AsRef<Path>, words_path: impl AsRef<Path>) -> Result<Puzzle> {
        let template = read_file(structure_path.as_ref())?;
        let words = read_file(words_path.as_ref())?;

        Ok(Puzzle::from_template(&template, words.lines()))
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_fillable(&self, row: usize, col: usize) -> bool {
        self.structure
            .get(row)
            .and_then(|cells| cells.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn slot(&self, slot_id: SlotId) -> &Slot {
        &self.slots[slot_id]
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Look up the id of a slot by value.
    pub fn slot_id(&self, slot: &Slot) -> Option<SlotId> {
        self.slots.binary_search(slot).ok()
    }

    /// The word pool: upper-cased, de-duplicated and sorted, so `WordId` order is lexicographic.
    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn word(&self, word_id: WordId) -> &Word {
        &self.words[word_id]
    }

    pub fn word_id(&self, word: &str) -> Option<WordId> {
        self.words
            .binary_search_by(|candidate| candidate.string.as_str().cmp(word))
            .ok()
    }

    pub fn overlap(&self, slot_id: SlotId, other_slot_id: SlotId) -> Option<Overlap> {
        self.overlaps.get(&(slot_id, other_slot_id)).copied()
    }

    /// Slots crossing the given slot, in `SlotId` order.
    pub fn neighbors(&self, slot_id: SlotId) -> &[SlotId] {
        &self.neighbors[slot_id]
    }
}

fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Every maximal horizontal or vertical run of at least two fillable cells, in sorted order.
fn find_slots(structure: &[Vec<bool>], height: usize, width: usize) -> Vec<Slot> {
    let mut slots = vec![];

    for row in 0..height {
        for col in 0..width {
            if !structure[row][col] {
                continue;
            }

            if col == 0 || !structure[row][col - 1] {
                let length = (col..width).take_while(|&c| structure[row][c]).count();
                if length > 1 {
                    slots.push(Slot::new(row, col, Direction::Across, length));
                }
            }

            if row == 0 || !structure[row - 1][col] {
                let length = (row..height).take_while(|&r| structure[r][col]).count();
                if length > 1 {
                    slots.push(Slot::new(row, col, Direction::Down, length));
                }
            }
        }
    }

    slots.sort();
    slots
}

/// Build a map from cell to the slots covering it, and record an overlap in both directions for
/// every pair of slots sharing a cell.
fn find_overlaps(slots: &[Slot]) -> HashMap<(SlotId, SlotId), Overlap> {
    let mut entries_by_cell: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();

    for (slot_id, slot) in slots.iter().enumerate() {
        for (cell_idx, cell) in slot.cells().enumerate() {
            entries_by_cell.entry(cell).or_default().push((slot_id, cell_idx));
        }
    }

    let mut overlaps = HashMap::new();
    for entries in entries_by_cell.values() {
        for &(slot_id, cell) in entries {
            for &(other_slot_id, other_cell) in entries {
                if slot_id != other_slot_id {
                    overlaps.insert((slot_id, other_slot_id), Overlap { cell, other_cell });
                }
            }
        }
    }

    overlaps
}

fn normalize_words<I, S>(words: I) -> Vec<Word>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = words
        .into_iter()
        .map(|word| word.as_ref().trim().to_uppercase())
        .filter(|word| !word.is_empty())
        .collect();

    unique.into_iter().map(Word::new).collect()
}

#[cfg(test)]
mod tests {
    use super::{Direction, Overlap, Puzzle, Slot};

    /// #___#
    /// #_##_
    /// #_##_
    /// #_##_
    /// #____
    #[test]
    fn test_slots_for_hook_template() {
        let puzzle = Puzzle::from_template(
            "#___#\n#_##_\n#_##_\n#_##_\n#____",
            Vec::<String>::new(),
        );

        assert_eq!(puzzle.height(), 5);
        assert_eq!(puzzle.width(), 5);
        assert_eq!(
            puzzle.slots(),
            &[
                Slot::new(0, 1, Direction::Across, 3),
                Slot::new(0, 1, Direction::Down, 5),
                Slot::new(1, 4, Direction::Down, 4),
                Slot::new(4, 1, Direction::Across, 4),
            ]
        );

        assert_eq!(puzzle.overlap(0, 1), Some(Overlap { cell: 0, other_cell: 0 }));
        assert_eq!(puzzle.overlap(1, 3), Some(Overlap { cell: 4, other_cell: 0 }));
        assert_eq!(puzzle.overlap(3, 1), Some(Overlap { cell: 0, other_cell: 4 }));
        assert_eq!(puzzle.overlap(2, 3), Some(Overlap { cell: 3, other_cell: 3 }));
        assert_eq!(puzzle.overlap(0, 2), None);
        assert_eq!(puzzle.overlap(0, 0), None);

        assert_eq!(puzzle.neighbors(0), &[1]);
        assert_eq!(puzzle.neighbors(1), &[0, 3]);
        assert_eq!(puzzle.neighbors(3), &[1, 2]);
    }

    /// #_#
    /// ___
    /// #_#
    #[test]
    fn test_crossing_at_middle_cell() {
        let puzzle = Puzzle::from_template("#_#\n___\n#_#", ["abc"]);

        assert_eq!(puzzle.slot(0), &Slot::new(0, 1, Direction::Down, 3));
        assert_eq!(puzzle.slot(1), &Slot::new(1, 0, Direction::Across, 3));
        assert_eq!(puzzle.overlap(0, 1), Some(Overlap { cell: 1, other_cell: 1 }));
        assert_eq!(puzzle.slot_id(&Slot::new(1, 0, Direction::Across, 3)), Some(1));
        assert_eq!(puzzle.slot_id(&Slot::new(1, 0, Direction::Across, 2)), None);
    }

    #[test]
    fn test_single_cells_and_blocks_are_not_slots() {
        let puzzle = Puzzle::from_template("_#_\n###\n_#_", ["a"]);
        assert_eq!(puzzle.slot_count(), 0);

        let puzzle = Puzzle::from_template("", ["a"]);
        assert_eq!(puzzle.slot_count(), 0);
        assert_eq!(puzzle.height(), 0);
    }

    #[test]
    fn test_ragged_rows_are_padded_with_blocks() {
        let puzzle = Puzzle::from_template("___\n_", Vec::<String>::new());

        assert_eq!(puzzle.width(), 3);
        assert!(puzzle.is_fillable(1, 0));
        assert!(!puzzle.is_fillable(1, 1));
        assert!(!puzzle.is_fillable(7, 7));
        assert_eq!(
            puzzle.slots(),
            &[Slot::new(0, 0, Direction::Across, 3), Slot::new(0, 0, Direction::Down, 2)]
        );
    }

    #[test]
    fn test_words_are_normalized() {
        let puzzle = Puzzle::from_template("__", ["dog", "Cat", "", "  ", "DOG", "cat\r", "émue"]);

        let words: Vec<&str> = puzzle.words().iter().map(|w| w.string.as_str()).collect();
        assert_eq!(words, vec!["CAT", "DOG", "ÉMUE"]);
        assert_eq!(puzzle.word(2).length(), 4);
        assert_eq!(puzzle.word(2).glyph(0), Some('É'));
        assert_eq!(puzzle.word_id("DOG"), Some(1));
        assert_eq!(puzzle.word_id("dog"), None);
    }

    #[test]
    fn test_load_reports_missing_file() {
        let err = Puzzle::load("does/not/exist.txt", "nor/this.txt").unwrap_err();
        assert!(err.to_string().contains("does/not/exist.txt"));
    }

    /// _____
    /// _#_#_
    /// _____
    #[test]
    fn test_neighbor_count_is_bounded_by_slot_length() {
        let puzzle = Puzzle::from_template("_____\n_#_#_\n_____", Vec::<String>::new());

        assert_eq!(puzzle.slot_count(), 5);
        for (slot_id, slot) in puzzle.slots().iter().enumerate() {
            assert!(puzzle.neighbors(slot_id).len() <= slot.length);
        }
        // The top row is crossed at its first, middle and last cells.
        assert_eq!(puzzle.neighbors(0), &[1, 2, 3]);
    }
}

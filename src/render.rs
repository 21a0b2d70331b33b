use crate::assignment::Assignment;
use crate::puzzle::Puzzle;

/// Character used for blocked cells.
pub const BLOCK: char = '█';

/// Lay the assigned words out on the grid. Cells no assigned word covers are `None`.
pub fn letter_grid(puzzle: &Puzzle, assignment: &Assignment) -> Vec<Vec<Option<char>>> {
    let mut letters = vec![vec![None; puzzle.width()]; puzzle.height()];

    for (slot, word) in assignment.entries(puzzle) {
        for ((row, col), glyph) in slot.cells().zip(word.chars()) {
            letters[row][col] = Some(glyph);
        }
    }

    letters
}

/// Turn the given puzzle and assignment into a rendered string, one line per row.
pub fn render_grid(puzzle: &Puzzle, assignment: &Assignment) -> String {
    let letters = letter_grid(puzzle, assignment);

    letters
        .iter()
        .enumerate()
        .map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .map(|(col, &letter)| {
                    if puzzle.is_fillable(row, col) {
                        letter.unwrap_or(' ')
                    } else {
                        BLOCK
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

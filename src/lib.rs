//! Crossword fill as a constraint satisfaction problem.
//!
//! A [`Puzzle`] describes the grid: its slots, how they cross, and the pool of words. A
//! [`CrosswordCreator`] gives every slot a domain of candidate words, prunes the domains with node
//! consistency and AC-3, and then runs a backtracking search ordered by minimum remaining values,
//! degree, and least-constraining value. The result is a complete [`Assignment`] or `None`.
//!
//! ```
//! use crossword_csp::{render_grid, CrosswordCreator, Puzzle};
//!
//! let puzzle = Puzzle::from_template("#_#\n___\n#_#", ["ABA", "BBB", "AAA"]);
//! let mut creator = CrosswordCreator::new(&puzzle);
//! let assignment = creator.solve().expect("Failed to find a fill");
//!
//! assert_eq!(render_grid(&puzzle, &assignment), "█A█\nBBB\n█A█");
//! ```

pub mod assignment;
pub mod creator;
pub mod domain;
pub mod error;
pub mod puzzle;
pub mod render;

pub use assignment::{consistent, Assignment};
pub use creator::{CrosswordCreator, SolverConfig, Statistics};
pub use domain::{Arc, Domains, Wipeout};
pub use error::{Error, Result};
pub use puzzle::{Direction, Overlap, Puzzle, Slot, Word};
pub use render::{letter_grid, render_grid};

/// The expected maximum length for a single slot. Longer slots and words still work, they just
/// spill to the heap.
pub const MAX_SLOT_LENGTH: usize = 21;

/// An identifier for a given slot, based on its index in the puzzle's sorted slot list.
pub type SlotId = usize;

/// An identifier for a given word, based on its index in the puzzle's sorted word list.
pub type WordId = usize;

use std::collections::{HashSet, VecDeque};
use std::fmt::{Debug, Formatter};

use bit_set::BitSet;
use tracing::{debug, trace};

use crate::puzzle::Puzzle;
use crate::{SlotId, WordId};

/// An ordered pair of crossing slots `(x, y)`; processing it makes `x` consistent with `y`.
pub type Arc = (SlotId, SlotId);

/// Returned by `Domains::ac3` when propagation leaves a slot with no candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wipeout {
    pub slot_id: SlotId,
}

/// FIFO worklist of arcs that never holds the same arc twice.
#[derive(Debug)]
struct ArcQueue {
    queue: VecDeque<Arc>,
    queued: HashSet<Arc>,
}

impl ArcQueue {
    fn with_initial_queue<Items>(items: Items) -> ArcQueue
    where
        Items: IntoIterator<Item = Arc>,
    {
        let mut queue = ArcQueue {
            queue: VecDeque::new(),
            queued: HashSet::new(),
        };
        for arc in items {
            queue.enqueue(arc);
        }
        queue
    }

    fn pop_front(&mut self) -> Option<Arc> {
        let arc = self.queue.pop_front()?;
        self.queued.remove(&arc);
        Some(arc)
    }

    fn enqueue(&mut self, arc: Arc) {
        if self.queued.insert(arc) {
            self.queue.push_back(arc);
        }
    }
}

/// The candidate words still considered possible for each slot, as sets of `WordId`s indexed by
/// `SlotId`. Iteration over a slot's candidates is in `WordId` (lexicographic) order.
#[derive(Clone, PartialEq, Eq)]
pub struct Domains {
    options: Vec<BitSet>,
}

impl Debug for Domains {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sizes: Vec<usize> = self.options.iter().map(BitSet::len).collect();
        f.debug_struct("Domains").field("sizes", &sizes).finish()
    }
}

impl Domains {
    /// Give every slot a copy of the whole word pool.
    pub fn new(puzzle: &Puzzle) -> Domains {
        let all_words: BitSet = (0..puzzle.words().len()).collect();

        Domains {
            options: puzzle.slots().iter().map(|_| all_words.clone()).collect(),
        }
    }

    pub fn len(&self, slot_id: SlotId) -> usize {
        self.options[slot_id].len()
    }

    pub fn is_empty(&self, slot_id: SlotId) -> bool {
        self.options[slot_id].is_empty()
    }

    pub fn contains(&self, slot_id: SlotId, word_id: WordId) -> bool {
        self.options[slot_id].contains(word_id)
    }

    pub fn words(&self, slot_id: SlotId) -> impl Iterator<Item = WordId> + '_ {
        self.options[slot_id].iter()
    }

    /// Reduce a slot's domain to the single given word.
    pub fn restrict(&mut self, slot_id: SlotId, word_id: WordId) {
        let options = &mut self.options[slot_id];
        options.clear();
        options.insert(word_id);
    }

    /// Remove every word whose length differs from its slot's length.
    pub fn enforce_node_consistency(&mut self, puzzle: &Puzzle) {
        for (slot_id, options) in self.options.iter_mut().enumerate() {
            let length = puzzle.slot(slot_id).length;
            let misfits: Vec<WordId> =
                options.iter().filter(|&word_id| puzzle.word(word_id).length() != length).collect();

            for word_id in misfits {
                options.remove(word_id);
            }
        }
    }

    /// Make `x` arc consistent with `y`: drop every word in `x`'s domain that has no word in
    /// `y`'s domain agreeing with it at their crossing. `y` is left untouched. Returns whether
    /// `x`'s domain changed.
    pub fn revise(&mut self, puzzle: &Puzzle, x: SlotId, y: SlotId) -> bool {
        let Some(overlap) = puzzle.overlap(x, y) else {
            return false;
        };

        // Letters `y` can still place in the shared cell. Taken before any removal from `x`.
        let supported: HashSet<char> = self.options[y]
            .iter()
            .filter_map(|word_id| puzzle.word(word_id).glyph(overlap.other_cell))
            .collect();

        let unsupported: Vec<WordId> = self.options[x]
            .iter()
            .filter(|&word_id| {
                puzzle
                    .word(word_id)
                    .glyph(overlap.cell)
                    .map_or(true, |glyph| !supported.contains(&glyph))
            })
            .collect();

        for &word_id in &unsupported {
            self.options[x].remove(word_id);
        }

        if !unsupported.is_empty() {
            trace!(x, y, removed = unsupported.len(), remaining = self.options[x].len(), "revised");
        }

        !unsupported.is_empty()
    }

    /// Every ordered pair of crossing slots, each direction once.
    pub fn all_arcs(puzzle: &Puzzle) -> Vec<Arc> {
        (0..puzzle.slot_count())
            .flat_map(|x| puzzle.neighbors(x).iter().map(move |&y| (x, y)))
            .collect()
    }

    /// Run AC-3 starting from `arcs`, or from every arc in the puzzle if `arcs` is `None`. Stops
    /// at the first slot whose domain becomes empty; domains may be left partially pruned in that
    /// case.
    pub fn ac3(&mut self, puzzle: &Puzzle, arcs: Option<Vec<Arc>>) -> Result<(), Wipeout> {
        let arcs = arcs.unwrap_or_else(|| Domains::all_arcs(puzzle));
        let mut queue = ArcQueue::with_initial_queue(arcs);
        let mut revisions = 0usize;

        while let Some((x, y)) = queue.pop_front() {
            if !self.revise(puzzle, x, y) {
                continue;
            }
            revisions += 1;

            if self.options[x].is_empty() {
                debug!(slot_id = x, revisions, "arc consistency wiped out a domain");
                return Err(Wipeout { slot_id: x });
            }

            // Narrowing `x` can leave words in its other neighbors without support.
            for &z in puzzle.neighbors(x) {
                if z != y {
                    queue.enqueue((z, x));
                }
            }
        }

        debug!(revisions, "arc consistency reached a fixed point");
        Ok(())
    }
}

use std::cmp::Reverse;

use instant::{Duration, Instant};
use tracing::{info, trace};

use crate::assignment::{self, Assignment};
use crate::domain::{Arc, Domains, Wipeout};
use crate::puzzle::{Overlap, Puzzle};
use crate::{SlotId, WordId};

/// Settings for a solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// After each tentative assignment, re-establish arc consistency between the assigned slot
    /// and its unassigned neighbors, rejecting the word if any domain empties. Pruning is undone
    /// on backtrack.
    pub inference: bool,
}

/// A struct tracking statistics about the search.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    pub states: u64,
    pub backtracks: u64,
    pub duration: Duration,
}

/// One level of the search: the slot being filled, its candidates in the order they're tried,
/// and the domains in force when the level was entered (only kept when inference is enabled).
struct Frame {
    slot_id: SlotId,
    candidates: Vec<WordId>,
    next: usize,
    saved_domains: Option<Domains>,
}

/// Fills a `Puzzle` by node consistency, AC-3, and backtracking search. Owns the domains for one
/// solve; the puzzle itself is shared and never modified.
pub struct CrosswordCreator<'a> {
    puzzle: &'a Puzzle,
    domains: Domains,
    config: SolverConfig,
    statistics: Statistics,
}

impl<'a> CrosswordCreator<'a> {
    pub fn new(puzzle: &'a Puzzle) -> CrosswordCreator<'a> {
        CrosswordCreator::with_config(puzzle, SolverConfig::default())
    }

    pub fn with_config(puzzle: &'a Puzzle, config: SolverConfig) -> CrosswordCreator<'a> {
        CrosswordCreator {
            puzzle,
            domains: Domains::new(puzzle),
            config,
            statistics: Statistics::default(),
        }
    }

    pub fn domains(&self) -> &Domains {
        &self.domains
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Enforce node and arc consistency, then search. Returns `None` if no assignment satisfies
    /// every constraint.
    pub fn solve(&mut self) -> Option<Assignment> {
        let start = Instant::now();
        self.statistics = Statistics::default();

        info!(
            slots = self.puzzle.slot_count(),
            words = self.puzzle.words().len(),
            inference = self.config.inference,
            "solving"
        );

        self.enforce_node_consistency();

        let result = match self.ac3(None) {
            Ok(()) => self.backtrack(Assignment::new(self.puzzle.slot_count())),
            Err(Wipeout { slot_id }) => {
                info!(slot_id, "arc consistency left a slot without candidates");
                None
            }
        };

        self.statistics.duration = start.elapsed();

        info!(
            solved = result.is_some(),
            states = self.statistics.states,
            backtracks = self.statistics.backtracks,
            duration = ?self.statistics.duration,
            "finished"
        );

        result
    }

    pub fn enforce_node_consistency(&mut self) {
        self.domains.enforce_node_consistency(self.puzzle);
    }

    pub fn revise(&mut self, x: SlotId, y: SlotId) -> bool {
        self.domains.revise(self.puzzle, x, y)
    }

    pub fn ac3(&mut self, arcs: Option<Vec<Arc>>) -> Result<(), Wipeout> {
        self.domains.ac3(self.puzzle, arcs)
    }

    pub fn assignment_complete(&self, assignment: &Assignment) -> bool {
        assignment.len() == self.puzzle.slot_count()
    }

    pub fn consistent(&self, assignment: &Assignment) -> bool {
        assignment::consistent(self.puzzle, assignment)
    }

    /// Pick the unassigned slot with the fewest remaining candidates, preferring the slot that
    /// crosses the most others, then the lowest `SlotId`.
    pub fn select_unassigned_variable(&self, assignment: &Assignment) -> Option<SlotId> {
        (0..self.puzzle.slot_count())
            .filter(|&slot_id| !assignment.contains(slot_id))
            .min_by_key(|&slot_id| {
                (
                    self.domains.len(slot_id),
                    Reverse(self.puzzle.neighbors(slot_id).len()),
                    slot_id,
                )
            })
    }

    /// The slot's candidates, ordered by how many candidates each would rule out for the slot's
    /// unassigned neighbors (fewest first, then by `WordId`).
    pub fn order_domain_values(&self, slot_id: SlotId, assignment: &Assignment) -> Vec<WordId> {
        let unassigned_neighbors: Vec<(SlotId, Overlap)> = self
            .puzzle
            .neighbors(slot_id)
            .iter()
            .filter(|&&neighbor| !assignment.contains(neighbor))
            .filter_map(|&neighbor| {
                self.puzzle
                    .overlap(slot_id, neighbor)
                    .map(|overlap| (neighbor, overlap))
            })
            .collect();

        let mut values: Vec<WordId> = self.domains.words(slot_id).collect();
        values.sort_by_cached_key(|&word_id| {
            (self.count_ruled_out(word_id, &unassigned_neighbors), word_id)
        });
        values
    }

    fn count_ruled_out(&self, word_id: WordId, neighbors: &[(SlotId, Overlap)]) -> usize {
        let word = self.puzzle.word(word_id);

        neighbors
            .iter()
            .map(|&(neighbor, overlap)| {
                let glyph = word.glyph(overlap.cell);

                // `BitSet` iterators under-report their upper size bound, so `Filter::count`
                // can't be trusted on them. Sum indicator values instead.
                self.domains
                    .words(neighbor)
                    .map(|other_word_id| {
                        let other_glyph = self.puzzle.word(other_word_id).glyph(overlap.other_cell);
                        let ruled_out = other_word_id == word_id
                            || !matches!((glyph, other_glyph), (Some(a), Some(b)) if a == b);
                        usize::from(ruled_out)
                    })
                    .sum::<usize>()
            })
            .sum()
    }

    /// Narrow the slot to the chosen word and propagate to its unassigned neighbors.
    fn infer(
        &mut self,
        assignment: &Assignment,
        slot_id: SlotId,
        word_id: WordId,
    ) -> Result<(), Wipeout> {
        self.domains.restrict(slot_id, word_id);

        let arcs: Vec<Arc> = self
            .puzzle
            .neighbors(slot_id)
            .iter()
            .filter(|&&neighbor| !assignment.contains(neighbor))
            .map(|&neighbor| (neighbor, slot_id))
            .collect();

        self.domains.ac3(self.puzzle, Some(arcs))
    }

    /// Depth-first search with chronological backtracking, extending `assignment` until it
    /// covers every slot. A single assignment is mutated in place; each frame undoes its own slot
    /// (and, with inference, its own pruning) before trying the next candidate or giving up.
    pub fn backtrack(&mut self, mut assignment: Assignment) -> Option<Assignment> {
        let mut stack: Vec<Frame> = vec![];

        'search: loop {
            let next_slot = if self.assignment_complete(&assignment) {
                None
            } else {
                self.select_unassigned_variable(&assignment)
            };

            let Some(slot_id) = next_slot else {
                // Leave the domains as arc consistency left them, not as the last guess did.
                if let Some(settled) =
                    stack.first_mut().and_then(|frame| frame.saved_domains.take())
                {
                    self.domains = settled;
                }
                return Some(assignment);
            };

            let candidates = self.order_domain_values(slot_id, &assignment);
            trace!(slot_id, candidates = candidates.len(), depth = stack.len(), "selected slot");

            stack.push(Frame {
                slot_id,
                candidates,
                next: 0,
                saved_domains: self.config.inference.then(|| self.domains.clone()),
            });

            while let Some(frame) = stack.last_mut() {
                assignment.unassign(frame.slot_id);

                while let Some(&word_id) = frame.candidates.get(frame.next) {
                    frame.next += 1;

                    if let Some(saved_domains) = &frame.saved_domains {
                        self.domains.clone_from(saved_domains);
                    }

                    let slot_id = frame.slot_id;
                    if !assignment::is_consistent_extension(
                        self.puzzle,
                        &assignment,
                        slot_id,
                        word_id,
                    ) {
                        continue;
                    }

                    assignment.assign(slot_id, word_id);

                    if self.config.inference {
                        if let Err(Wipeout { slot_id: emptied }) =
                            self.infer(&assignment, slot_id, word_id)
                        {
                            trace!(slot_id, word_id, emptied, "inference rejected word");
                            assignment.unassign(slot_id);
                            continue;
                        }
                    }

                    self.statistics.states += 1;
                    continue 'search;
                }

                if let Some(saved_domains) = &frame.saved_domains {
                    self.domains.clone_from(saved_domains);
                }

                trace!(slot_id = frame.slot_id, "exhausted candidates, backtracking");
                stack.pop();
                self.statistics.backtracks += 1;
            }

            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{CrosswordCreator, SolverConfig};
    use crate::assignment::{consistent, Assignment};
    use crate::domain::Domains;
    use crate::puzzle::Puzzle;

    fn words_of(puzzle: &Puzzle, word_ids: &[usize]) -> Vec<String> {
        word_ids.iter().map(|&word_id| puzzle.word(word_id).string.clone()).collect()
    }

    fn assert_valid_fill(puzzle: &Puzzle, assignment: &Assignment) {
        assert_eq!(assignment.len(), puzzle.slot_count(), "every slot is assigned");

        let mut seen = HashSet::new();
        for (slot_id, word_id) in assignment.iter() {
            assert!(seen.insert(word_id), "words are distinct");
            assert_eq!(puzzle.word(word_id).length(), puzzle.slot(slot_id).length);

            for &neighbor in puzzle.neighbors(slot_id) {
                let overlap = puzzle.overlap(slot_id, neighbor).unwrap();
                let neighbor_word = puzzle.word(assignment.get(neighbor).unwrap());
                assert_eq!(
                    puzzle.word(word_id).glyph(overlap.cell),
                    neighbor_word.glyph(overlap.other_cell)
                );
            }
        }

        assert!(consistent(puzzle, assignment));
    }

    /// #_#
    /// ___
    /// #_#
    fn crossing_puzzle(words: &[&str]) -> Puzzle {
        Puzzle::from_template("#_#\n___\n#_#", words.iter().copied())
    }

    #[test]
    fn test_crossing_example_end_to_end() {
        let puzzle = crossing_puzzle(&["AAA", "ABA", "BBB"]);
        let mut creator = CrosswordCreator::new(&puzzle);

        creator.enforce_node_consistency();
        assert_eq!(creator.domains().len(0), 3);
        assert_eq!(creator.domains().len(1), 3);

        // Both middle letters are available on both sides, so nothing is pruned.
        assert_eq!(creator.ac3(None), Ok(()));
        assert_eq!(creator.domains().len(0), 3);
        assert_eq!(creator.domains().len(1), 3);

        let assignment = creator.solve().expect("Failed to find a fill");
        assert_valid_fill(&puzzle, &assignment);

        let down = puzzle.word(assignment.get(0).unwrap()).string.as_str();
        let across = puzzle.word(assignment.get(1).unwrap()).string.as_str();
        assert_eq!((down, across), ("ABA", "BBB"));
    }

    #[test]
    fn test_order_domain_values_least_constraining_first() {
        let puzzle = crossing_puzzle(&["AAA", "ABA", "BBB"]);
        let mut creator = CrosswordCreator::new(&puzzle);
        creator.enforce_node_consistency();

        let empty = Assignment::new(puzzle.slot_count());
        let order = creator.order_domain_values(0, &empty);

        // AAA rules out 3 across words, ABA and BBB rule out 2 each.
        assert_eq!(words_of(&puzzle, &order), vec!["ABA", "BBB", "AAA"]);
        assert_eq!(creator.order_domain_values(0, &empty), order);
    }

    #[test]
    fn test_order_domain_values_ignores_assigned_neighbors() {
        let puzzle = crossing_puzzle(&["AAA", "ABA", "BBB"]);
        let mut creator = CrosswordCreator::new(&puzzle);
        creator.enforce_node_consistency();

        let mut assignment = Assignment::new(puzzle.slot_count());
        assignment.assign(1, puzzle.word_id("BBB").unwrap());

        let order = creator.order_domain_values(0, &assignment);
        assert_eq!(words_of(&puzzle, &order), vec!["AAA", "ABA", "BBB"]);
    }

    #[test]
    fn test_count_ruled_out_counts_every_conflicting_neighbor_word() {
        let puzzle = crossing_puzzle(&["AAA", "ABA", "BAB", "CAD", "XYZ"]);
        let mut creator = CrosswordCreator::new(&puzzle);
        creator.enforce_node_consistency();

        let neighbors = [(1, puzzle.overlap(0, 1).unwrap())];
        let id = |word: &str| puzzle.word_id(word).unwrap();

        // ABA disagrees with four across words at the middle cell and rules out itself.
        assert_eq!(creator.count_ruled_out(id("ABA"), &neighbors), 5);
        assert_eq!(creator.count_ruled_out(id("XYZ"), &neighbors), 5);
        // AAA only conflicts with ABA, XYZ and itself.
        assert_eq!(creator.count_ruled_out(id("AAA"), &neighbors), 3);

        let empty = Assignment::new(puzzle.slot_count());
        let order = creator.order_domain_values(0, &empty);
        assert_eq!(words_of(&puzzle, &order), vec!["AAA", "BAB", "CAD", "ABA", "XYZ"]);
    }

    /// ___
    /// ##_
    /// ##_
    /// ##_
    #[test]
    fn test_select_unassigned_variable_prefers_smallest_domain() {
        let puzzle = Puzzle::from_template("___\n##_\n##_\n##_", ["CAT", "COT", "TOPS"]);
        let mut creator = CrosswordCreator::new(&puzzle);
        creator.enforce_node_consistency();

        let mut assignment = Assignment::new(puzzle.slot_count());
        assert_eq!(creator.select_unassigned_variable(&assignment), Some(1));

        assignment.assign(1, puzzle.word_id("TOPS").unwrap());
        assert_eq!(creator.select_unassigned_variable(&assignment), Some(0));

        assignment.assign(0, puzzle.word_id("CAT").unwrap());
        assert_eq!(creator.select_unassigned_variable(&assignment), None);
    }

    /// _#_#_
    /// _#_#_
    /// _____
    #[test]
    fn test_select_unassigned_variable_breaks_ties_by_degree() {
        let puzzle = Puzzle::from_template("_#_#_\n_#_#_\n_____", ["ABCDE", "FGHIJ", "AAA", "BBB"]);
        let mut creator = CrosswordCreator::new(&puzzle);
        creator.enforce_node_consistency();

        let mut assignment = Assignment::new(puzzle.slot_count());
        assert_eq!(puzzle.neighbors(3).len(), 3);
        assert_eq!(creator.select_unassigned_variable(&assignment), Some(3));

        assignment.assign(3, puzzle.word_id("ABCDE").unwrap());
        assert_eq!(creator.select_unassigned_variable(&assignment), Some(0));
    }

    #[test]
    fn test_corner_fill_after_pruning() {
        let puzzle = Puzzle::from_template("___\n##_\n##_", ["CAT", "DOG", "TOP"]);
        let mut creator = CrosswordCreator::new(&puzzle);

        let assignment = creator.solve().expect("Failed to find a fill");

        let entries: Vec<&str> = assignment.entries(&puzzle).map(|(_, word)| word).collect();
        assert_eq!(entries, vec!["CAT", "TOP"]);
    }

    #[test]
    fn test_fill_fails_without_words_of_the_right_length() {
        let puzzle = Puzzle::from_template("____", ["ABC", "ABCDE"]);
        let mut creator = CrosswordCreator::new(&puzzle);

        assert!(creator.solve().is_none());
    }

    #[test]
    fn test_fill_fails_when_arc_consistency_empties_a_domain() {
        let puzzle = Puzzle::from_template("___\n##_\n##_", ["ABC", "DEF"]);
        let mut creator = CrosswordCreator::new(&puzzle);

        assert!(creator.solve().is_none());
        assert_eq!(creator.statistics().states, 0);
    }

    #[test]
    fn test_fill_fails_when_the_only_fill_repeats_a_word() {
        let puzzle = crossing_puzzle(&["ABA"]);

        for inference in [false, true] {
            let mut creator = CrosswordCreator::with_config(&puzzle, SolverConfig { inference });
            assert!(creator.solve().is_none(), "inference: {}", inference);
            assert!(creator.statistics().backtracks > 0);
        }
    }

    #[test]
    fn test_empty_puzzle_is_trivially_filled() {
        let puzzle = Puzzle::from_template("###\n#_#\n###", ["ABC"]);
        let mut creator = CrosswordCreator::new(&puzzle);

        let assignment = creator.solve().expect("Failed to find a fill");

        assert!(assignment.is_empty());
        assert!(creator.assignment_complete(&assignment));
        assert_eq!(creator.statistics().states, 0);
    }

    #[test]
    fn test_inference_restores_domains_after_failed_search() {
        let puzzle = crossing_puzzle(&["ABA"]);

        let mut settled = Domains::new(&puzzle);
        settled.enforce_node_consistency(&puzzle);
        settled.ac3(&puzzle, None).unwrap();

        let mut creator = CrosswordCreator::with_config(&puzzle, SolverConfig { inference: true });
        assert!(creator.solve().is_none());
        assert_eq!(creator.domains(), &settled);
    }

    #[test]
    fn test_sample_puzzles_fill_with_and_without_inference() {
        let samples = [
            (include_str!("../data/structure0.txt"), include_str!("../data/words0.txt")),
            (include_str!("../data/structure1.txt"), include_str!("../data/words1.txt")),
        ];

        for (structure, words) in samples {
            let puzzle = Puzzle::from_template(structure, words.lines());

            for inference in [false, true] {
                let config = SolverConfig { inference };
                let mut creator = CrosswordCreator::with_config(&puzzle, config);
                let assignment = creator.solve().expect("Failed to find a fill");

                assert_valid_fill(&puzzle, &assignment);
                assert!(creator.statistics().states >= puzzle.slot_count() as u64);
            }
        }
    }
}

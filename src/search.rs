
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::time::Instant;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::heuristic::{Heuristic, HeuristicAggregator};
use crate::lookup::StepsTable;
use crate::puzzle::{MoveModel, State};
use crate::step::{simplify, steps_to_string, Step};

// Extra acceptance check run on every candidate solution before the search
// commits to it. Receives the state the full solution ends in and the steps.
pub trait SearchCompletion {
    fn accept(&self, state: &[u8], steps: &[Step]) -> bool;
}

impl<F> SearchCompletion for F
where
    F: Fn(&[u8], &[Step]) -> bool,
{
    fn accept(&self, state: &[u8], steps: &[Step]) -> bool {
        self(state, steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    // A goal key, or any key the primary table has steps for.
    #[default]
    TableHit,
    // Only a goal key; the table is never asked for steps.
    GoalOnly,
    // The completion predicate alone decides, on the searched state itself.
    Completion,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub steps: Vec<Step>,
    pub state: State,
    // Threshold the solution was found at; None when no search was needed.
    pub threshold: Option<u32>,
    pub nodes: u64,
}

// Per-threshold scratch space: the path walked so far as indexes into the
// move list, and the best cost each key has been reached at.
struct Iteration {
    threshold: u32,
    path: Vec<usize>,
    explored: HashMap<String, u32>,
    nodes: u64,
}

pub struct IdaSearch<'a, P: MoveModel + ?Sized> {
    puzzle: &'a P,
    table: &'a StepsTable,
    heuristic: HeuristicAggregator<'a>,
    moves: Vec<Step>,
    termination: Termination,
    completion: Box<dyn SearchCompletion + 'a>,
}

impl<'a, P: MoveModel + ?Sized> IdaSearch<'a, P> {
    pub fn new(puzzle: &'a P, table: &'a StepsTable, illegal: &[Step]) -> Result<IdaSearch<'a, P>> {
        for step in illegal {
            if !puzzle.steps().contains(step) {
                return Err(SearchError::IllegalMoveNotLegal(step.to_string()));
            }
        }
        let moves = puzzle.steps().iter().filter(|s| !illegal.contains(s)).cloned().collect();

        Ok(IdaSearch {
            puzzle,
            table,
            heuristic: HeuristicAggregator::new(),
            moves,
            termination: Termination::default(),
            completion: Box::new(|_: &[u8], _: &[Step]| true),
        })
    }

    pub fn prune_table(mut self, source: &'a dyn Heuristic) -> IdaSearch<'a, P> {
        self.heuristic.push(source);
        self
    }

    pub fn use_table_as_prune(mut self) -> IdaSearch<'a, P> {
        self.heuristic.push_front(self.table);
        self
    }

    pub fn termination(mut self, termination: Termination) -> IdaSearch<'a, P> {
        self.termination = termination;
        self
    }

    pub fn completion<C: SearchCompletion + 'a>(mut self, completion: C) -> IdaSearch<'a, P> {
        self.completion = Box::new(completion);
        self
    }

    pub fn table(&self) -> &StepsTable {
        self.table
    }

    pub fn moves(&self) -> &[Step] {
        &self.moves
    }

    pub fn heuristic(&self) -> &HeuristicAggregator<'a> {
        &self.heuristic
    }

    fn candidates<'s>(&'s self, prev: Option<&'s Step>) -> impl Iterator<Item = (usize, &'s Step)> + 's {
        self.moves
            .iter()
            .enumerate()
            .filter(move |(_, step)| prev.map_or(true, |prev| !self.puzzle.same_face_and_layer(prev, step)))
    }

    pub fn candidate_steps(&self, prev: Option<&Step>) -> Vec<Step> {
        self.candidates(prev).map(|(_, step)| step.clone()).collect()
    }

    fn path_steps(&self, path: &[usize]) -> Vec<Step> {
        path.iter().map(|&i| self.moves[i].clone()).collect()
    }

    fn log_seek_calls(&self) {
        info!("{}: {} seek calls", self.table.name(), self.table.index().seek_calls());
        self.table.index().reset_seek_calls();
        for source in self.heuristic.sources() {
            info!("{}: {} seek calls", source.name(), source.seek_calls());
            source.reset_seek_calls();
        }
    }

    // Decide whether the search may stop at `state`, reached by
    // `steps_to_here`. On success returns the state at the end of the stage
    // and every step leading there.
    fn search_complete(&self, state: &[u8], key: &str, steps_to_here: &[Step]) -> Result<Option<(State, Vec<Step>)>> {
        let (end, steps) = match self.termination {
            Termination::Completion => (state.to_vec(), steps_to_here.to_vec()),
            Termination::GoalOnly => {
                if !self.table.is_goal(key) {
                    return Ok(None);
                }
                (state.to_vec(), steps_to_here.to_vec())
            }
            Termination::TableHit => {
                let table_steps = if self.table.is_goal(key) {
                    vec![]
                } else {
                    match self.table.steps_for_key(key)? {
                        Some(table_steps) => table_steps,
                        None => return Ok(None),
                    }
                };

                // The table steps may only reach another key of the table, keep
                // looking up until we are at a goal key
                let state = self.puzzle.apply_all(state, &table_steps)?;
                let (end, chained) = self.table.solve(self.puzzle, &state)?;

                let mut steps = steps_to_here.to_vec();
                steps.extend(table_steps);
                steps.extend(chained);
                (end, steps)
            }
        };

        if !self.completion.accept(&end, &steps) {
            debug!("{}: match {} steps in rejected ({})", self.table.name(), steps_to_here.len(), steps_to_string(&steps));
            return Ok(None);
        }
        Ok(Some((end, steps)))
    }

    fn ida_search(&self, it: &mut Iteration, prev: Option<usize>, state: &[u8]) -> Result<(u32, Option<(State, Vec<Step>)>)> {
        it.nodes += 1;

        // calculate f_cost which is the cost to where we are plus the estimated cost to reach our goal
        let cost_to_here = it.path.len() as u32;
        let max_acceptable = it.threshold.saturating_sub(cost_to_here);
        let cost_to_goal = self.heuristic.estimate_bounded(state, Some(max_acceptable))?;
        let f_cost = cost_to_here + cost_to_goal;

        if f_cost >= it.threshold {
            return Ok((f_cost, None));
        }

        let key = self.table.key(state);

        // A state further from the goal than the deepest record of the table
        // cannot be in it, skip the binary search
        if self.table.max_depth().map_or(true, |depth| cost_to_goal <= depth) {
            let steps_to_here = self.path_steps(&it.path);
            if let Some(found) = self.search_complete(state, &key, &steps_to_here)? {
                self.log_seek_calls();
                info!(
                    "{}: IDA found match {} steps in {}, lt_state {}, f_cost {} ({} + {})",
                    self.table.name(),
                    steps_to_here.len(),
                    steps_to_string(&steps_to_here),
                    key,
                    f_cost,
                    cost_to_here,
                    cost_to_goal
                );
                return Ok((f_cost, Some(found)));
            }
        }

        // Reached this key before at no higher cost, that branch already
        // covered everything this one could
        if let Some(&explored_cost) = it.explored.get(&key) {
            if explored_cost <= cost_to_here {
                return Ok((f_cost, None));
            }
        }
        it.explored.insert(key, cost_to_here);

        // Once a move overshoots the threshold the other turns of that layer
        // are not tried either
        let mut skip_other_steps_this_face: Option<usize> = None;

        for (index, step) in self.candidates(prev.map(|p| &self.moves[p])) {
            if let Some(skip) = skip_other_steps_this_face {
                if self.puzzle.same_face_and_layer(&self.moves[skip], step) {
                    continue;
                }
                skip_other_steps_this_face = None;
            }

            let next = self.puzzle.apply(state, step)?;
            it.path.push(index);
            let (f_cost_child, found) = self.ida_search(it, Some(index), &next)?;
            it.path.pop();

            if found.is_some() {
                return Ok((f_cost_child, found));
            }
            skip_other_steps_this_face = if f_cost_child > it.threshold { Some(index) } else { None };
        }

        Ok((f_cost, None))
    }

    // Key functions index the state directly, so reject a state of the wrong
    // size before any of them runs
    fn check_state(&self, state: &[u8]) -> Result<()> {
        let len = self.puzzle.solved_state().len();
        if state.len() != len {
            return Err(SearchError::InvalidPuzzle(format!("state has {} facelets, the puzzle has {}", state.len(), len)));
        }
        self.puzzle.sanity_check(state)
    }

    pub fn solve(&self, state: &[u8], max_threshold: u32) -> Result<Solution> {
        self.solve_range(state, None, max_threshold)
    }

    // Run IDA from `state`. The thresholds tried are `min_threshold` (the
    // heuristic of `state` when None) up to `max_threshold` inclusive.
    pub fn solve_range(&self, state: &[u8], min_threshold: Option<u32>, max_threshold: u32) -> Result<Solution> {
        let start = Instant::now();
        self.check_state(state)?;

        // Nothing for IDA to do if we are already at a goal key or the table
        // has steps for the state
        let key = self.table.key(state);
        if let Some((end, steps)) = self.search_complete(state, &key, &[])? {
            info!("{}: state {} needs no search ({} steps)", self.table.name(), key, steps.len());
            return Ok(Solution {
                steps: simplify(&steps),
                state: end,
                threshold: None,
                nodes: 0,
            });
        }

        let min_threshold = match min_threshold {
            Some(min_threshold) => min_threshold,
            None => self.heuristic.estimate(state)?,
        };
        if min_threshold > max_threshold {
            return Err(SearchError::NoIdaSolution {
                stage: self.table.name().to_owned(),
                min: min_threshold,
                max: max_threshold,
            });
        }

        info!("{}: IDA threshold range {}->{}", self.table.name(), min_threshold, max_threshold);
        let mut total_nodes = 0;

        for threshold in min_threshold..=max_threshold {
            let iteration_start = Instant::now();
            let mut it = Iteration {
                threshold,
                path: vec![],
                explored: HashMap::new(),
                nodes: 0,
            };

            let (_, found) = self.ida_search(&mut it, None, state)?;
            total_nodes += it.nodes;
            info!(
                "{}: IDA threshold {}, explored {} nodes, took {:?}",
                self.table.name(),
                threshold,
                it.nodes,
                iteration_start.elapsed()
            );

            if let Some((end, steps)) = found {
                info!("{}: IDA explored {} nodes in {:?}", self.table.name(), total_nodes, start.elapsed());
                return Ok(Solution {
                    steps: simplify(&steps),
                    state: end,
                    threshold: Some(threshold),
                    nodes: total_nodes,
                });
            }
        }

        info!("{}: could not find a solution via IDA with max threshold of {}", self.table.name(), max_threshold);
        Err(SearchError::NoIdaSolution {
            stage: self.table.name().to_owned(),
            min: min_threshold,
            max: max_threshold,
        })
    }

    // Best-first search ordered by (f_cost, cost_to_here, cost_to_goal), with
    // the same stopping rule as IDA. Experimental: every frontier node stays
    // in memory, so bound it with `max_depth` on anything but small stages.
    pub fn best_first(&self, state: &[u8], max_depth: Option<u32>) -> Result<Solution> {
        self.check_state(state)?;

        let mut workq = BinaryHeap::new();
        let mut explored: HashSet<String> = HashSet::new();
        let mut seq: u64 = 0;
        let mut nodes: u64 = 0;

        let cost_to_goal = self.heuristic.estimate(state)?;
        workq.push(Reverse((cost_to_goal, 0u32, cost_to_goal, seq, Vec::<usize>::new(), state.to_vec())));

        while let Some(Reverse((f_cost, cost_to_here, _, _, path, current))) = workq.pop() {
            nodes += 1;

            let key = self.table.key(&current);
            let steps_to_here = self.path_steps(&path);
            if let Some((end, steps)) = self.search_complete(&current, &key, &steps_to_here)? {
                info!(
                    "{}: best-first found match {} steps in {}, f_cost {}, {} nodes",
                    self.table.name(),
                    steps_to_here.len(),
                    steps_to_string(&steps_to_here),
                    f_cost,
                    nodes
                );
                return Ok(Solution {
                    steps: simplify(&steps),
                    state: end,
                    threshold: None,
                    nodes,
                });
            }

            if nodes % 1000 == 0 {
                info!("{}: best-first {} nodes, workq depth {}, f_cost {}", self.table.name(), nodes, workq.len(), f_cost);
            }

            if !explored.insert(key) {
                continue;
            }
            if max_depth.map_or(false, |depth| cost_to_here >= depth) {
                continue;
            }

            let prev = path.last().map(|&p| &self.moves[p]);
            for (index, step) in self.candidates(prev) {
                let next = self.puzzle.apply(&current, step)?;
                let cost_to_goal = self.heuristic.estimate(&next)?;
                let mut next_path = path.clone();
                next_path.push(index);
                seq += 1;
                workq.push(Reverse((cost_to_here + 1 + cost_to_goal, cost_to_here + 1, cost_to_goal, seq, next_path, next)));
            }
        }

        Err(SearchError::NoBestFirstSolution {
            stage: self.table.name().to_owned(),
            explored: nodes,
        })
    }
}

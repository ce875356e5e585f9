
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt::Display;
use std::hash::Hash;

use crate::cost_only::CostOnlyTable;
use crate::error::{Result, SearchError};
use crate::heuristic::Heuristic;
use crate::puzzle::{MoveModel, State};
use crate::step::{parse_steps, Step};
use crate::table::SortedTable;

pub type KeyFn<K> = Box<dyn Fn(&[u8]) -> K>;

pub trait TableIndex<K> {
    fn recorded_cost(&self, key: &K) -> Result<Option<u32>>;

    fn seek_calls(&self) -> u64;

    fn reset_seek_calls(&self);
}

impl TableIndex<String> for SortedTable {
    fn recorded_cost(&self, key: &String) -> Result<Option<u32>> {
        self.cost(key)
    }

    fn seek_calls(&self) -> u64 {
        SortedTable::seek_calls(self)
    }

    fn reset_seek_calls(&self) {
        SortedTable::reset_seek_calls(self)
    }
}

impl TableIndex<u64> for CostOnlyTable {
    fn recorded_cost(&self, key: &u64) -> Result<Option<u32>> {
        Ok(Some(self.cost(*key)?))
    }

    fn seek_calls(&self) -> u64 {
        CostOnlyTable::seek_calls(self)
    }

    fn reset_seek_calls(&self) {
        CostOnlyTable::reset_seek_calls(self)
    }
}

pub struct LookupTable<K, I> {
    name: String,
    index: I,
    key_fn: KeyFn<K>,
    goal: HashSet<K>,
    max_depth: Option<u32>,
}

pub type StepsTable = LookupTable<String, SortedTable>;
pub type CostTable = LookupTable<u64, CostOnlyTable>;

impl<K, I> LookupTable<K, I>
where
    K: Eq + Hash + Display,
    I: TableIndex<K>,
{
    pub fn new<F>(name: &str, index: I, goal: impl IntoIterator<Item = K>, key_fn: F) -> LookupTable<K, I>
    where
        F: Fn(&[u8]) -> K + 'static,
    {
        LookupTable {
            name: name.to_owned(),
            index,
            key_fn: Box::new(key_fn),
            goal: goal.into_iter().collect(),
            max_depth: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> LookupTable<K, I> {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    pub fn key(&self, state: &[u8]) -> K {
        (self.key_fn)(state)
    }

    pub fn is_goal<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.goal.contains(key)
    }

    pub fn recorded_cost(&self, state: &[u8]) -> Result<Option<u32>> {
        let key = self.key(state);
        if self.is_goal(&key) {
            return Ok(Some(0));
        }
        self.index.recorded_cost(&key)
    }

    // Recorded cost with a missing entry read as 0. Only meaningful where an
    // absent entry really can be treated as "nothing left to do"; search
    // code wants `heuristic` instead.
    pub fn steps_cost(&self, state: &[u8]) -> Result<u32> {
        Ok(self.recorded_cost(state)?.unwrap_or(0))
    }

    pub fn heuristic_for_key(&self, key: &K) -> Result<u32> {
        if self.is_goal(key) {
            return Ok(0);
        }
        match self.index.recorded_cost(key)? {
            Some(cost) if cost > 0 => Ok(cost),
            // Partial tables only record states up to max_depth, anything
            // else is at least one step deeper
            _ => match self.max_depth {
                Some(depth) => Ok(depth.saturating_add(1)),
                None => Err(SearchError::HeuristicMisconfigured {
                    table: self.name.clone(),
                    key: key.to_string(),
                }),
            },
        }
    }
}

impl<K, I> Heuristic for LookupTable<K, I>
where
    K: Eq + Hash + Display,
    I: TableIndex<K>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }

    fn heuristic(&self, state: &[u8]) -> Result<u32> {
        self.heuristic_for_key(&self.key(state))
    }

    fn seek_calls(&self) -> u64 {
        self.index.seek_calls()
    }

    fn reset_seek_calls(&self) {
        self.index.reset_seek_calls()
    }
}

impl LookupTable<String, SortedTable> {
    pub fn steps_for_key(&self, key: &str) -> Result<Option<Vec<Step>>> {
        if self.is_goal(key) {
            return Ok(None);
        }
        match self.index.lookup(key)? {
            Some(tokens) => Ok(Some(parse_steps(&tokens)?)),
            None => Ok(None),
        }
    }

    pub fn steps(&self, state: &[u8]) -> Result<Option<Vec<Step>>> {
        self.steps_for_key(&self.key(state))
    }

    // Follow the table from `state` to a goal key, applying the recorded
    // steps of each record on the way. Returns the final state and the steps.
    pub fn solve<P: MoveModel + ?Sized>(&self, puzzle: &P, state: &[u8]) -> Result<(State, Vec<Step>)> {
        let mut state = state.to_vec();
        let mut solution = vec![];
        let mut seen = HashSet::new();

        loop {
            let key = self.key(&state);
            if self.is_goal(&key) {
                break;
            }
            let steps = self.steps_for_key(&key)?.ok_or_else(|| SearchError::MissingRecord {
                table: self.name.clone(),
                key: key.clone(),
            })?;
            if !seen.insert(key.clone()) {
                return Err(SearchError::CyclicTable { table: self.name.clone(), key });
            }
            state = puzzle.apply_all(&state, &steps)?;
            solution.extend(steps);
        }

        Ok((state, solution))
    }
}

use std::collections::{BTreeMap, HashMap};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Result, SearchError};
use crate::perm::Permutation;
use crate::step::{Step, Turn};
use crate::union_find::UnionFind;

pub type State = Vec<u8>;

// The puzzle geometry the search is driven through. Implementations are pure:
// `apply` returns a new state and never touches its input.
pub trait MoveModel {
    fn solved_state(&self) -> &[u8];

    fn steps(&self) -> &[Step];

    fn apply(&self, state: &[u8], step: &Step) -> Result<State>;

    fn apply_inverse(&self, state: &[u8], step: &Step) -> Result<State> {
        self.apply(state, &step.inverse())
    }

    fn apply_all(&self, state: &[u8], steps: &[Step]) -> Result<State> {
        let mut state = state.to_vec();
        for step in steps {
            state = self.apply(&state, step)?;
        }
        Ok(state)
    }

    fn same_face_and_layer(&self, prev: &Step, step: &Step) -> bool {
        prev.on_same_face_and_layer(step)
    }

    fn sanity_check(&self, _state: &[u8]) -> Result<()> {
        Ok(())
    }
}

// Count every symbol found at `indexes` and require each present symbol to
// appear exactly `expected_count` times. `x` marks "don't care" facelets.
pub fn check_region_counts(desc: &str, state: &[u8], indexes: &[usize], expected_count: usize) -> Result<()> {
    let mut count: BTreeMap<u8, usize> = BTreeMap::new();
    for &i in indexes {
        let symbol = state.get(i).ok_or_else(|| {
            SearchError::InvalidPuzzle(format!("{}: position {} is outside a state of {} facelets", desc, i, state.len()))
        })?;
        *count.entry(*symbol).or_default() += 1;
    }
    for (symbol, value) in count {
        if symbol == b'x' {
            continue;
        }
        if value != expected_count {
            return Err(SearchError::SanityCheckFailed {
                region: desc.to_owned(),
                symbol: symbol as char,
                count: value,
                expected: expected_count,
            });
        }
    }
    Ok(())
}

pub struct PermutationPuzzle {
    name: String,
    solved: State,
    steps: Vec<Step>,
    moves: HashMap<String, Permutation>,
    orbits: Vec<Vec<usize>>,
}

impl PermutationPuzzle {
    pub fn new(name: &str, solved: State, quarter_turns: Vec<(String, Vec<usize>)>) -> Result<PermutationPuzzle> {
        let mut steps = vec![];
        let mut moves = HashMap::new();
        let mut orbit_sets = UnionFind::new(solved.len());

        for (base_name, perm) in quarter_turns {
            let base: Step = base_name.parse()?;
            if base.turn() != Turn::Quarter {
                return Err(SearchError::InvalidPuzzle(format!("{} is not a quarter turn", base_name)));
            }
            if perm.len() != solved.len() {
                return Err(SearchError::InvalidPuzzle(format!(
                    "{} permutes {} facelets, the puzzle has {}",
                    base_name,
                    perm.len(),
                    solved.len()
                )));
            }
            let quarter = Permutation::new(perm)
                .ok_or_else(|| SearchError::InvalidPuzzle(format!("{} is not a permutation", base_name)))?;

            for (i, p) in quarter.moved() {
                orbit_sets.join(i, p);
            }

            let half = &quarter * &quarter;
            let prime = !&quarter;
            for (turn, perm) in [(Turn::Quarter, quarter), (Turn::Prime, prime), (Turn::Half, half)] {
                let step = base.with_turn(turn);
                if moves.insert(step.name().to_owned(), perm).is_some() {
                    return Err(SearchError::InvalidPuzzle(format!("{} is defined twice", step)));
                }
                steps.push(step);
            }
        }

        Ok(PermutationPuzzle {
            name: name.to_owned(),
            solved,
            steps,
            moves,
            orbits: orbit_sets.groups(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.solved.len()
    }

    pub fn orbits(&self) -> &[Vec<usize>] {
        &self.orbits
    }

    pub fn step(&self, name: &str) -> Result<Step> {
        self.steps
            .iter()
            .find(|s| s.name() == name)
            .cloned()
            .ok_or_else(|| SearchError::UnknownStep(name.to_owned()))
    }

    // random sequence that never turns the same layer twice in a row; shorter
    // than `len` when every step turns the layer of the last one
    pub fn scramble<R: Rng>(&self, rng: &mut R, len: usize) -> Vec<Step> {
        let mut ret: Vec<Step> = vec![];
        while ret.len() < len {
            let candidates: Vec<&Step> = self
                .steps
                .iter()
                .filter(|step| ret.last().map_or(true, |prev| !self.same_face_and_layer(prev, step)))
                .collect();
            match candidates.choose(rng) {
                Some(&step) => ret.push(step.clone()),
                None => break,
            }
        }
        ret
    }
}

impl MoveModel for PermutationPuzzle {
    fn solved_state(&self) -> &[u8] {
        &self.solved
    }

    fn steps(&self) -> &[Step] {
        &self.steps
    }

    fn apply(&self, state: &[u8], step: &Step) -> Result<State> {
        let perm = self
            .moves
            .get(step.name())
            .ok_or_else(|| SearchError::UnknownStep(step.name().to_owned()))?;
        if state.len() != perm.len() {
            return Err(SearchError::InvalidPuzzle(format!(
                "state has {} facelets, {} has {}",
                state.len(),
                self.name,
                perm.len()
            )));
        }
        Ok(perm.apply(state))
    }

    // Moves only shuffle facelets inside their orbit, so every orbit must hold
    // the same symbols as it does in the solved state.
    fn sanity_check(&self, state: &[u8]) -> Result<()> {
        if state.len() != self.solved.len() {
            return Err(SearchError::InvalidPuzzle(format!(
                "state has {} facelets, {} has {}",
                state.len(),
                self.name,
                self.solved.len()
            )));
        }
        for (orbit_id, orbit) in self.orbits.iter().enumerate() {
            let mut expected: BTreeMap<u8, usize> = BTreeMap::new();
            let mut actual: BTreeMap<u8, usize> = BTreeMap::new();
            for &i in orbit {
                *expected.entry(self.solved[i]).or_default() += 1;
                *actual.entry(state[i]).or_default() += 1;
            }
            for &symbol in actual.keys().chain(expected.keys()) {
                let want = expected.get(&symbol).copied().unwrap_or(0);
                let got = actual.get(&symbol).copied().unwrap_or(0);
                if want != got {
                    return Err(SearchError::SanityCheckFailed {
                        region: format!("{} orbit {}", self.name, orbit_id),
                        symbol: symbol as char,
                        count: got,
                        expected: want,
                    });
                }
            }
        }
        Ok(())
    }
}

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use cube_lookup::cost_only::CostOnlyTable;
use cube_lookup::lookup::{CostTable, StepsTable};
use cube_lookup::puzzle::{MoveModel, PermutationPuzzle, State};
use cube_lookup::step::{steps_to_string, Step};
use cube_lookup::table::SortedTable;

pub const SOLVED: &[u8] = b"AABBCCDD";

pub const QUARTER_TURNS: &[(&str, [usize; 8])] = &[
    ("U", [1, 2, 3, 0, 4, 5, 6, 7]),
    ("D", [0, 1, 2, 3, 5, 6, 7, 4]),
    ("R", [0, 2, 6, 3, 4, 1, 5, 7]),
];

// U and D turn disjoint rings of four, R links them; 2520 reachable states
pub fn toy_puzzle() -> PermutationPuzzle {
    let moves = QUARTER_TURNS.iter().map(|(name, perm)| (name.to_string(), perm.to_vec())).collect();
    PermutationPuzzle::new("toy", SOLVED.to_vec(), moves).unwrap()
}

pub fn recolor(state: &[u8], keep: &[u8]) -> State {
    state.iter().map(|c| if keep.contains(c) { *c } else { b'x' }).collect()
}

pub fn bits(state: &[u8], one: u8) -> u64 {
    state.iter().fold(0, |acc, &c| (acc << 1) | (c == one) as u64)
}

pub fn text(state: &[u8]) -> String {
    String::from_utf8_lossy(state).into_owned()
}

pub fn cd_key(state: &[u8]) -> String {
    text(&recolor(state, b"CD"))
}

/// Breadth-first search out of `goal`: every state within `max_depth` and
/// the steps that take it back to `goal`.
pub fn solutions(puzzle: &PermutationPuzzle, goal: &[u8], max_depth: Option<usize>) -> BTreeMap<State, Vec<Step>> {
    let mut result = BTreeMap::new();
    result.insert(goal.to_vec(), vec![]);
    let mut queue = VecDeque::from([goal.to_vec()]);

    while let Some(state) = queue.pop_front() {
        let path: Vec<Step> = result[&state].clone();
        if max_depth.map_or(false, |depth| path.len() >= depth) {
            continue;
        }
        for step in puzzle.steps() {
            let next = puzzle.apply(&state, step).unwrap();
            if result.contains_key(&next) {
                continue;
            }
            let mut next_path = vec![step.inverse()];
            next_path.extend(path.iter().cloned());
            result.insert(next.clone(), next_path);
            queue.push_back(next);
        }
    }
    result
}

/// First state, in byte order, exactly `distance` steps from solved.
pub fn first_state_at_distance(puzzle: &PermutationPuzzle, distance: usize) -> State {
    solutions(puzzle, SOLVED, None)
        .into_iter()
        .find(|(_, path)| path.len() == distance)
        .map(|(state, _)| state)
        .unwrap()
}

/// Sorted, padded table file of every non-goal entry. Returns the path and
/// the number of records.
pub fn write_steps_table(dir: &Path, filename: &str, entries: &BTreeMap<State, Vec<Step>>) -> (PathBuf, u64) {
    let lines: Vec<String> = entries
        .iter()
        .filter(|(_, steps)| !steps.is_empty())
        .map(|(key, steps)| format!("{}:{}", text(key), steps_to_string(steps)))
        .collect();
    let width = lines.iter().map(|l| l.len()).max().unwrap_or(0);

    let path = dir.join(filename);
    let mut file = File::create(&path).unwrap();
    for line in &lines {
        writeln!(file, "{:width$}", line, width = width).unwrap();
    }
    (path, lines.len() as u64)
}

/// Cost-only table over the positions of symbol `one`. Returns the path, the
/// goal key and the deepest cost.
pub fn write_cost_only_table(dir: &Path, filename: &str, puzzle: &PermutationPuzzle, one: u8) -> (PathBuf, u64, u32) {
    let goal = recolor(SOLVED, &[one]);
    let mut digits = vec![0; 1 << SOLVED.len()];
    for (state, path) in solutions(puzzle, &goal, None) {
        digits[bits(&state, one) as usize] = path.len() as u32;
    }
    let max_depth = *digits.iter().max().unwrap();
    assert!(max_depth < 16);

    let content: String = digits.iter().map(|&d| std::char::from_digit(d, 16).unwrap()).collect();
    let path = dir.join(filename);
    std::fs::write(&path, format!("{}\n", content)).unwrap();
    (path, bits(&goal, one), max_depth)
}

/// Full-state table of every state within `depth` steps of solved.
pub fn primary_table(dir: &Path, puzzle: &PermutationPuzzle, depth: usize) -> StepsTable {
    let entries = solutions(puzzle, SOLVED, Some(depth));
    let (path, linecount) = write_steps_table(dir, "lookup-table-toy-full.txt", &entries);
    StepsTable::new("toy-full", SortedTable::open(path, linecount).unwrap(), [text(SOLVED)], text).with_max_depth(depth as u32)
}

/// Prune table on the C and D facelets only, `depth` steps deep.
pub fn cd_table(dir: &Path, puzzle: &PermutationPuzzle, depth: usize, with_max_depth: bool) -> StepsTable {
    let goal = recolor(SOLVED, b"CD");
    let entries = solutions(puzzle, &goal, Some(depth));
    let (path, linecount) = write_steps_table(dir, "lookup-table-toy-cd.txt", &entries);
    let table = StepsTable::new("toy-cd", SortedTable::open(path, linecount).unwrap(), [text(&goal)], cd_key);
    if with_max_depth {
        table.with_max_depth(depth as u32)
    } else {
        table
    }
}

/// Cost-only prune table on the A facelets.
pub fn a_table(dir: &Path, puzzle: &PermutationPuzzle, load_string: bool) -> CostTable {
    let (path, goal, max_depth) = write_cost_only_table(dir, "lookup-table-toy-a.cost-only.txt", puzzle, b'A');
    let index = CostOnlyTable::open(path, load_string).unwrap();
    CostTable::new("toy-a", index, [goal], |state: &[u8]| bits(state, b'A')).with_max_depth(max_depth)
}

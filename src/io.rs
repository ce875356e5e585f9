use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::error::{Result, SearchError};
use crate::puzzle::{PermutationPuzzle, State};

pub type Moves = BTreeMap<String, Vec<usize>>;

#[derive(Deserialize, Debug, Clone)]
pub struct PuzzleInfo {
    pub puzzle_type: String,
    pub solution_state: String,

    #[serde(deserialize_with = "deserialize_moves_from_str")]
    pub allowed_moves: Moves,
}

// The column holds a python-style dict: {'U': [1, 2, 0], ...}
fn deserialize_moves_from_str<'de, D>(deserializer: D) -> std::result::Result<Moves, D::Error>
where
    D: Deserializer<'de>,
{
    let v = String::deserialize(deserializer)?;
    let v = v.replace('\'', "\"");
    serde_json::from_str(&v).map_err(serde::de::Error::custom)
}

#[derive(Deserialize, Debug, Clone)]
pub struct PuzzleRecord {
    pub id: usize,
    pub puzzle_type: String,
    pub state: String,
}

// `A;B;C` or `ABC`; every symbol is a single byte.
pub fn parse_state(state: &str) -> Result<State> {
    if !state.contains(';') {
        return Ok(state.trim().as_bytes().to_vec());
    }
    state
        .split(';')
        .map(|symbol| match symbol.trim().as_bytes() {
            [c] => Ok(*c),
            _ => Err(SearchError::InvalidPuzzle(format!("state symbol {:?} is not a single character", symbol))),
        })
        .collect()
}

pub fn load_puzzle_info<P: AsRef<Path>>(puzzle_info_path: P, target_puzzle_type: &str) -> Result<PuzzleInfo> {
    let puzzle_info_file = BufReader::new(File::open(puzzle_info_path)?);
    let mut reader = csv::Reader::from_reader(puzzle_info_file);
    for result in reader.deserialize() {
        let puzzle_info: PuzzleInfo = result?;
        if puzzle_info.puzzle_type == target_puzzle_type {
            return Ok(puzzle_info);
        }
    }
    Err(SearchError::InvalidPuzzle(format!("unknown puzzle type {}", target_puzzle_type)))
}

pub fn load_puzzle<P: AsRef<Path>>(puzzle_info_path: P, puzzle_type: &str) -> Result<PermutationPuzzle> {
    let info = load_puzzle_info(puzzle_info_path, puzzle_type)?;
    let solved = parse_state(&info.solution_state)?;
    PermutationPuzzle::new(&info.puzzle_type, solved, info.allowed_moves.into_iter().collect())
}

pub fn load_puzzle_state<P: AsRef<Path>>(puzzles_path: P, target_id: usize) -> Result<(String, State)> {
    let puzzle_file = BufReader::new(File::open(puzzles_path)?);
    let mut reader = csv::Reader::from_reader(puzzle_file);
    for result in reader.deserialize() {
        let puzzle: PuzzleRecord = result?;
        if puzzle.id == target_id {
            return Ok((puzzle.puzzle_type, parse_state(&puzzle.state)?));
        }
    }
    Err(SearchError::InvalidPuzzle(format!("no puzzle with id {}", target_id)))
}

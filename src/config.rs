
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::cost_only::CostOnlyTable;
use crate::error::{Result, SearchError};
use crate::heuristic::Heuristic;
use crate::lookup::{CostTable, StepsTable};
use crate::puzzle::MoveModel;
use crate::search::{IdaSearch, Solution, Termination};
use crate::step::parse_steps;
use crate::table::SortedTable;

// How a state becomes a table key: pick `positions` (all of them when
// empty), map symbols through `recolor`, then either keep the symbols as a
// text key or, with `ones`, turn each position into a bit that is set when
// its symbol is one of `ones`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySpec {
    #[serde(default)]
    pub positions: Vec<usize>,
    #[serde(default)]
    pub recolor: BTreeMap<char, char>,
    #[serde(default)]
    pub ones: Option<String>,
}

impl KeySpec {
    fn project(&self, state: &[u8]) -> Vec<char> {
        let symbol = |c: u8| self.recolor.get(&(c as char)).copied().unwrap_or(c as char);
        if self.positions.is_empty() {
            state.iter().map(|&c| symbol(c)).collect()
        } else {
            self.positions.iter().map(|&i| symbol(state[i])).collect()
        }
    }

    fn is_one(&self, c: char) -> bool {
        self.ones.as_ref().map_or(false, |ones| ones.contains(c))
    }

    pub fn text(&self, state: &[u8]) -> String {
        let symbols = self.project(state);
        if self.ones.is_some() {
            symbols.into_iter().map(|c| if self.is_one(c) { '1' } else { '0' }).collect()
        } else {
            symbols.into_iter().collect()
        }
    }

    // First position is the most significant bit.
    pub fn bits(&self, state: &[u8]) -> u64 {
        self.project(state).into_iter().fold(0, |acc, c| (acc << 1) | self.is_one(c) as u64)
    }

    pub fn validate(&self, len: usize) -> Result<()> {
        if let Some(&i) = self.positions.iter().find(|&&i| i >= len) {
            return Err(SearchError::InvalidConfig(format!("key position {} is outside a puzzle of {} facelets", i, len)));
        }
        let width = if self.positions.is_empty() { len } else { self.positions.len() };
        if self.ones.is_some() && width > 64 {
            return Err(SearchError::InvalidConfig(format!("{} positions do not fit a 64 bit key", width)));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TableConfig {
    Steps {
        name: String,
        // None for a table without records.
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        linecount: u64,
        #[serde(default)]
        max_depth: Option<u32>,
        #[serde(default)]
        goal: Vec<String>,
        #[serde(default)]
        key: KeySpec,
        #[serde(default)]
        preload: bool,
    },
    CostOnly {
        name: String,
        filename: String,
        #[serde(default)]
        max_depth: Option<u32>,
        #[serde(default)]
        goal: Vec<u64>,
        #[serde(default)]
        key: KeySpec,
        #[serde(default)]
        load_string: bool,
    },
}

impl TableConfig {
    pub fn name(&self) -> &str {
        match self {
            TableConfig::Steps { name, .. } | TableConfig::CostOnly { name, .. } => name,
        }
    }

    pub fn key(&self) -> &KeySpec {
        match self {
            TableConfig::Steps { key, .. } | TableConfig::CostOnly { key, .. } => key,
        }
    }

    fn load_steps(&self, table_dir: &Path) -> Result<StepsTable> {
        match self {
            TableConfig::Steps { name, filename, linecount, max_depth, goal, key, preload } => {
                let index = match filename {
                    Some(filename) => SortedTable::open(table_dir.join(filename), *linecount)?,
                    None => SortedTable::empty(name),
                };
                if *preload {
                    index.preload()?;
                }
                let spec = key.clone();
                let table = StepsTable::new(name, index, goal.iter().cloned(), move |state: &[u8]| spec.text(state));
                Ok(match max_depth {
                    Some(depth) => table.with_max_depth(*depth),
                    None => table,
                })
            }
            TableConfig::CostOnly { name, .. } => Err(SearchError::UnimplementedVariant(format!(
                "{}: cost-only table as the primary table of a stage",
                name
            ))),
        }
    }

    fn load_prune(&self, table_dir: &Path) -> Result<PruneTable> {
        match self {
            TableConfig::Steps { .. } => Ok(PruneTable::Steps(self.load_steps(table_dir)?)),
            TableConfig::CostOnly { name, filename, max_depth, goal, key, load_string } => {
                if key.ones.is_none() {
                    return Err(SearchError::InvalidConfig(format!("{}: cost-only tables need a key with ones", name)));
                }
                let index = CostOnlyTable::open(table_dir.join(filename), *load_string)?;
                let spec = key.clone();
                let table = CostTable::new(name, index, goal.iter().copied(), move |state: &[u8]| spec.bits(state));
                Ok(PruneTable::CostOnly(match max_depth {
                    Some(depth) => table.with_max_depth(*depth),
                    None => table,
                }))
            }
        }
    }
}

fn default_max_threshold() -> u32 {
    99
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub table: TableConfig,
    #[serde(default)]
    pub illegal_moves: Vec<String>,
    #[serde(default)]
    pub prune_tables: Vec<TableConfig>,
    #[serde(default)]
    pub use_table_as_prune: bool,
    #[serde(default)]
    pub termination: Termination,
    #[serde(default)]
    pub min_threshold: Option<u32>,
    #[serde(default = "default_max_threshold")]
    pub max_threshold: u32,
}

impl StageConfig {
    pub fn from_json_str(s: &str) -> Result<StageConfig> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<StageConfig> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn load<P: AsRef<Path>>(&self, table_dir: P) -> Result<Stage> {
        let table_dir = table_dir.as_ref();
        let table = self.table.load_steps(table_dir)?;
        if self.use_table_as_prune && table.max_depth().is_none() {
            return Err(SearchError::InvalidConfig(format!(
                "{}: use_table_as_prune is set but max_depth is not",
                table.name()
            )));
        }

        let prune_tables = self
            .prune_tables
            .iter()
            .map(|config| config.load_prune(table_dir))
            .collect::<Result<Vec<_>>>()?;

        info!("{}: loaded with {} prune tables", table.name(), prune_tables.len());
        Ok(Stage {
            config: self.clone(),
            table,
            prune_tables,
        })
    }
}

pub enum PruneTable {
    Steps(StepsTable),
    CostOnly(CostTable),
}

impl PruneTable {
    fn source(&self) -> &dyn Heuristic {
        match self {
            PruneTable::Steps(table) => table,
            PruneTable::CostOnly(table) => table,
        }
    }
}

impl Heuristic for PruneTable {
    fn name(&self) -> &str {
        self.source().name()
    }

    fn max_depth(&self) -> Option<u32> {
        self.source().max_depth()
    }

    fn heuristic(&self, state: &[u8]) -> Result<u32> {
        self.source().heuristic(state)
    }

    fn seek_calls(&self) -> u64 {
        self.source().seek_calls()
    }

    fn reset_seek_calls(&self) {
        self.source().reset_seek_calls()
    }
}

pub struct Stage {
    config: StageConfig,
    table: StepsTable,
    prune_tables: Vec<PruneTable>,
}

impl Stage {
    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn table(&self) -> &StepsTable {
        &self.table
    }

    pub fn prune_tables(&self) -> &[PruneTable] {
        &self.prune_tables
    }

    pub fn validate(&self) -> Result<()> {
        self.table.index().validate()?;
        for prune_table in &self.prune_tables {
            if let PruneTable::Steps(table) = prune_table {
                table.index().validate()?;
            }
        }
        Ok(())
    }

    pub fn search<'a, P: MoveModel + ?Sized>(&'a self, puzzle: &'a P) -> Result<IdaSearch<'a, P>> {
        let len = puzzle.solved_state().len();
        self.config.table.key().validate(len)?;
        for config in &self.config.prune_tables {
            config.key().validate(len)?;
        }

        let illegal = parse_steps(&self.config.illegal_moves)?;
        let mut search = IdaSearch::new(puzzle, &self.table, &illegal)?.termination(self.config.termination);
        for prune_table in &self.prune_tables {
            search = search.prune_table(prune_table);
        }
        if self.config.use_table_as_prune {
            search = search.use_table_as_prune();
        }
        Ok(search)
    }

    pub fn solve<P: MoveModel + ?Sized>(&self, puzzle: &P, state: &[u8]) -> Result<Solution> {
        self.search(puzzle)?.solve_range(state, self.config.min_threshold, self.config.max_threshold)
    }
}

use std::process::ExitCode;

use cube_lookup::config::StageConfig;
use cube_lookup::puzzle::MoveModel;
use cube_lookup::step::steps_to_string;
use cube_lookup::{io, Result, SearchError};
use log::{error, info};
use rand::rngs::SmallRng;
use rand::SeedableRng;

fn parse_opt<T: std::str::FromStr>(matches: &getopts::Matches, name: &str) -> Result<Option<T>> {
    match matches.opt_str(name) {
        Some(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|_| SearchError::InvalidConfig(format!("--{} could not be parsed: {}", name, value))),
        None => Ok(None),
    }
}

fn required(matches: &getopts::Matches, name: &str) -> Result<String> {
    matches.opt_str(name).ok_or_else(|| SearchError::InvalidConfig(format!("--{} is required", name)))
}

fn run(matches: &getopts::Matches) -> Result<()> {
    let puzzle_info_path = required(matches, "puzzle-info-path")?;
    let puzzle_type = required(matches, "puzzle-type")?;
    let stage_path = required(matches, "stage")?;
    let table_dir = matches.opt_str("table-dir").unwrap_or(String::from("."));

    let puzzle = io::load_puzzle(&puzzle_info_path, &puzzle_type)?;

    let state = if let Some(state) = matches.opt_str("state") {
        io::parse_state(&state)?
    } else if let Some(puzzles_path) = matches.opt_str("puzzles-path") {
        let id = parse_opt::<usize>(matches, "id")?.ok_or_else(|| SearchError::InvalidConfig("--id must be specified".to_owned()))?;
        let (found_type, state) = io::load_puzzle_state(&puzzles_path, id)?;
        if found_type != puzzle_type {
            return Err(SearchError::InvalidConfig(format!("puzzle {} is a {}, not a {}", id, found_type, puzzle_type)));
        }
        state
    } else if let Some(len) = parse_opt::<usize>(matches, "scramble")? {
        let seed = parse_opt::<u64>(matches, "seed")?.unwrap_or(42);
        let mut rng = SmallRng::seed_from_u64(seed);
        let scramble = puzzle.scramble(&mut rng, len);
        info!("scramble: {}", steps_to_string(&scramble));
        puzzle.apply_all(puzzle.solved_state(), &scramble)?
    } else {
        return Err(SearchError::InvalidConfig("one of --state, --puzzles-path or --scramble is required".to_owned()));
    };

    let mut config = StageConfig::from_json_file(&stage_path)?;
    if let Some(max_threshold) = parse_opt::<u32>(matches, "max-threshold")? {
        config.max_threshold = max_threshold;
    }
    let stage = config.load(&table_dir)?;
    if matches.opt_present("validate") {
        stage.validate()?;
    }

    let solution = stage.solve(&puzzle, &state)?;
    info!(
        "{}: {} steps, threshold {:?}, {} nodes",
        stage.table().name(),
        solution.steps.len(),
        solution.threshold,
        solution.nodes
    );
    println!("{}", steps_to_string(&solution.steps));
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();

    let mut opts = getopts::Options::new();
    opts.optopt("", "puzzle-info-path", "path to puzzle_info.csv", "PUZZLE_INFO");
    opts.optopt("", "puzzle-type", "puzzle type in puzzle_info.csv", "TYPE");
    opts.optopt("", "stage", "stage config json", "STAGE");
    opts.optopt("", "table-dir", "directory holding the lookup tables", "DIR");
    opts.optopt("", "state", "state to solve, A;B;C or ABC", "STATE");
    opts.optopt("", "puzzles-path", "path to puzzles.csv", "PUZZLES");
    opts.optopt("", "id", "puzzle id", "ID");
    opts.optopt("", "scramble", "solve a random scramble of this length", "LEN");
    opts.optopt("", "seed", "random seed", "SEED");
    opts.optopt("", "max-threshold", "override the stage's max IDA threshold", "MAX");
    opts.optflag("", "validate", "check every table file before searching");
    opts.optflag("h", "help", "print this help");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", opts.usage("Usage: ida-solve [options]"));
            return ExitCode::FAILURE;
        }
    };
    if matches.opt_present("help") {
        println!("{}", opts.usage("Usage: ida-solve [options]"));
        return ExitCode::SUCCESS;
    }

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

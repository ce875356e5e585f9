mod common;

use std::cell::Cell;
use std::str::FromStr;

use common::*;
use cube_lookup::heuristic::{Heuristic, HeuristicAggregator};
use cube_lookup::lookup::StepsTable;
use cube_lookup::puzzle::MoveModel;
use cube_lookup::search::{IdaSearch, Termination};
use cube_lookup::step::Step;
use cube_lookup::table::SortedTable;
use cube_lookup::SearchError;

#[test]
fn test_heuristic_admissible() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let a = a_table(dir.path(), &puzzle, true);

    let mut aggregator = HeuristicAggregator::new();
    aggregator.push(&cd);
    aggregator.push(&a);

    let distances = solutions(&puzzle, SOLVED, None);
    assert_eq!(distances.len(), 2520);
    for (state, path) in &distances {
        let distance = path.len() as u32;
        let estimate = aggregator.estimate(state).unwrap();
        assert!(estimate <= distance, "{}: {} > {}", text(state), estimate, distance);
        assert!(cd.heuristic(state).unwrap() <= distance);
        assert!(a.heuristic(state).unwrap() <= distance);
        assert!(aggregator.estimate_bounded(state, Some(2)).unwrap() <= estimate);
    }
    assert_eq!(aggregator.estimate(SOLVED).unwrap(), 0);
}

#[test]
fn test_cost_only_backings_agree() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let in_memory = a_table(dir.path(), &puzzle, true);
    let seeking = a_table(dir.path(), &puzzle, false);
    for state in solutions(&puzzle, SOLVED, None).keys() {
        assert_eq!(in_memory.heuristic(state).unwrap(), seeking.heuristic(state).unwrap());
    }
    assert!(seeking.index().seek_calls() > 0);
}

#[test_log::test]
fn test_solution_found_at_first_threshold() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = primary_table(dir.path(), &puzzle, 2);
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let a = a_table(dir.path(), &puzzle, false);

    for distance in [3, 5, 7, 8] {
        let start = first_state_at_distance(&puzzle, distance);
        for use_table_as_prune in [false, true] {
            let mut search = IdaSearch::new(&puzzle, &table, &[]).unwrap().prune_table(&cd).prune_table(&a);
            if use_table_as_prune {
                search = search.use_table_as_prune();
            }

            let solution = search.solve(&start, 99).unwrap();
            assert_eq!(solution.state, SOLVED.to_vec());
            assert_eq!(puzzle.apply_all(&start, &solution.steps).unwrap(), SOLVED.to_vec());
            assert!(solution.steps.len() >= distance);
            assert!(solution.nodes > 0);

            let threshold = solution.threshold.unwrap();
            assert!(matches!(
                search.solve(&start, threshold - 1),
                Err(SearchError::NoIdaSolution { .. })
            ));
        }
    }
}

#[test]
fn test_goal_key_needs_no_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let path = dir.path().join("lookup-table-toy-corners.txt");
    std::fs::write(&path, "AAAC:U \nACAA:R'\n").unwrap();

    // B and A look the same on the first four facelets
    let key = |state: &[u8]| state[..4].iter().map(|&c| if c == b'B' { 'A' } else { c as char }).collect::<String>();
    let table = StepsTable::new("toy-corners", SortedTable::open(&path, 2).unwrap(), ["AAAA".to_owned()], key);
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let search = IdaSearch::new(&puzzle, &table, &[]).unwrap().prune_table(&cd);

    let start = puzzle.apply(SOLVED, &puzzle.step("D").unwrap()).unwrap();
    let solution = search.solve(&start, 10).unwrap();
    assert!(solution.steps.is_empty());
    assert_eq!(solution.state, start);
    assert_eq!(solution.threshold, None);
    assert_eq!(solution.nodes, 0);
    assert_eq!(table.index().seek_calls(), 0);
    assert_eq!(cd.index().seek_calls(), 0);
}

#[test]
fn test_table_hit_at_root() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = primary_table(dir.path(), &puzzle, 2);
    let search = IdaSearch::new(&puzzle, &table, &[]).unwrap();

    let start = first_state_at_distance(&puzzle, 2);
    let solution = search.solve(&start, 10).unwrap();
    assert_eq!(solution.steps.len(), 2);
    assert_eq!(solution.state, SOLVED.to_vec());
    assert_eq!(solution.threshold, None);
}

#[test]
fn test_completion_predicate_rejects_hits() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = primary_table(dir.path(), &puzzle, 2);
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let a = a_table(dir.path(), &puzzle, true);
    let start = first_state_at_distance(&puzzle, 8);

    let unconstrained = IdaSearch::new(&puzzle, &table, &[])
        .unwrap()
        .prune_table(&cd)
        .prune_table(&a)
        .solve(&start, 99)
        .unwrap();

    let calls = Cell::new(0);
    let solution = IdaSearch::new(&puzzle, &table, &[])
        .unwrap()
        .prune_table(&cd)
        .prune_table(&a)
        .completion(|state: &[u8], _: &[Step]| {
            assert_eq!(state, SOLVED);
            calls.set(calls.get() + 1);
            calls.get() > 3
        })
        .solve(&start, 99)
        .unwrap();

    assert_eq!(calls.get(), 4);
    assert_eq!(puzzle.apply_all(&start, &solution.steps).unwrap(), SOLVED.to_vec());
    assert!(solution.threshold.unwrap() >= unconstrained.threshold.unwrap());
}

#[test]
fn test_misconfigured_prune_table_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = primary_table(dir.path(), &puzzle, 2);
    let partial = cd_table(dir.path(), &puzzle, 3, false);
    let search = IdaSearch::new(&puzzle, &table, &[]).unwrap().prune_table(&partial);

    let start = first_state_at_distance(&puzzle, 8);
    assert!(matches!(
        search.solve(&start, 99),
        Err(SearchError::HeuristicMisconfigured { table, .. }) if table == "toy-cd"
    ));
}

#[test]
fn test_broken_chain_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();

    // record only the first step of a two step solution, the state it leads
    // to is missing from the table
    let start = first_state_at_distance(&puzzle, 2);
    let first_step = solutions(&puzzle, SOLVED, None)[&start][0].clone();
    let path = dir.path().join("lookup-table-toy-broken.txt");
    std::fs::write(&path, format!("{}:{}\n", text(&start), first_step)).unwrap();
    let table = StepsTable::new("toy-broken", SortedTable::open(&path, 1).unwrap(), [text(SOLVED)], text);

    let search = IdaSearch::new(&puzzle, &table, &[]).unwrap();
    assert!(matches!(search.solve(&start, 10), Err(SearchError::MissingRecord { .. })));
}

#[test]
fn test_goal_only_termination() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = StepsTable::new("toy-goal", SortedTable::empty("toy-goal"), [text(SOLVED)], text);
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let a = a_table(dir.path(), &puzzle, true);
    let start = first_state_at_distance(&puzzle, 8);

    let search = IdaSearch::new(&puzzle, &table, &[])
        .unwrap()
        .prune_table(&cd)
        .prune_table(&a)
        .termination(Termination::GoalOnly);
    let solution = search.solve(&start, 99).unwrap();
    assert_eq!(solution.steps.len(), 8);
    assert_eq!(solution.threshold, Some(9));
    assert_eq!(puzzle.apply_all(&start, &solution.steps).unwrap(), SOLVED.to_vec());

    let best_first = search.best_first(&first_state_at_distance(&puzzle, 5), Some(7)).unwrap();
    assert_eq!(best_first.state, SOLVED.to_vec());
    assert!(best_first.steps.len() >= 5);
}

#[test]
fn test_illegal_moves_are_never_tried() {
    let dir = tempfile::tempdir().unwrap();
    let puzzle = toy_puzzle();
    let table = StepsTable::new("toy-goal", SortedTable::empty("toy-goal"), [text(SOLVED)], text);
    let cd = cd_table(dir.path(), &puzzle, 3, true);
    let illegal = vec![puzzle.step("U2").unwrap(), puzzle.step("D2").unwrap()];
    let search = IdaSearch::new(&puzzle, &table, &illegal)
        .unwrap()
        .prune_table(&cd)
        .termination(Termination::GoalOnly);
    assert_eq!(search.moves().len(), 7);

    let start = first_state_at_distance(&puzzle, 5);
    let solution = search.solve(&start, 99).unwrap();
    assert_eq!(solution.state, SOLVED.to_vec());
    assert!(solution.steps.iter().all(|step| !illegal.contains(step)));

    let bad = vec![Step::from_str("F").unwrap()];
    assert!(matches!(
        IdaSearch::new(&puzzle, &table, &bad),
        Err(SearchError::IllegalMoveNotLegal(step)) if step == "F"
    ));
}

#[test]
fn test_completion_termination_on_empty_table() {
    let puzzle = toy_puzzle();
    let table = StepsTable::new("toy-front", SortedTable::empty("toy-front"), Vec::<String>::new(), text);
    let search = IdaSearch::new(&puzzle, &table, &[])
        .unwrap()
        .termination(Termination::Completion)
        .completion(|state: &[u8], _: &[Step]| state[..2] == *b"AA");

    let start = first_state_at_distance(&puzzle, 8);
    let solution = search.solve(&start, 20).unwrap();
    assert_eq!(&solution.state[..2], b"AA");
    assert_eq!(puzzle.apply_all(&start, &solution.steps).unwrap(), solution.state);
    assert!(solution.threshold.is_some());
    assert_eq!(table.index().seek_calls(), 0);
}

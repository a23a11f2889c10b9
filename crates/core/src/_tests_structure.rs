#![cfg(test)]

use tempfile::tempdir;

use super::_tests_fixtures::{self as fx, write, SIMID};
use super::error::UppoutError;
use super::run_dir::RunDirectory;
use super::structure;

fn open_run() -> (tempfile::TempDir, RunDirectory) {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("struct.{SIMID}.out"), &fx::struct_text());
    let run = RunDirectory::open(dir.path(), None).unwrap();
    (dir, run)
}

#[test]
fn neighbors_are_listed_in_file_order() {
    let (_dir, run) = open_run();
    let found = structure::neighbors(&run, 1).unwrap();

    let atoms: Vec<i64> = found.iter().map(|n| n.at_num).collect();
    assert_eq!(atoms, vec![2, 3, 4, 5]);
    assert_eq!(found[0].at_type, 1);
    assert_eq!(found[0].position, [0.5, 0.5, 0.5]);
    assert_eq!(found[0].jexch, 1.337);
    assert_eq!(found[1].at_type, 2);
    assert_eq!(found[1].dist, 1.0);

    let back = structure::neighbors(&run, 2).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].at_num, 1);
}

#[test]
fn atom_without_neighbors_is_not_found() {
    let (_dir, run) = open_run();
    assert!(matches!(
        structure::neighbors(&run, 7),
        Err(UppoutError::AtomNotFound(7))
    ));
}

#[test]
fn rounded_shells_merge_close_distances() {
    let (_dir, run) = open_run();
    let shells = structure::neighbor_shells(&run, 1, Some(3), Some(3)).unwrap();

    assert_eq!(shells.keys().copied().collect::<Vec<_>>(), vec![1, 2]);

    let first = &shells[&1];
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].count, 2);
    assert!((first[0].dist - 0.866015).abs() < 1e-9);
    assert!((first[0].jexch - 1.337).abs() < 1e-12);

    let second = &shells[&2];
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].count, 2);
    assert_eq!(second[0].dist, 1.0);
    assert!((second[0].jexch - 0.2).abs() < 1e-12);
}

#[test]
fn exact_shells_keep_precision_differences() {
    let (_dir, run) = open_run();
    let shells = structure::neighbor_shells(&run, 1, None, None).unwrap();
    let first = &shells[&1];
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].dist, 0.866);
    assert_eq!(first[1].dist, 0.86603);
    assert!(first.iter().all(|s| s.count == 1));
}

#[test]
fn missing_struct_file_is_reported() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("coord.{SIMID}.out"), &fx::coord_text());
    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert!(matches!(
        structure::neighbors(&run, 1),
        Err(UppoutError::FileNotFound(_))
    ));
}

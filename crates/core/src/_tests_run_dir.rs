#![cfg(test)]

use std::fs;

use tempfile::tempdir;

use super::_tests_fixtures::{self as fx, write, SIMID};
use super::error::UppoutError;
use super::run_dir::RunDirectory;
use super::schema::OutputKind;

#[test]
fn open_missing_directory_fails() {
    let dir = tempdir().unwrap();
    let err = RunDirectory::open(dir.path().join("nope"), None).unwrap_err();
    assert!(matches!(err, UppoutError::DirectoryNotFound(_)));
}

#[test]
fn open_file_path_fails() {
    let dir = tempdir().unwrap();
    write(dir.path(), "plain.txt", "x");
    let err = RunDirectory::open(dir.path().join("plain.txt"), None).unwrap_err();
    assert!(matches!(err, UppoutError::DirectoryNotFound(_)));
}

#[test]
fn single_simid_is_detected() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());

    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert_eq!(run.simid(), Some(SIMID));
    assert_eq!(
        run.prefixes(),
        [
            "averages",
            "coord",
            "cumulants",
            "projavgs",
            "projcumulants",
            "restart",
            "stdenergy",
            "struct"
        ]
    );
    assert!(run.file_names().contains(&"inpsd.dat".to_string()));
    for kind in OutputKind::ALL {
        assert!(run.has(kind), "{kind} should resolve");
    }
}

#[test]
fn multiple_simids_require_disambiguation() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.run00001.out", &fx::averages_text(2));
    write(dir.path(), "averages.run00002.out", &fx::averages_text(2));
    write(dir.path(), "coord.run00002.out", &fx::coord_text());

    match RunDirectory::open(dir.path(), None).unwrap_err() {
        UppoutError::AmbiguousSimId { simids, .. } => {
            assert_eq!(simids, vec!["run00001", "run00002"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn explicit_simid_restricts_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.run00001.out", &fx::averages_text(2));
    write(dir.path(), "averages.run00002.out", &fx::averages_text(5));
    write(dir.path(), "coord.run00002.out", &fx::coord_text());

    let run = RunDirectory::open(dir.path(), Some("run00002")).unwrap();
    assert_eq!(run.simid(), Some("run00002"));
    assert_eq!(
        run.file_names(),
        ["averages.run00002.out", "coord.run00002.out"]
    );
    assert_eq!(run.prefixes(), ["averages", "coord"]);
    assert_eq!(run.read_averages().unwrap().num_rows(), 5);
}

#[test]
fn explicit_simid_must_have_eight_characters() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());
    for bad in ["", "bcc_Fe", "bcc_Fe_T1"] {
        let err = RunDirectory::open(dir.path(), Some(bad)).unwrap_err();
        assert!(matches!(err, UppoutError::InvalidSimId(_)), "{bad:?}");
    }
}

#[test]
fn explicit_simid_without_files_fails() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());
    let err = RunDirectory::open(dir.path(), Some("other_id")).unwrap_err();
    assert!(matches!(err, UppoutError::NoMatchingFiles { .. }));
}

#[test]
fn missing_kind_is_file_not_found() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("averages.{SIMID}.out"), &fx::averages_text(2));
    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert!(matches!(
        run.read_cumulants().unwrap_err(),
        UppoutError::FileNotFound(_)
    ));
    assert!(matches!(
        run.resolve("stdenergy").unwrap_err(),
        UppoutError::FileNotFound(_)
    ));
}

#[test]
fn bare_prefix_files_are_used_without_simid() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages", &fx::averages_text(3));
    write(dir.path(), "coord_bcc.dat", &fx::coord_text());

    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert_eq!(run.simid(), None);
    assert!(run.prefixes().is_empty());
    assert_eq!(run.resolve("averages").unwrap(), dir.path().join("averages"));
    assert_eq!(run.read_averages().unwrap().num_rows(), 3);
    assert_eq!(run.num_atoms().unwrap(), Some(5));
    assert!(!run.has(OutputKind::Restart));
}

#[test]
fn short_identifiers_do_not_count_as_simids() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.test.out", &fx::averages_text(1));
    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert_eq!(run.simid(), None);
    assert_eq!(run.read_averages().unwrap().num_rows(), 1);
}

#[test]
fn derived_counts_are_computed_from_coord_and_restart() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());
    let run = RunDirectory::open(dir.path(), None).unwrap();

    assert_eq!(run.num_atoms().unwrap(), Some(5));
    assert_eq!(run.num_atoms_cell().unwrap(), Some(3));
    assert_eq!(run.num_atom_types().unwrap(), Some(2));
    assert_eq!(run.num_ens().unwrap(), Some(2));
    assert_eq!(run.xrange().unwrap(), Some((0.0, 2.0)));
    assert_eq!(run.yrange().unwrap(), Some((0.0, 0.5)));
    assert_eq!(run.zrange().unwrap(), Some((0.0, 1.0)));
}

#[test]
fn derived_counts_stay_unset_without_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), &format!("averages.{SIMID}.out"), &fx::averages_text(2));
    let run = RunDirectory::open(dir.path(), None).unwrap();
    let counts = run.counts().unwrap();
    assert_eq!(counts.num_atoms, None);
    assert_eq!(counts.num_ens, None);
    assert_eq!(counts.xrange, None);
}

#[test]
fn derived_counts_are_memoized() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());
    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert_eq!(run.num_atoms().unwrap(), Some(5));

    // Later changes on disk do not affect the cached values.
    fs::remove_file(dir.path().join(format!("coord.{SIMID}.out"))).unwrap();
    assert_eq!(run.num_atoms().unwrap(), Some(5));
}

#[test]
fn repeated_reads_are_identical() {
    let dir = tempdir().unwrap();
    fx::write_full_run(dir.path());
    let run = RunDirectory::open(dir.path(), None).unwrap();
    assert_eq!(run.read_averages().unwrap(), run.read_averages().unwrap());
    assert_eq!(run.read_projavgs().unwrap(), run.read_projavgs().unwrap());
}

#[test]
fn newest_simid_picks_latest_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.old00001.out", &fx::averages_text(1));
    let old = fs::OpenOptions::new()
        .write(true)
        .open(dir.path().join("averages.old00001.out"))
        .unwrap();
    old.set_modified(std::time::SystemTime::UNIX_EPOCH).unwrap();
    write(dir.path(), "averages.new00001.out", &fx::averages_text(1));

    assert_eq!(
        RunDirectory::newest_simid(dir.path(), OutputKind::Averages).unwrap(),
        "new00001"
    );
    assert!(matches!(
        RunDirectory::newest_simid(dir.path(), OutputKind::Cumulants).unwrap_err(),
        UppoutError::FileNotFound(_)
    ));
}

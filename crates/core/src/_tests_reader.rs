#![cfg(test)]

use tempfile::tempdir;

use super::_tests_fixtures::{self as fx, write};
use super::error::{ReadError, UppoutError};
use super::reader::{self, parse_number};
use super::schema::{self, OutputKind};

#[test]
fn averages_header_is_replaced_by_canonical_names() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.bcc_Fe_T.out", &fx::averages_text(3));

    let table = reader::read_averages(&dir.path().join("averages.bcc_Fe_T.out")).unwrap();
    assert_eq!(table.column_names(), schema::AVERAGES_COLUMNS);
    assert_eq!(table.num_rows(), 3);
    assert_eq!(table.column("Mx").unwrap(), &[0.0, 1.0, 2.0]);
    assert_eq!(table.column("iter").unwrap(), &[0.0, 100.0, 200.0]);
}

#[test]
fn blank_lines_are_ignored() {
    let dir = tempdir().unwrap();
    let text = "\n\n# header\n1000 0 0 0 0 0\n\n599900  2.40736381E-03  2.62769943E-03  3.25060379E-03  9.86414440E-03  1.92715641E-03\n\n";
    write(dir.path(), "averages", text);

    let table = reader::read_averages(&dir.path().join("averages")).unwrap();
    assert_eq!(table.num_rows(), 2);
    assert_eq!(table.get(1, "Mx"), Some(2.40736381e-03));
    assert_eq!(table.get(1, "M_stdv"), Some(1.92715641e-03));
}

#[test]
fn header_only_file_gives_empty_table() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.bcc_Fe_T.out", "# Iter Mx My Mz M M_stdv\n");
    let table = reader::read_averages(&dir.path().join("averages.bcc_Fe_T.out")).unwrap();
    assert!(table.is_empty());
    assert_eq!(table.num_columns(), 6);
}

#[test]
fn cumulants_and_energy_use_registry_columns() {
    let dir = tempdir().unwrap();
    write(dir.path(), "cumulants.bcc_Fe_T.out", &fx::cumulants_text());
    write(dir.path(), "stdenergy.bcc_Fe_T.out", &fx::energy_text());

    let cumulants = reader::read_cumulants(&dir.path().join("cumulants.bcc_Fe_T.out")).unwrap();
    assert_eq!(cumulants.column_names(), schema::CUMULANTS_COLUMNS);
    assert_eq!(cumulants.column("Binder").unwrap(), &[0.66, 0.66]);

    let energy = reader::read_energy(&dir.path().join("stdenergy.bcc_Fe_T.out")).unwrap();
    assert_eq!(energy.column_names(), schema::ENERGY_COLUMNS);
    assert_eq!(energy.column("tot").unwrap(), &[-1.0, -3.0]);
}

#[test]
fn coord_has_no_header() {
    let dir = tempdir().unwrap();
    write(dir.path(), "coord.bcc_Fe_T.out", &fx::coord_text());
    let table = reader::read_coord(&dir.path().join("coord.bcc_Fe_T.out")).unwrap();
    assert_eq!(table.column_names(), schema::COORD_COLUMNS);
    assert_eq!(table.num_rows(), 5);
    assert_eq!(table.get(0, "at_num"), Some(1.0));
}

#[test]
fn restart_skips_preamble_and_label_column() {
    let dir = tempdir().unwrap();
    write(dir.path(), "restart.bcc_Fe_T.out", &fx::restart_text(2, &[1, 2]));
    let table = reader::read_restart(&dir.path().join("restart.bcc_Fe_T.out")).unwrap();

    assert_eq!(table.column_names(), schema::RESTART_COLUMNS);
    assert_eq!(table.num_rows(), 4);
    assert_eq!(table.column("ens_num").unwrap(), &[1.0, 1.0, 2.0, 2.0]);
    assert_eq!(table.column("at_num").unwrap(), &[1.0, 2.0, 1.0, 2.0]);
    assert_eq!(table.column("mz").unwrap(), &[1.0, 1.0, -1.0, -1.0]);
    assert_eq!(table.get(0, "mom"), Some(2.226));
}

#[test]
fn struct_skips_comment_lines() {
    let dir = tempdir().unwrap();
    write(dir.path(), "struct.bcc_Fe_T.out", &fx::struct_text());
    let table = reader::read_struct(&dir.path().join("struct.bcc_Fe_T.out")).unwrap();
    assert_eq!(table.column_names(), schema::STRUCT_COLUMNS);
    assert_eq!(table.num_rows(), 5);
}

#[test]
fn projected_averages_are_partitioned_by_proj() {
    let dir = tempdir().unwrap();
    write(dir.path(), "projavgs.bcc_Fe_T.out", &fx::projavgs_text());
    let parts = reader::read_projavgs(&dir.path().join("projavgs.bcc_Fe_T.out")).unwrap();

    assert_eq!(parts.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    for (proj, table) in &parts {
        assert_eq!(table.column_names(), schema::PROJAVGS_COLUMNS);
        assert_eq!(table.num_rows(), 3);
        assert!(table.column("proj").unwrap().iter().all(|p| *p as i64 == *proj));
    }
    // Source order is preserved inside a partition.
    assert_eq!(parts[&2].column("iter").unwrap(), &[100.0, 200.0, 300.0]);
    assert_eq!(parts[&2].column("M").unwrap(), &[0.7, 0.8, 0.9]);
}

#[test]
fn projected_cumulants_keep_sparse_indices() {
    let dir = tempdir().unwrap();
    write(dir.path(), "projcumulants.bcc_Fe_T.out", &fx::projcumulants_text());
    let parts =
        reader::read_projcumulants(&dir.path().join("projcumulants.bcc_Fe_T.out")).unwrap();
    assert_eq!(parts.keys().copied().collect::<Vec<_>>(), vec![1, 3]);
    assert_eq!(parts[&3].column_names(), schema::PROJCUMULANTS_COLUMNS);
}

#[test]
fn column_count_mismatch_is_reported() {
    let dir = tempdir().unwrap();
    write(dir.path(), "averages.bcc_Fe_T.out", "# header\n1 2 3 4 5\n");
    let err = reader::read_averages(&dir.path().join("averages.bcc_Fe_T.out")).unwrap_err();
    assert!(matches!(
        err,
        UppoutError::SchemaMismatch {
            kind: OutputKind::Averages,
            expected: 6,
            found: 5,
            ..
        }
    ));
}

#[test]
fn projected_files_without_proj_column_are_rejected() {
    let dir = tempdir().unwrap();
    write(dir.path(), "projavgs.bcc_Fe_T.out", "100 0.9 0.01 0.1 0.2 0.9\n");
    let err = reader::read_projavgs(&dir.path().join("projavgs.bcc_Fe_T.out")).unwrap_err();
    assert!(matches!(err, UppoutError::SchemaMismatch { found: 6, expected: 7, .. }));
}

#[test]
fn ragged_rows_carry_line_numbers() {
    let dir = tempdir().unwrap();
    write(dir.path(), "coord.bcc_Fe_T.out", "1 0 0 0 0 1\n2 0 0 0 0\n");
    let err = reader::read_coord(&dir.path().join("coord.bcc_Fe_T.out")).unwrap_err();
    match err {
        UppoutError::Parse {
            source: ReadError::RaggedRow { line, expected, found },
            ..
        } => {
            assert_eq!((line, expected, found), (2, 6, 5));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_numbers_are_parse_errors() {
    let dir = tempdir().unwrap();
    write(dir.path(), "coord.bcc_Fe_T.out", "1 0 0 zero 0 1\n");
    let err = reader::read_coord(&dir.path().join("coord.bcc_Fe_T.out")).unwrap_err();
    assert!(matches!(
        err,
        UppoutError::Parse {
            source: ReadError::InvalidNumber { line: 1, .. },
            ..
        }
    ));
}

#[test]
fn read_failures_are_logged_as_errors() {
    fx::capture_logs();
    let dir = tempdir().unwrap();
    let name = "coord.logfail0.out";
    write(dir.path(), name, "1 0 0 zero 0 1\n");
    assert!(reader::read_coord(&dir.path().join(name)).is_err());

    let records = fx::logged(name);
    assert!(
        records
            .iter()
            .any(|(level, msg)| *level == log::Level::Error && msg.contains("coord")),
        "{records:?}"
    );
}

#[test]
fn fractional_projection_index_is_rejected() {
    let dir = tempdir().unwrap();
    let text = "# Iter  Proj  <M>  M_{stdv}  <M>_x  <M>_y  <M>_z\n\
                100  1  0.9  0.01  0.1  0.2  0.9\n\
                100  1.5  0.9  0.01  0.1  0.2  0.9\n";
    write(dir.path(), "projavgs.bcc_Fe_T.out", text);
    let err = reader::read_projavgs(&dir.path().join("projavgs.bcc_Fe_T.out")).unwrap_err();
    match err {
        UppoutError::Parse {
            source: ReadError::InvalidNumber { line, token },
            ..
        } => assert_eq!((line, token.as_str()), (3, "1.5")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_file_is_an_io_parse_error() {
    let dir = tempdir().unwrap();
    let err = reader::read_coord(&dir.path().join("coord.missing0.out")).unwrap_err();
    assert!(matches!(
        err,
        UppoutError::Parse {
            source: ReadError::Io(_),
            ..
        }
    ));
}

#[test]
fn fortran_exponents_are_accepted() {
    assert_eq!(parse_number("1.5D-03"), Some(1.5e-3));
    assert_eq!(parse_number("-2.0d+01"), Some(-20.0));
    assert_eq!(parse_number("3.25E-03"), Some(3.25e-3));
    assert_eq!(parse_number("abc"), None);
}

mod common;

use amrview::{
    geometry::Axis,
    io::Verbosity,
    series::{self, PlotfileSeries},
};
use approx::assert_abs_diff_eq;
use common::PlotfileSpec;
use std::io::ErrorKind;

/// Value of the three-box test fields: the box index for the first
/// component, offset by 100 for every further component.
fn three_box_value(comp: usize, cell: &[i64]) -> f64 {
    let box_idx = if cell[1] >= 2 {
        2.0
    } else if cell[0] >= 2 {
        1.0
    } else {
        0.0
    };
    box_idx + 100.0 * comp as f64
}

fn write_three_box_series(dir_path: &std::path::Path) {
    for (name, time) in [("plt0", 0.0), ("plt100", 1.0e-3), ("plt200", 2.0e-3)] {
        common::write_plotfile(
            &dir_path.join(name),
            &PlotfileSpec::three_box_2d(time, vec!["density", "pressure"]),
            &three_box_value,
        );
    }
}

fn open_three_box_series(dir_path: &std::path::Path) -> PlotfileSeries {
    PlotfileSeries::new(dir_path, true, None, Verbosity::Quiet).unwrap()
}

#[test]
fn scanning_yields_sorted_iterations_and_cached_times() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let series = open_three_box_series(dir.path());

    assert_eq!(series.iterations(), &[0, 100, 200]);
    assert_abs_diff_eq!(series.times()[1], 1.0e-3);
    assert_abs_diff_eq!(series.tmin(), 0.0);
    assert_abs_diff_eq!(series.tmax(), 2.0e-3);
    assert_eq!(
        series.avail_fields().unwrap(),
        &["density".to_string(), "pressure".to_string()]
    );

    let metadata = &series.fields_metadata()["density"];
    assert_eq!(metadata.geometry.tag(), "2dcartesian");
    assert_eq!(metadata.axis_labels, vec![Axis::X, Axis::Y]);
}

#[test]
fn full_field_extraction_reassembles_all_boxes() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let (values, meta) = series
        .get_field("density", None, None, Some(100), None, None)
        .unwrap();

    assert_eq!(values.shape(), &[4, 4]);
    for i in 0..4 {
        for j in 0..4 {
            assert_eq!(values[[i, j]], three_box_value(0, &[i as i64, j as i64]));
        }
    }

    assert_eq!(meta.axes(), &[Axis::X, Axis::Y]);
    assert_eq!(meta.shape(), &[4, 4]);
    assert_abs_diff_eq!(meta.grid_spacing()[1], 0.5);
    assert_abs_diff_eq!(meta.global_offset()[1], -1.0);
    assert_abs_diff_eq!(meta.grid_unit_si(), 1.0);
    assert_abs_diff_eq!(meta.time(), 1.0e-3);
    assert_eq!(meta.iteration(), 100);
}

#[test]
fn component_slabs_are_addressed_per_field() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let (pressure, _) = series
        .get_field("pressure", None, None, Some(0), None, None)
        .unwrap();
    assert_eq!(pressure[[0, 0]], 100.0);
    assert_eq!(pressure[[3, 0]], 101.0);
    assert_eq!(pressure[[0, 3]], 102.0);
}

#[test]
fn slicing_reduces_dimensionality_and_prunes_metadata() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let (lower_edge, meta) = series
        .get_field(
            "density",
            None,
            None,
            Some(100),
            Some(&[Axis::Y]),
            Some(&[-1.0]),
        )
        .unwrap();
    assert_eq!(lower_edge.shape(), &[4]);
    for i in 0..4 {
        assert_eq!(lower_edge[[i]], three_box_value(0, &[i as i64, 0]));
    }
    assert_eq!(meta.axes(), &[Axis::X]);
    assert_eq!(meta.shape(), &[4]);
    assert_eq!(meta.grid_spacing().len(), 1);
    assert_eq!(meta.global_offset().len(), 1);
    assert_abs_diff_eq!(meta.global_offset()[0], 0.0);

    let (upper_edge, _) = series
        .get_field(
            "density",
            None,
            None,
            Some(100),
            Some(&[Axis::Y]),
            Some(&[1.0]),
        )
        .unwrap();
    for i in 0..4 {
        assert_eq!(upper_edge[[i]], three_box_value(0, &[i as i64, 3]));
    }

    // Omitted relative positions default to the domain midpoint.
    let (midplane, _) = series
        .get_field("density", None, None, Some(100), Some(&[Axis::X]), None)
        .unwrap();
    for j in 0..4 {
        assert_eq!(midplane[[j]], three_box_value(0, &[2, j as i64]));
    }
}

#[test]
fn three_dimensional_series_slice_across_multiple_axes() {
    let dir = tempfile::tempdir().unwrap();
    common::write_plotfile(
        &dir.path().join("plt42"),
        &PlotfileSpec::two_box_3d(1.0e-6, vec!["Ex"]),
        &|_, cell| (cell[0] * 100 + cell[1] * 10 + cell[2]) as f64,
    );
    let mut series = PlotfileSeries::new(dir.path(), true, None, Verbosity::Quiet).unwrap();

    let (dense, meta) = series
        .get_field("Ex", None, None, Some(42), None, None)
        .unwrap();
    assert_eq!(dense.shape(), &[4, 3, 2]);
    assert_eq!(dense[[3, 2, 1]], 321.0);
    assert_eq!(meta.axes(), &[Axis::X, Axis::Y, Axis::Z]);

    let (line, meta) = series
        .get_field(
            "Ex",
            None,
            None,
            Some(42),
            Some(&[Axis::X, Axis::Z]),
            Some(&[1.0, -1.0]),
        )
        .unwrap();
    assert_eq!(line.shape(), &[3]);
    for j in 0..3 {
        assert_eq!(line[[j]], dense[[3, j, 0]]);
    }
    assert_eq!(meta.axes(), &[Axis::Y]);
    assert_eq!(meta.shape(), &[3]);
}

#[test]
fn selection_clamps_times_and_matches_iterations_exactly() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    assert_eq!(series.select(Some(-1.0), None).unwrap(), 0);
    assert_eq!(series.select(Some(1.0), None).unwrap(), 2);
    assert_eq!(series.select(Some(1.0e-3), None).unwrap(), 1);
    assert_eq!(series.current_iteration(), 100);
    assert_abs_diff_eq!(series.current_time(), 1.0e-3);

    assert_eq!(series.select(None, Some(200)).unwrap(), 2);

    let err = series.select(None, Some(150)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    for iteration in ["0", "100", "200"] {
        assert!(err.to_string().contains(iteration));
    }

    assert_eq!(
        series.select(Some(1.0e-3), Some(100)).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
    assert_eq!(
        series.select(None, None).unwrap_err().kind(),
        ErrorKind::InvalidInput
    );
}

#[test]
fn unknown_fields_and_axes_are_rejected_with_the_alternatives() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let err = series
        .get_field("momentum", None, None, Some(0), None, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(err.to_string().contains("density"));
    assert!(err.to_string().contains("pressure"));

    let err = series
        .get_field("density", None, None, Some(0), Some(&[Axis::Z]), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("x"));
}

#[test]
fn iteration_over_the_series_visits_every_snapshot_in_order() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let results = series
        .iterate(|series, iteration| {
            series.get_field("density", None, None, Some(iteration), None, None)
        })
        .unwrap();
    assert_eq!(results.len(), 3);

    let times: Vec<f64> = results.iter().map(|(_, meta)| meta.time()).collect();
    assert_eq!(times, vec![0.0, 1.0e-3, 2.0e-3]);

    let arrays: Vec<_> = results.into_iter().map(|(values, _)| values).collect();
    let stacked = series::try_stack_series(&arrays).unwrap();
    assert_eq!(stacked.shape(), &[3, 4, 4]);
    assert_eq!(stacked[[2, 0, 2]], 2.0);
}

#[test]
fn grid_parameters_describe_the_reference_grid() {
    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());
    let mut series = open_three_box_series(dir.path());

    let (sizes, ranges) = series.get_grid_parameters(None, Some(100)).unwrap();
    assert_eq!(sizes[&Axis::X], 4);
    assert_eq!(sizes[&Axis::Y], 4);
    assert_abs_diff_eq!(ranges[&Axis::X][0], 0.0);
    assert_abs_diff_eq!(ranges[&Axis::X][1], 1.0);
    assert_abs_diff_eq!(ranges[&Axis::Y][0], -1.0);
    assert_abs_diff_eq!(ranges[&Axis::Y][1], 1.0);
}

#[test]
fn raw_box_reads_can_gather_all_components() {
    use amrview::{
        assembly,
        io::plotfile::native::{PlotfileData, BASE_LEVEL},
    };

    let dir = tempfile::tempdir().unwrap();
    write_three_box_series(dir.path());

    let data = PlotfileData::open(dir.path().join("plt0")).unwrap();
    let domain = data.header().prob_domain(BASE_LEVEL).clone();
    let boxes = data
        .read_boxes(BASE_LEVEL, None, &[], Verbosity::Quiet)
        .unwrap();
    let dense = assembly::assemble_dense(&domain, boxes, Some(2)).unwrap();

    assert_eq!(dense.shape(), &[4, 4, 2]);
    assert_eq!(dense[[3, 0, 0]], 1.0);
    assert_eq!(dense[[0, 3, 1]], 102.0);
}

#[test]
fn non_cartesian_snapshots_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let mut spec = PlotfileSpec::three_box_2d(0.0, vec!["density"]);
    spec.coord_sys = 1;
    common::write_plotfile(&dir.path().join("plt0"), &spec, &three_box_value);

    let err = PlotfileSeries::new(dir.path(), true, None, Verbosity::Quiet).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert!(err.to_string().contains("Cartesian"));
}

#[test]
fn empty_directories_fail_with_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = PlotfileSeries::new(dir.path(), true, None, Verbosity::Quiet).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

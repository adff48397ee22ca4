//! Integration tests for the diff module.
//!
//! Exercises the full open, normalize, compare pipeline on real files for
//! each artifact format.

use super::*;
use crate::dataset::{LabeledDataset, Variable};
use crate::format::{ArchiveFormat, DatasetFileFormat, RasterFormat};
use crate::io::{write_archive, write_dataset_file, write_raster, GeoRaster};
use crate::scrub::{date_scrubber, RecursiveScrubber, SequenceScrubber};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};

/// Helper to write a single-band raster with one tag
fn raster_at(dir: &Path, name: &str, rows: Vec<Vec<f64>>, tag: &str) -> PathBuf {
    let path = dir.join(name);
    let raster = GeoRaster::from_rows(rows)
        .with_tag("some", tag)
        .with_crs("EPSG:4326")
        .with_transform([10.0, 1.0, 0.0, 50.0, 0.0, -1.0]);
    write_raster(&path, &raster).unwrap();
    path
}

/// Helper to build a dataset with one 2-D variable
fn grid_dataset(values: Vec<f64>, attrs: &[(&str, &str)], var_attrs: &[(&str, f64)]) -> LabeledDataset {
    let mut variable = Variable::numeric(&["y", "x"], &[2, 2], values).unwrap();
    for (key, value) in var_attrs {
        variable = variable.with_attr(*key, *value);
    }
    let mut dataset = LabeledDataset::new()
        .with_coord("y", Variable::index_coord("y", vec![0.5, 1.5]))
        .with_coord("x", Variable::index_coord("x", vec![0.5, 1.5]))
        .with_data_var("var_name", variable);
    for (key, value) in attrs {
        dataset = dataset.with_attr(*key, *value);
    }
    dataset
}

fn kinds(diffs: &[Difference]) -> Vec<DiffKind> {
    diffs.iter().map(|d| d.kind).collect()
}

// ============================================================================
// RASTERS
// ============================================================================

#[test]
fn test_identical_rasters_have_no_diffs() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = raster_at(temp_dir.path(), "geo.tif", vec![vec![42.0]], "tag");
    let diffs = Differ::new(RasterFormat).diffs(&path, &path).unwrap();
    assert_eq!(diffs, Vec::new());
}

#[test]
fn test_raster_tag_difference_is_one_tags_diff() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(temp_dir.path(), "received.tif", vec![vec![42.0]], "tag");
    let approved = raster_at(temp_dir.path(), "approved.tif", vec![vec![42.0]], "other");

    let diffs = Differ::new(RasterFormat).diffs(&received, &approved).unwrap();

    assert_eq!(kinds(&diffs), vec![DiffKind::Tags]);
    let text = &diffs[0].description;
    assert!(text.contains("--- approved.tif"));
    assert!(text.contains("+++ received.tif"));
    assert!(text.contains("-    \"some\": \"other\""));
    assert!(text.contains("+    \"some\": \"tag\""));
}

#[test]
fn test_raster_pixel_statistics() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(
        temp_dir.path(),
        "received.tif",
        vec![vec![0.0, 0.0], vec![0.0, 0.0]],
        "tag",
    );
    let approved = raster_at(
        temp_dir.path(),
        "approved.tif",
        vec![vec![2.0, 4.0], vec![-2.0, 1.0]],
        "tag",
    );

    let diffs = Differ::new(RasterFormat).diffs(&received, &approved).unwrap();

    assert_eq!(kinds(&diffs), vec![DiffKind::PixelStats, DiffKind::Dataset]);
    assert_eq!(
        diffs[0].description,
        "pixel differences statistics:\nmin=1, max=4, mean=2.25, median=2, nan_delta=0"
    );
    assert!(diffs[1].description.contains("[data_vars][data]"));
}

#[test]
fn test_raster_within_tolerance_is_equivalent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(temp_dir.path(), "received.tif", vec![vec![-1.01]], "tag");
    let approved = raster_at(temp_dir.path(), "approved.tif", vec![vec![-1.0]], "tag");

    let strict = Differ::new(RasterFormat).diffs(&received, &approved).unwrap();
    assert!(!strict.is_empty());

    let tolerant = Differ::new(RasterFormat)
        .with_tolerance(Tolerance::new(0.008, 0.0021).unwrap())
        .diffs(&received, &approved)
        .unwrap();
    assert_eq!(tolerant, Vec::new());
}

#[test]
fn test_scrubbed_raster_tags_compare_equal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(temp_dir.path(), "r.tif", vec![vec![1.0]], "2022-01-01T10:00:00");
    let approved = raster_at(temp_dir.path(), "a.tif", vec![vec![1.0]], "2021-03-04T05:06:07");

    let plain = Differ::new(RasterFormat).diffs(&received, &approved).unwrap();
    assert_eq!(kinds(&plain), vec![DiffKind::Tags]);

    let scrubbed = Differ::new(RasterFormat)
        .with_tags_scrubber(RecursiveScrubber::new(date_scrubber().unwrap()))
        .diffs(&received, &approved)
        .unwrap();
    assert_eq!(scrubbed, Vec::new());
}

// ============================================================================
// DATASET FILES
// ============================================================================

#[test]
fn test_dataset_statistics_and_missing_values() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.nc");
    let approved = temp_dir.path().join("approved.nc");
    write_dataset_file(&received, &grid_dataset(vec![0.0, 0.0, 0.0, f64::NAN], &[], &[])).unwrap();
    write_dataset_file(&approved, &grid_dataset(vec![2.0, 6.0, -1.0, 2.0], &[], &[])).unwrap();

    let diffs = Differ::new(DatasetFileFormat).diffs(&received, &approved).unwrap();

    assert_eq!(kinds(&diffs), vec![DiffKind::PixelStats, DiffKind::Dataset]);
    assert_eq!(
        diffs[0].description,
        "var_name: min=1, max=6, mean=3, median=2, nan_delta=1"
    );
    assert!(diffs[1].description.contains("[data_vars][var_name][y=1.5, x=1.5]: NaN != 2"));
}

#[test]
fn test_dataset_attribute_differences_at_every_level() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.nc");
    let approved = temp_dir.path().join("approved.nc");
    let mut received_ds = grid_dataset(vec![1.0; 4], &[("some", "tag")], &[("scale", 2.0)]);
    received_ds.coords.get_mut("x").unwrap().attrs.insert("units".into(), "m".into());
    write_dataset_file(&received, &received_ds).unwrap();
    write_dataset_file(&approved, &grid_dataset(vec![1.0; 4], &[("some", "other")], &[("scale", 1.0)]))
        .unwrap();

    let diffs = Differ::new(DatasetFileFormat).diffs(&received, &approved).unwrap();

    assert_eq!(kinds(&diffs), vec![DiffKind::Tags, DiffKind::Tags, DiffKind::Tags]);
    assert_eq!(
        diffs[0].description,
        "Global attributes:\nDiffering attributes:\nL   some: other\nR   some: tag"
    );
    assert_eq!(
        diffs[1].description,
        "Attributes of data variable 'var_name':\nDiffering attributes:\nL   scale: 1\nR   scale: 2"
    );
    assert_eq!(
        diffs[2].description,
        "Attributes of coordinate 'x':\nAttributes only on the received side:\n    units: m"
    );
}

#[test]
fn test_variables_on_one_side_only_reach_the_dataset_diff() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.nc");
    let approved = temp_dir.path().join("approved.nc");
    let extra = Variable::numeric(&["y", "x"], &[2, 2], vec![0.0; 4])
        .unwrap()
        .with_attr("units", "K");
    write_dataset_file(&received, &grid_dataset(vec![1.0; 4], &[], &[]).with_data_var("extra", extra))
        .unwrap();
    write_dataset_file(&approved, &grid_dataset(vec![1.0; 4], &[], &[])).unwrap();

    let diffs = Differ::new(DatasetFileFormat).diffs(&received, &approved).unwrap();

    // no metadata or statistics for a variable without a counterpart
    assert_eq!(kinds(&diffs), vec![DiffKind::Dataset]);
    assert!(diffs[0]
        .description
        .contains("Data variables only on the received side: extra"));
}

#[test]
fn test_shape_mismatch_is_a_dataset_diff() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.nc");
    let approved = temp_dir.path().join("approved.nc");
    write_dataset_file(
        &received,
        &LabeledDataset::new()
            .with_data_var("v", Variable::numeric(&["x"], &[3], vec![1.0, 2.0, 3.0]).unwrap()),
    )
    .unwrap();
    write_dataset_file(
        &approved,
        &LabeledDataset::new()
            .with_data_var("v", Variable::numeric(&["x"], &[2], vec![1.0, 2.0]).unwrap()),
    )
    .unwrap();

    let diffs = Differ::new(DatasetFileFormat).diffs(&received, &approved).unwrap();

    // the overlap is identical, so no statistics are reported
    assert_eq!(kinds(&diffs), vec![DiffKind::Dataset]);
    assert!(diffs[0]
        .description
        .contains("Differing shapes in data_vars 'v': received [3] != approved [2]"));
}

#[test]
fn test_missing_artifact_is_an_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let existing = temp_dir.path().join("a.nc");
    write_dataset_file(&existing, &grid_dataset(vec![1.0; 4], &[], &[])).unwrap();
    let result = Differ::new(DatasetFileFormat).diffs(&temp_dir.path().join("missing.nc"), &existing);
    assert!(matches!(result, Err(DiffError::Artifact(_))));
}

// ============================================================================
// ARCHIVES
// ============================================================================

#[test]
fn test_archive_scrubbed_attributes_and_statistics() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.zarr");
    let approved = temp_dir.path().join("approved.zarr");
    let date_old = "2022-01-01T00-00-00";
    let date_new = "2022-02-01T00-00-00";

    let received_ds = grid_dataset(vec![0.0; 4], &[("some", date_old)], &[(date_new, 42.0)]);
    let approved_ds = grid_dataset(vec![2.0, 4.0, -2.0, 1.0], &[("other", date_old)], &[(date_new, 21.0)]);
    write_archive(&received, &received_ds).unwrap();
    write_archive(&approved, &approved_ds).unwrap();

    let scrubber = crate::scrub::RegexScrubber::with_prefix(
        r"\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}",
        "date",
    )
    .unwrap();
    let diffs = Differ::new(ArchiveFormat)
        .with_tags_scrubber(RecursiveScrubber::new(scrubber))
        .diffs(&received, &approved)
        .unwrap();

    assert_eq!(
        kinds(&diffs),
        vec![DiffKind::Tags, DiffKind::Tags, DiffKind::PixelStats, DiffKind::Dataset]
    );
    let rendered = render_diffs(&diffs);
    assert!(rendered.contains("other: <date0>") && rendered.contains("<date0>: 21"));
    assert!(rendered.contains("some: <date0>") && rendered.contains("<date0>: 42"));
    assert!(rendered.contains("min=1, max=4, mean=2.25, median=2"));
}

#[test]
fn test_coordinate_labels_are_scrubbed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("received.zarr");
    let approved = temp_dir.path().join("approved.zarr");
    let labeled = |day: &str| {
        LabeledDataset::new()
            .with_coord("time", Variable::text(&["time"], &[1], vec![day]).unwrap())
            .with_data_var("v", Variable::numeric(&["time"], &[1], vec![1.0]).unwrap())
    };
    write_archive(&received, &labeled("2022-01-01")).unwrap();
    write_archive(&approved, &labeled("2020-06-30")).unwrap();

    let plain = Differ::new(ArchiveFormat).diffs(&received, &approved).unwrap();
    assert_eq!(kinds(&plain), vec![DiffKind::Dataset]);

    let scrubbed = Differ::new(ArchiveFormat)
        .with_coords_scrubber(SequenceScrubber::new(date_scrubber().unwrap()))
        .diffs(&received, &approved)
        .unwrap();
    assert_eq!(scrubbed, Vec::new());
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_every_format_is_reflexive() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dataset = grid_dataset(vec![1.0, f64::NAN, 3.0, 4.0], &[("some", "tag")], &[("scale", 0.5)]);

    let nc = temp_dir.path().join("d.nc");
    write_dataset_file(&nc, &dataset).unwrap();
    assert_eq!(Differ::new(DatasetFileFormat).diffs(&nc, &nc).unwrap(), Vec::new());

    let zarr = temp_dir.path().join("d.zarr");
    write_archive(&zarr, &dataset).unwrap();
    assert_eq!(Differ::new(ArchiveFormat).diffs(&zarr, &zarr).unwrap(), Vec::new());

    let tif = raster_at(temp_dir.path(), "d.tif", vec![vec![1.0, f64::NAN]], "tag");
    assert_eq!(Differ::new(RasterFormat).diffs(&tif, &tif).unwrap(), Vec::new());
}

#[test]
fn test_tolerance_monotonicity() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(temp_dir.path(), "r.tif", vec![vec![10.05, 20.0]], "tag");
    let approved = raster_at(temp_dir.path(), "a.tif", vec![vec![10.0, 20.08]], "tag");

    let tolerances = [
        Tolerance::new(0.0, 0.1).unwrap(),
        Tolerance::new(0.01, 0.1).unwrap(),
        Tolerance::new(0.01, 0.5).unwrap(),
        Tolerance::new(1.0, 1.0).unwrap(),
    ];
    for (i, tolerance) in tolerances.iter().enumerate() {
        let equivalent = Differ::new(RasterFormat)
            .with_tolerance(*tolerance)
            .diffs(&received, &approved)
            .unwrap()
            .is_empty();
        assert!(equivalent, "tolerance {} should accept", tolerance);
        for looser in &tolerances[i..] {
            assert!(looser.covers(tolerance));
        }
    }
}

#[test]
fn test_difference_order_is_fixed() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = raster_at(temp_dir.path(), "r.tif", vec![vec![0.0]], "tag");
    let approved = raster_at(temp_dir.path(), "a.tif", vec![vec![1.0]], "other");

    let diffs = Differ::new(RasterFormat).diffs(&received, &approved).unwrap();

    assert_eq!(
        kinds(&diffs),
        vec![DiffKind::Tags, DiffKind::PixelStats, DiffKind::Dataset]
    );
    let mut sorted = kinds(&diffs);
    sorted.sort();
    assert_eq!(sorted, kinds(&diffs));
}

use std::fs;
use std::path::PathBuf;

use geo_approval::commands::{
    execute_approve, execute_compare, execute_placeholder, execute_report, ApproveArgs,
    CompareArgs, PlaceholderArgs, ReportArgs, Settings,
};
use geo_approval::dataset::{LabeledDataset, Variable};
use geo_approval::format::FormatKind;
use geo_approval::io::{open_dataset_file, open_raster, write_dataset_file, write_raster, GeoRaster};

fn compare_args(received: PathBuf, approved: PathBuf) -> CompareArgs {
    CompareArgs {
        received,
        approved,
        format: None,
        report: true,
        settings: Settings::default(),
    }
}

fn dataset(value: f64) -> LabeledDataset {
    LabeledDataset::new()
        .with_attr("history", "created 2023-05-01T08:30:00")
        .with_data_var("v", Variable::numeric(&["x"], &[2], vec![value, 1.0]).unwrap())
}

#[test]
fn test_compare_equivalent_rasters() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("r.tif");
    let approved = temp_dir.path().join("a.tif");
    let raster = GeoRaster::from_rows(vec![vec![1.0, 2.0]]).with_tag("k", "v");
    write_raster(&received, &raster).unwrap();
    write_raster(&approved, &raster).unwrap();

    assert!(execute_compare(compare_args(received, approved)).unwrap());
}

#[test]
fn test_compare_differing_datasets() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("r.nc");
    let approved = temp_dir.path().join("a.nc");
    write_dataset_file(&received, &dataset(2.0)).unwrap();
    write_dataset_file(&approved, &dataset(3.0)).unwrap();

    assert!(!execute_compare(compare_args(received, approved)).unwrap());
}

#[test]
fn test_compare_missing_approved_is_not_equivalent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("r.nc");
    write_dataset_file(&received, &dataset(2.0)).unwrap();

    let approved = temp_dir.path().join("a.nc");
    assert!(!execute_compare(compare_args(received, approved.clone())).unwrap());
    assert!(!approved.exists(), "compare must not seed placeholders");
}

#[test]
fn test_compare_unknown_extension_needs_format() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("r.bin");
    let approved = temp_dir.path().join("a.bin");
    write_dataset_file(&received, &dataset(2.0)).unwrap();
    write_dataset_file(&approved, &dataset(2.0)).unwrap();

    assert!(execute_compare(compare_args(received.clone(), approved.clone())).is_err());

    let args = CompareArgs {
        format: Some(FormatKind::Dataset),
        ..compare_args(received, approved)
    };
    assert!(execute_compare(args).unwrap());
}

#[test]
fn test_compare_uses_config_scrubbers() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = temp_dir.path().join("approval-geo.toml");
    fs::write(&config, "scrubbers = [\"dates\"]\n").unwrap();

    let received = temp_dir.path().join("r.nc");
    let approved = temp_dir.path().join("a.nc");
    write_dataset_file(&received, &dataset(1.0)).unwrap();
    write_dataset_file(
        &approved,
        &dataset(1.0).with_attr("history", "created 2020-01-01T00:00:00"),
    )
    .unwrap();

    assert!(!execute_compare(compare_args(received.clone(), approved.clone())).unwrap());

    let args = CompareArgs {
        settings: Settings {
            config: Some(config),
            data_root: None,
        },
        ..compare_args(received, approved)
    };
    assert!(execute_compare(args).unwrap());
}

#[test]
fn test_report_seeds_placeholder() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("r.nc");
    let approved = temp_dir.path().join("a.nc");
    write_dataset_file(&received, &dataset(1.0)).unwrap();

    execute_report(ReportArgs {
        received,
        approved: approved.clone(),
        format: None,
        settings: Settings::default(),
    })
    .unwrap();

    let placeholder = open_dataset_file(&approved).unwrap();
    assert!(placeholder.data_vars.contains_key("empty"));
}

#[test]
fn test_report_without_received_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = execute_report(ReportArgs {
        received: temp_dir.path().join("r.tif"),
        approved: temp_dir.path().join("a.tif"),
        format: None,
        settings: Settings::default(),
    });
    assert!(result.is_err());
}

#[test]
fn test_placeholder_then_approve() {
    let temp_dir = tempfile::tempdir().unwrap();
    let received = temp_dir.path().join("tile.received.tif");
    let approved = temp_dir.path().join("tile.approved.tif");

    execute_placeholder(PlaceholderArgs {
        path: approved.clone(),
        format: None,
        force: false,
    })
    .unwrap();
    assert_eq!(open_raster(&approved).unwrap().values, vec![0.0]);

    write_raster(&received, &GeoRaster::from_rows(vec![vec![5.0]])).unwrap();
    execute_approve(ApproveArgs {
        received: received.clone(),
        approved: approved.clone(),
    })
    .unwrap();

    assert!(!received.exists());
    assert_eq!(open_raster(&approved).unwrap().values, vec![5.0]);
}

#[test]
fn test_approve_missing_received_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let result = execute_approve(ApproveArgs {
        received: temp_dir.path().join("nothing.tif"),
        approved: temp_dir.path().join("a.tif"),
    });
    assert!(result.is_err());
}

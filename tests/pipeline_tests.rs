//! End-to-end pipeline tests: CSV in, frames and design matrix out.

mod common;

use common::*;
use ndarray::Array2;
use ndarray_npy::read_npy;
use ofi_features::export::{read_design_csv, read_frame_metadata};
use ofi_features::prelude::*;
use std::fs;
use tempfile::TempDir;

const HEADER: &str = "ts_event,symbol,action,bid_px_00,bid_sz_00,ask_px_00,ask_sz_00,bid_px_01,bid_sz_01,ask_px_01,ask_sz_01";

fn write_csv(dir: &TempDir, rows: &[String]) -> std::path::PathBuf {
    let path = dir.path().join("book.csv");
    let mut text = format!("{HEADER}\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(&path, text).unwrap();
    path
}

/// Two symbols, interleaved, over three minutes; MSFT starts a minute late.
fn sample_rows() -> Vec<String> {
    let mut rows = Vec::new();
    for i in 0..90u64 {
        let ts = i * 2 * SEC;
        let aapl_bid = 100 + (i * 7 % 13);
        rows.push(format!(
            "{ts},AAPL,A,100.00,{aapl_bid},100.01,{},99.99,{},100.02,50",
            120 - (i % 9),
            60 + i % 5
        ));
        if ts >= MIN {
            rows.push(format!(
                "{},MSFT,C,300.00,{},300.02,40,299.98,25,300.04,{}",
                ts + 1,
                30 + (i * 3 % 11),
                20 + i % 4
            ));
        }
    }
    rows
}

#[test]
fn test_csv_to_design_matrix() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, &sample_rows());

    let pipeline = PipelineBuilder::new()
        .levels(2)
        .include_levels(true)
        .build()
        .unwrap();
    let output = pipeline.process_file(&path).unwrap();

    assert_eq!(output.symbols(), vec!["AAPL", "MSFT"]);
    assert_eq!(output.messages_processed, 90 + 60);

    let aapl = output.frame("AAPL").unwrap();
    let msft = output.frame("MSFT").unwrap();
    assert_eq!(aapl.len(), 3);
    assert_eq!(msft.len(), 2);
    assert_eq!(msft.bars[0].start_ns, MIN);

    let design = &output.design;
    assert_eq!(design.n_rows(), 3);
    assert_eq!(
        design.columns(),
        &[
            "AAPL.ofi_integrated",
            "AAPL.ofi_00",
            "AAPL.ofi_01",
            "MSFT.ofi_integrated",
            "MSFT.ofi_00",
            "MSFT.ofi_01",
        ]
    );
    assert_eq!(design.value_at(0, "MSFT.ofi_integrated"), None);
    assert_eq!(
        design.value_at(MIN, "AAPL.ofi_00"),
        Some(aapl.bars[1].normalized_ofi[0])
    );
    assert_eq!(design.complete_rows(), vec![1, 2]);
}

#[test]
fn test_configured_symbols_subset() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, &sample_rows());

    let pipeline = PipelineBuilder::new()
        .levels(2)
        .symbols(["MSFT"])
        .build()
        .unwrap();
    let output = pipeline.process_file(&path).unwrap();
    assert_eq!(output.symbols(), vec!["MSFT"]);
    assert_eq!(output.design.missing_count(), 0);
}

#[test]
fn test_missing_symbol_is_error() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, &sample_rows());

    let pipeline = PipelineBuilder::new()
        .symbols(["AAPL", "TSLA"])
        .build()
        .unwrap();
    match pipeline.process_file(&path) {
        Err(OfiError::UnknownSymbol(symbol)) => assert_eq!(symbol, "TSLA"),
        other => panic!("expected UnknownSymbol, got {other:?}"),
    }
}

#[test]
fn test_malformed_row_fails_whole_load() {
    let dir = TempDir::new().unwrap();
    let mut rows = sample_rows();
    rows.insert(3, ",AAPL,A,100.00,1,100.01,1,,,,".to_string());
    let path = write_csv(&dir, &rows);

    let pipeline = PipelineBuilder::new().build().unwrap();
    match pipeline.process_file(&path) {
        Err(OfiError::MalformedInput { row, field }) => {
            assert_eq!(row, 4);
            assert_eq!(field, "ts_event");
        }
        other => panic!("expected MalformedInput, got {other:?}"),
    }
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("ofi.toml");
    PipelineConfig::default()
        .with_levels(2)
        .with_frequency("30s")
        .unwrap()
        .with_reduction(ReductionConfig {
            loading_norm: LoadingNorm::L1,
        })
        .save_toml(&config_path)
        .unwrap();

    let config = PipelineConfig::load_toml(&config_path).unwrap();
    let pipeline = OfiPipeline::from_config(config).unwrap();
    let path = write_csv(&dir, &sample_rows());
    let output = pipeline.process_file(&path).unwrap();

    let aapl = output.frame("AAPL").unwrap();
    assert_eq!(aapl.len(), 6);
    assert!(!aapl.degenerate);
    let l1: f64 = aapl.loadings.iter().map(|w| w.abs()).sum();
    assert!((l1 - 1.0).abs() < 1e-9);
}

#[test]
fn test_export_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, &sample_rows());
    let out = dir.path().join("out");

    let pipeline = PipelineBuilder::new().levels(2).build().unwrap();
    let output = pipeline.process_file(&path).unwrap();

    NumpyExporter::new(&out).export(&output).unwrap();
    let csv_path = CsvExporter::new(&out).export_design(&output.design).unwrap();
    CsvExporter::new(&out)
        .export_frame(output.frame("AAPL").unwrap())
        .unwrap();

    let ofi: Array2<f64> = read_npy(out.join("AAPL_ofi.npy")).unwrap();
    assert_eq!(ofi.shape(), &[3, 3]);
    let aapl = output.frame("AAPL").unwrap();
    assert_eq!(ofi[[2, 2]], aapl.bars[2].integrated_ofi);

    let design: Array2<f64> = read_npy(out.join("design_matrix.npy")).unwrap();
    assert_eq!(design.shape(), &[3, 2]);
    assert!(design[[0, 1]].is_nan());

    let meta = read_frame_metadata(out.join("MSFT_metadata.json")).unwrap();
    assert_eq!(meta.n_bars, 2);
    assert_eq!(meta.messages_processed, 60);

    let loaded = read_design_csv(&csv_path).unwrap();
    assert_eq!(loaded, output.design);
    assert!(out.join("AAPL_bars.csv").exists());
}

#[test]
fn test_interleaved_input_out_of_order_within_symbol() {
    let messages = vec![
        top(10, "A", 10, 10),
        top(5, "B", 10, 10),
        top(4, "A", 11, 10),
    ];
    let pipeline = PipelineBuilder::new().levels(1).build().unwrap();
    assert!(matches!(
        pipeline.process(&messages),
        Err(OfiError::OutOfOrder { .. })
    ));
}

//! パフォーマンスベンチマーク
//!
//! このモジュールは、wiscreportクレートのパフォーマンスを測定するためのベンチマークを提供します。
//!
//! 実装するベンチマーク:
//! - 解析: 500行のCSVとワークブック
//! - 出力: 1名分のDOCXとPDF
//! - バッチ: 30名分のアーカイブ生成
//!
//! 入力データはすべてメモリ上で合成します。

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rust_xlsxwriter::Workbook;
use wiscreport::{OutputFormat, ReportBuilder, SourceFile};

const HEADER: [&str; 12] = [
    "firstname",
    "lastname",
    "dob",
    "testdate",
    "wisc5_fsiq_ss",
    "wisc5_vci_ss",
    "wisc5_vsi_ss",
    "wisc5_fri_ss",
    "wisc5_wmi_ss",
    "wisc5_psi_ss",
    "wisc5_bd_ss",
    "wisc5_si_ss",
];

fn row(i: usize) -> Vec<String> {
    let mut cells = vec![
        format!("First{}", i),
        format!("Last{}", i),
        "2015-03-01".to_string(),
        "2024-09-15".to_string(),
    ];
    cells.extend((0..6).map(|k| (70 + (i * 7 + k * 11) % 60).to_string()));
    cells.extend((0..2).map(|k| (1 + (i + k) % 19).to_string()));
    cells
}

/// 合成データのCSV
fn scores_csv(rows: usize) -> Vec<u8> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).unwrap();
    for i in 0..rows {
        writer.write_record(row(i)).unwrap();
    }
    writer.into_inner().unwrap()
}

/// 合成データのワークブック（得点は数値セル）
fn scores_workbook(rows: usize) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    for (c, name) in HEADER.iter().enumerate() {
        worksheet.write_string(0, c as u16, *name).unwrap();
    }
    for i in 0..rows {
        for (c, value) in row(i).iter().enumerate() {
            let r = (i + 1) as u32;
            match value.parse::<f64>() {
                Ok(n) => worksheet.write_number(r, c as u16, n).unwrap(),
                Err(_) => worksheet.write_string(r, c as u16, value).unwrap(),
            };
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// 入力形式ごとの解析速度
fn benchmark_parse(c: &mut Criterion) {
    let generator = ReportBuilder::new().build().unwrap();
    let inputs = [
        ("csv", SourceFile::new("scores.csv", scores_csv(500))),
        ("xlsx", SourceFile::new("scores.xlsx", scores_workbook(500))),
    ];

    let mut group = c.benchmark_group("parse_500_rows");
    for (label, file) in &inputs {
        group.throughput(Throughput::Bytes(file.bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(label), file, |b, file| {
            b.iter(|| {
                let records = generator.parse_source(black_box(file)).unwrap();
                black_box(records)
            });
        });
    }
    group.finish();
}

/// 出力フォーマットごとのレポート生成速度
fn benchmark_render(c: &mut Criterion) {
    let generator = ReportBuilder::new().build().unwrap();
    let records = generator
        .parse_source(&SourceFile::new("one.csv", scores_csv(1)))
        .unwrap();
    let record = &records[0];

    let mut group = c.benchmark_group("render_report");
    for format in [OutputFormat::Docx, OutputFormat::Pdf] {
        group.bench_with_input(BenchmarkId::from_parameter(format), &format, |b, &format| {
            b.iter(|| {
                let bytes = generator.render_as(black_box(record), format).unwrap();
                black_box(bytes)
            });
        });
    }
    group.finish();
}

/// 1クラス分（30名）のバッチ処理
fn benchmark_batch(c: &mut Criterion) {
    let files = vec![SourceFile::new("class.csv", scores_csv(30))];

    let mut group = c.benchmark_group("batch_30_students");
    group.throughput(Throughput::Elements(30));
    group.sample_size(20);
    for format in [OutputFormat::Docx, OutputFormat::Pdf] {
        let generator = ReportBuilder::new()
            .with_output_format(format)
            .build()
            .unwrap();
        group.bench_function(BenchmarkId::from_parameter(format), |b| {
            b.iter(|| {
                let outcome = generator.run_batch(black_box(&files)).unwrap();
                black_box(outcome)
            });
        });
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .measurement_time(std::time::Duration::from_secs(10))
        .warm_up_time(std::time::Duration::from_secs(3));
    targets = benchmark_parse, benchmark_render, benchmark_batch
}

criterion_main!(benches);

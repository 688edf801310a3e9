//! パフォーマンスベンチマーク
//!
//! デコード、抽出、レンダリングの各段階の処理時間を計測します。
//! ベンチマーク用のワークブックは実行時にメモリ上に生成します。

use std::io::Cursor;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_xlsxwriter::{Formula, Workbook, XlsxError};
use xlsxllm::{CalamineWorkbook, ExportFormat, PipelineBuilder};

/// 1行目がヘッダー、最終列が数式のテーブルを生成
fn generate_table(rows: u32, cols: u16) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Data")?;

    for col in 0..cols {
        worksheet.write_string(0, col, format!("Column{}", col + 1))?;
    }
    for row in 1..rows {
        for col in 0..cols - 1 {
            worksheet.write_number(row, col, (row + col as u32) as f64 * 1.5)?;
        }
        worksheet.write_formula(
            row,
            cols - 1,
            Formula::new(format!("=SUM(A{0}:B{0})", row + 1)).set_result("0"),
        )?;
    }

    Ok(workbook.save_to_buffer()?)
}

fn benchmark_decode(c: &mut Criterion) {
    let data = match generate_table(5_000, 10) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Warning: Failed to generate workbook: {}. Skipping benchmark.", e);
            return;
        }
    };

    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(10);

    group.bench_function("open_5000x10", |b| {
        b.iter(|| CalamineWorkbook::from_bytes(black_box(data.clone())).unwrap());
    });

    group.finish();
}

fn benchmark_extract_and_render(c: &mut Criterion) {
    let data = match generate_table(5_000, 10) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Warning: Failed to generate workbook: {}. Skipping benchmark.", e);
            return;
        }
    };

    let pipeline = PipelineBuilder::new().build().unwrap();
    let workbook = pipeline.open(Cursor::new(&data)).unwrap();
    let result = pipeline.process(&workbook, "Data", "A:J").unwrap();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(50_000));

    group.bench_function("extract_5000x10", |b| {
        b.iter(|| {
            pipeline
                .process(black_box(&workbook), "Data", black_box("A:J"))
                .unwrap()
        });
    });

    group.bench_function("render_all_5000x10", |b| {
        b.iter(|| pipeline.render(black_box(&result)).unwrap());
    });

    for format in ExportFormat::ALL {
        group.bench_function(format!("render_{}", format), |b| {
            b.iter(|| pipeline.render_format(black_box(&result), format).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_decode, benchmark_extract_and_render);
criterion_main!(benches);

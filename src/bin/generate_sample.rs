//! Writes a synthetic tightening-results table for trying out the explorer.
//!
//! ```text
//! cargo run --bin generate_sample [output.csv | output.parquet]
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One program: name, target torque [Nm], target time [s], target angle [deg].
const PROGRAMS: [(&str, f64, f64, f64); 4] = [
    ("1", 12.0, 0.8, 45.0),
    ("2", 18.0, 1.1, 60.0),
    ("3", 25.0, 1.4, 90.0),
    ("7", 8.0, 0.5, 30.0),
];

const PARTS_PER_PROGRAM: usize = 150;

struct Row {
    date: String,
    program: String,
    result: String,
    torque: f64,
    time: f64,
    angle: f64,
}

fn generate(rng: &mut SimpleRng) -> Vec<Row> {
    let mut rows = Vec::with_capacity(PROGRAMS.len() * PARTS_PER_PROGRAM);
    for (p, &(name, torque, time, angle)) in PROGRAMS.iter().enumerate() {
        for part in 0..PARTS_PER_PROGRAM {
            let t = rng.gauss(time, time * 0.08).max(0.05);
            // Torque grows with tightening time around the program target.
            let m = torque * (0.7 + 0.3 * t / time) + rng.gauss(0.0, torque * 0.04);
            let a = rng.gauss(angle, angle * 0.06);

            let result = match rng.next_f64() {
                r if r < 0.02 => "ERR torque",
                r if r < 0.05 => "W angle",
                r if r < 0.06 => "L",
                r if r < 0.07 => "T",
                _ => "OK",
            };

            let minute = (p * PARTS_PER_PROGRAM + part) % 60;
            let hour = 6 + (p * PARTS_PER_PROGRAM + part) / 60;
            rows.push(Row {
                date: format!("2024-03-11 {hour:02}:{minute:02}:00"),
                program: name.to_string(),
                result: result.to_string(),
                torque: round3(m),
                time: round3(t),
                angle: round3(a),
            });
        }
    }
    rows
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

const HEADERS: [&str; 6] = ["Date", "Prog.", "Result.", "M[Nm]", "T[s]", "Angle[deg]"];

fn write_csv(path: &PathBuf, rows: &[Row]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record([
            row.date.clone(),
            row.program.clone(),
            row.result.clone(),
            row.torque.to_string(),
            row.time.to_string(),
            row.angle.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &PathBuf, rows: &[Row]) -> anyhow::Result<()> {
    let text = |f: fn(&Row) -> &str| -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(f).collect::<Vec<_>>()))
    };
    let number = |f: fn(&Row) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new(HEADERS[0], DataType::Utf8, false),
        Field::new(HEADERS[1], DataType::Utf8, false),
        Field::new(HEADERS[2], DataType::Utf8, false),
        Field::new(HEADERS[3], DataType::Float64, false),
        Field::new(HEADERS[4], DataType::Float64, false),
        Field::new(HEADERS[5], DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            text(|r| r.date.as_str()),
            text(|r| r.program.as_str()),
            text(|r| r.result.as_str()),
            number(|r| r.torque),
            number(|r| r.time),
            number(|r| r.angle),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("sample_results.csv"));

    let mut rng = SimpleRng::new(42);
    let rows = generate(&mut rng);

    let is_parquet = output_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(&output_path, &rows)?;
    } else {
        write_csv(&output_path, &rows)?;
    }

    println!("Wrote {} results to {}", rows.len(), output_path.display());
    Ok(())
}

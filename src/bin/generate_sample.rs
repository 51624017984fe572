use std::path::Path;
use std::sync::Arc;

use arrow::array::Float64Array;
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

/// Shape of one synthetic population on log10 scales.
struct Population {
    label: &'static str,
    /// Mean and spread of log10 of the primary channel.
    primary_mu: f64,
    primary_sigma: f64,
    /// log10(secondary) = intercept + slope * log10(primary) + noise
    intercept: f64,
    slope: f64,
    noise: f64,
}

/// One cell: (time, FSC-A, SSC-A, FITC-A, PE-A).
type Event = (f64, f64, f64, f64, f64);

fn generate_events(pop: &Population, n: usize, rng: &mut SimpleRng) -> Vec<Event> {
    (0..n)
        .map(|i| {
            let time = i as f64 * 0.01;
            let fsc = rng.gauss(80_000.0, 12_000.0);
            let ssc = rng.gauss(30_000.0, 8_000.0);

            let log_primary = rng.gauss(pop.primary_mu, pop.primary_sigma);
            let log_secondary =
                pop.intercept + pop.slope * log_primary + rng.gauss(0.0, pop.noise);
            let mut fitc = 10f64.powf(log_primary);
            let mut pe = 10f64.powf(log_secondary);

            // Compensation pushes a few percent of events to or below zero.
            if rng.next_f64() < 0.03 {
                fitc = -rng.next_f64() * 50.0;
            }
            if rng.next_f64() < 0.02 {
                pe = if rng.next_f64() < 0.5 { 0.0 } else { -rng.next_f64() * 80.0 };
            }

            (time, fsc, ssc, fitc, pe)
        })
        .collect()
}

fn write_csv(path: &Path, events: &[Event]) {
    let mut writer = csv::Writer::from_path(path).expect("Failed to create CSV file");
    writer
        .write_record(["Time", "FSC-A", "SSC-A", "FITC-A", "PE-A"])
        .expect("Failed to write CSV header");
    for &(time, fsc, ssc, fitc, pe) in events {
        writer
            .write_record(&[
                format!("{time:.2}"),
                format!("{fsc:.1}"),
                format!("{ssc:.1}"),
                format!("{fitc:.3}"),
                format!("{pe:.3}"),
            ])
            .expect("Failed to write CSV row");
    }
    writer.flush().expect("Failed to flush CSV file");
}

fn column(events: &[Event], pick: fn(&Event) -> f64) -> Float64Array {
    Float64Array::from(events.iter().map(pick).collect::<Vec<_>>())
}

fn write_parquet(path: &Path, events: &[Event]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Time", DataType::Float64, false),
        Field::new("FITC-A", DataType::Float64, false),
        Field::new("PE-A", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(column(events, |e| e.0)),
            Arc::new(column(events, |e| e.3)),
            Arc::new(column(events, |e| e.4)),
        ],
    )
    .expect("Failed to create RecordBatch");

    let file = std::fs::File::create(path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");
}

fn main() {
    let out_dir = std::env::args().nth(1).unwrap_or_else(|| "sample_data".to_string());
    let out_dir = Path::new(&out_dir);
    std::fs::create_dir_all(out_dir).expect("Failed to create output directory");

    let mut rng = SimpleRng::new(42);
    let events_per_sample = 20_000;

    let populations = [
        Population {
            label: "control",
            primary_mu: 2.2,
            primary_sigma: 0.45,
            intercept: 0.8,
            slope: 0.30,
            noise: 0.15,
        },
        Population {
            label: "treated_low",
            primary_mu: 2.8,
            primary_sigma: 0.50,
            intercept: 0.4,
            slope: 0.60,
            noise: 0.15,
        },
        Population {
            label: "treated_high",
            primary_mu: 3.4,
            primary_sigma: 0.55,
            intercept: 0.1,
            slope: 0.85,
            noise: 0.20,
        },
    ];

    for (i, pop) in populations.iter().enumerate() {
        let events = generate_events(pop, events_per_sample, &mut rng);

        let csv_path = out_dir.join(format!("{}.csv", pop.label));
        write_csv(&csv_path, &events);
        println!("Wrote {} events to {}", events.len(), csv_path.display());

        if i == 0 {
            let parquet_path = out_dir.join(format!("{}.parquet", pop.label));
            write_parquet(&parquet_path, &events);
            println!("Wrote {} events to {}", events.len(), parquet_path.display());
        }
    }
}

//! Writes a JSON records file of synthetic Raman spectra for demos and
//! smoke tests: `generate_sample [OUTPUT] [COUNT]`.

use std::fs::File;
use std::io::BufWriter;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde_json::{json, Value};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Peaks plus a sloped fluorescence background and Gaussian noise.
fn generate_spectrum(
    wavenumbers: &[f64],
    peaks: &[(f64, f64, f64)],
    slope: f64,
    noise: &Normal<f64>,
    rng: &mut StdRng,
) -> Vec<f64> {
    wavenumbers
        .iter()
        .map(|&wn| {
            let signal: f64 = peaks
                .iter()
                .map(|&(mu, sigma, amp)| gaussian(wn, mu, sigma, amp))
                .sum();
            let background = 0.2 + slope * (wn - 400.0) / 1800.0;
            signal + background + noise.sample(rng)
        })
        .collect()
}

// (center cm⁻¹, width, amplitude)
const SHARED_PEAKS: [(f64, f64, f64); 3] = [(1003.0, 6.0, 0.6), (1450.0, 12.0, 0.8), (1660.0, 15.0, 0.7)];
const BENIGN_PEAKS: [(f64, f64, f64); 2] = [(1300.0, 10.0, 0.5), (1745.0, 8.0, 0.4)];
const MALIGNANT_PEAKS: [(f64, f64, f64); 2] = [(785.0, 8.0, 0.6), (1580.0, 10.0, 0.5)];
const OPERATORS: [&str; 2] = ["alice", "bob"];
const POINTS: usize = 1801;

fn marker_text(rng: &mut StdRng, positive: bool, options: &[&str], negative: &[&str]) -> Value {
    if rng.gen_bool(0.15) {
        return Value::Null;
    }
    let pool = if positive { options } else { negative };
    pool.choose(rng).map_or(Value::Null, |s| json!(s))
}

/// `count` records alternating benign/malignant, reproducible from `seed`.
fn generate_records(count: usize, seed: u64) -> Result<Vec<Value>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.01).context("noise distribution")?;

    // 400 → 2200 cm⁻¹, unit spacing
    let wavenumbers: Vec<f64> = (0..POINTS).map(|i| 400.0 + i as f64).collect();

    let records = (0..count)
        .map(|i| {
            let malignant = i % 2 == 1;
            let scale = rng.gen_range(0.8..1.2);
            let peaks: Vec<(f64, f64, f64)> = SHARED_PEAKS
                .iter()
                .chain(if malignant { &MALIGNANT_PEAKS } else { &BENIGN_PEAKS })
                .map(|&(mu, sigma, amp)| (mu + rng.gen_range(-2.0..2.0), sigma, amp * scale))
                .collect();
            let slope = rng.gen_range(0.0..0.5);
            let y = generate_spectrum(&wavenumbers, &peaks, slope, &noise, &mut rng);

            let hormone = rng.gen_bool(if malignant { 0.7 } else { 0.3 });
            let her2 = rng.gen_bool(if malignant { 0.4 } else { 0.1 });
            let proliferative = rng.gen_bool(if malignant { 0.7 } else { 0.2 });
            let operator = OPERATORS[(i / 2) % OPERATORS.len()];
            json!({
                "x": wavenumbers,
                "y": y,
                "diagnosis": if malignant { "Malignant" } else { "Benign" },
                "ER": marker_text(&mut rng, hormone, &["80%", "positive", "+"], &["0%", "negative", "-"]),
                "PR": marker_text(&mut rng, hormone, &["60%", "阳性"], &["阴性", "0%"]),
                "HER2": marker_text(&mut rng, her2, &["3+"], &["0", "1+", "2+"]),
                "Ki67": marker_text(&mut rng, proliferative, &["30%", "45%"], &["5%", "10%"]),
                "operator": operator,
                "is_training_data": i % 10 != 9,
            })
        })
        .collect();
    Ok(records)
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let output_path = args.next().unwrap_or_else(|| "sample_data.json".to_string());
    let count: usize = match args.next() {
        Some(n) => n.parse().context("COUNT must be a positive integer")?,
        None => 60,
    };

    let records = generate_records(count, 42)?;

    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create output file {output_path}"))?;
    serde_json::to_writer(BufWriter::new(file), &records).context("Failed to write records")?;

    println!("Wrote {} spectra ({POINTS} wavenumbers each) to {output_path}", records.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_alternate_class_and_operator() {
        let records = generate_records(8, 1).unwrap();
        assert_eq!(records.len(), 8);
        let operators: Vec<&str> = records.iter().map(|r| r["operator"].as_str().unwrap()).collect();
        assert_eq!(operators, ["alice", "alice", "bob", "bob", "alice", "alice", "bob", "bob"]);
        assert_eq!(records[0]["diagnosis"], "Benign");
        assert_eq!(records[1]["diagnosis"], "Malignant");
        assert_eq!(records[0]["x"].as_array().unwrap().len(), POINTS);
        assert_eq!(records[3]["y"].as_array().unwrap().len(), POINTS);
    }

    #[test]
    fn same_seed_same_records() {
        assert_eq!(generate_records(3, 9).unwrap(), generate_records(3, 9).unwrap());
    }
}

//! Shared fixtures for the cropcast-ml integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

pub const HEADER: &str = "State_Name,District_Name,Season,Crop,Crop_Year,Area,annual_rainfall,Soil pH,Soil Type,Production,yield";

const STATES: [&str; 3] = ["Punjab", "Kerala", "Bihar"];
const DISTRICTS: [&str; 4] = ["Ludhiana", "Kollam", "Patna", "Gaya"];
const SEASONS: [&str; 3] = ["Kharif     ", "Rabi       ", "Whole Year "];
const CROPS: [&str; 4] = ["Rice", "Wheat", "Maize", "Arhar/Tur"];
const SOILS: [&str; 3] = ["Loamy", "Clay", "Sandy"];

/// Area of generated row `i`: cycles through 1..=50.
pub fn area_of(i: usize) -> f64 {
    (1 + i % 50) as f64
}

/// Write a split with every training column. `label` maps the row index and
/// its area to the `yield` value.
pub fn write_split(
    dir: &Path,
    name: &str,
    rows: usize,
    offset: usize,
    label: impl Fn(usize, f64) -> f64,
) -> PathBuf {
    let path = dir.join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for n in 0..rows {
        let i = n + offset;
        let area = area_of(i);
        writeln!(
            file,
            "{},{},{},{},{},{},{},{},{},{},{}",
            STATES[i % 3],
            DISTRICTS[(i / 3) % 4],
            SEASONS[(i / 7) % 3],
            CROPS[(i / 11) % 4],
            1997 + (i % 17),
            area,
            600.0 + ((i * 37) % 900) as f64,
            format!("{:.1}", 5.5 + ((i * 13) % 30) as f64 / 10.0),
            SOILS[(i / 5) % 3],
            area * 3.0,
            label(i, area)
        )
        .unwrap();
    }
    path
}

/// Deterministic pseudo-random values in `[0, 100)`.
pub fn noise(i: usize, salt: u64) -> f64 {
    let mut x = (i as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ salt;
    x ^= x >> 33;
    x = x.wrapping_mul(0xFF51_AFD7_ED55_8CCD);
    x ^= x >> 33;
    (x % 10_000) as f64 / 100.0
}

// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
#![allow(non_snake_case)]

use crate::Utils::logger::init_logger;
use crate::series::bracketer::bracket;
use crate::series::normalizer::normalize;
use crate::series::series_cache::{SeriesCache, SeriesValue};
use crate::series::series_settings::SeriesSettings;
use crate::series::tokenizer::tokenize;
use num_complex::Complex64;
use std::io::Write;

#[allow(dead_code)]
pub fn series_examples(example: usize) {
    match example {
        0 => {
            // from raw user input to the canonical forms
            let input = "3x^2 - 2|x| + sum(1;n;(-1)^k/k;k)";
            let normalized = normalize(input).unwrap();
            println!("normalized: {}", normalized);
            let bracketed = bracket(&normalized).unwrap();
            println!("bracketed: {}", bracketed);
            let tokens = tokenize(&bracketed).unwrap();
            println!("{} tokens: {}", tokens.len(), tokens);
        }
        1 => {
            // several rows at once, evaluated for a range of x and n
            let mut series = SeriesCache::new();
            let results = series.recompile(&[
                "sum(0;n;x^k;k)",
                "1/(1-x)",
                "int(0;x;e^(-t^2);t)",
                "3++2",
            ]);
            for (row, result) in results.iter().enumerate() {
                match result {
                    Ok(tokens) => println!("row {}: {} tokens", row, tokens.len()),
                    Err(e) => println!("row {}: rejected, {}", row, e),
                }
            }
            for n in 1..6 {
                let x = 0.5;
                let partial = series.value_at(0, x, n).map(|v| v.re());
                let exact = series.value_at(1, x, n).map(|v| v.re());
                println!("n = {}: partial sum {:?}, limit {:?}", n, partial, exact);
            }
            // the integral cache grows as x moves to the right
            for i in 0..=10 {
                let x = 0.2 * i as f64;
                println!("erf-like integral at {:.1}: {:?}", x, series.value_at(2, x, 0));
            }
            println!("row 3: {:?}", series.value_at(3, 1.0, 0));
        }
        2 => {
            // complex abscissa versus real abscissa
            let mut series = SeriesCache::new();
            series.recompile(&["sqrt(x)", "e^(i*x)"]);
            for x in [-4.0, 4.0] {
                println!("sqrt({}) on the real axis: {:?}", x, series.value_at(0, x, 0));
                println!(
                    "sqrt({}) in the complex plane: {:?}",
                    x,
                    series.value_at(0, Complex64::new(x, 0.0), 0)
                );
            }
            if let Some(SeriesValue::Complex(z)) =
                series.value_at(1, Complex64::new(std::f64::consts::PI, 0.0), 0)
            {
                println!("e^(i*pi) = {}", z);
            }
        }
        3 => {
            // settings from a document, logging configured from it
            let document = "integral\n steps: 4000\n max_delta_steps: 20000\nevaluation\n fold_constants: true\nlogging\n loglevel: debug\n";
            let mut file = tempfile::NamedTempFile::new().unwrap();
            file.write_all(document.as_bytes()).unwrap();
            let settings = SeriesSettings::from_file(file.path()).unwrap();
            init_logger(settings.loglevel.as_deref(), false);
            println!("{:?}", settings);
            let mut series = SeriesCache::with_settings(settings);
            series.recompile(&["int(0;x;sin(t)^2;t)"]);
            for x in [1.0, 2.0, 4.0, 3.0] {
                println!("x = {}: {:?}", x, series.value_at(0, x, 0));
            }
        }
        _ => {
            println!("example not found");
        }
    }
}

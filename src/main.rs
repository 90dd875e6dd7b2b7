#![allow(non_snake_case)]
use RustedSeries::Examples::series_examples::series_examples;

fn main() {
    let example = 1;
    series_examples(example);
}

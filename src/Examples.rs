//! examples of usage of RustedSeries
/// compiling and evaluating series, settings files and logging
pub mod series_examples;

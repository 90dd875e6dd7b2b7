//! different utility modules used throughout the project
/// logger setup: terminal output plus an optional time-stamped log file
pub mod logger;
/// parse document with structure like "title1 key1: value1, value2 key2: value2 title2 key3:value3" into HashMap
pub mod settings_parser;
#[cfg(test)]
mod settings_parser_tests;

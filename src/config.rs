//! Configuration for the craftmap postprocessor.
//!
//! Handles:
//! - Command-line argument parsing
//! - Normalizer thresholds shared across the batch

use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments
#[derive(Debug, Parser)]
#[command(name = "craftmap")]
#[command(about = "Annotate KISSlicer GCODE with CraftWare segment tags and \
normalize short-segment feedrates")]
#[command(version)]
pub struct Args {
    /// Minimum feedrate written for short segments
    #[arg(short = 'f', value_name = "FEEDRATE", default_value_t = 900.0)]
    pub min_feedrate: f64,

    /// Segment length below which the feedrate clamp applies
    #[arg(short = 'l', value_name = "LENGTH", default_value_t = 2.0)]
    pub min_length: f64,

    /// GCODE files to rewrite in place
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,
}

/// Normalizer thresholds; read-only while files are being processed.
#[derive(Debug, Clone)]
pub struct Config {
    /// Feedrate floor for segments shorter than `min_length`.
    pub min_feedrate: f64,
    /// Segment length threshold, in the file's native length unit.
    pub min_length: f64,
}

impl Config {
    /// Create configuration from parsed arguments (useful for testing)
    pub fn from_args(args: &Args) -> Self {
        Config {
            min_feedrate: args.min_feedrate,
            min_length: args.min_length,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            min_feedrate: 900.0,
            min_length: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_flags() {
        let args = Args::parse_from(["craftmap", "print.gcode"]);
        let config = Config::from_args(&args);
        assert_eq!(config.min_feedrate, 900.0);
        assert_eq!(config.min_length, 2.0);
        assert_eq!(args.files, vec![PathBuf::from("print.gcode")]);
    }

    #[test]
    fn test_attached_flag_values_parse() {
        let args = Args::parse_from(["craftmap", "-f1200", "-l0.5", "print.gcode"]);
        let config = Config::from_args(&args);
        assert_eq!(config.min_feedrate, 1200.0);
        assert_eq!(config.min_length, 0.5);
    }

    #[test]
    fn test_flags_apply_globally_regardless_of_order() {
        let args = Args::parse_from(["craftmap", "a.gcode", "-f600", "b.gcode"]);
        let config = Config::from_args(&args);
        assert_eq!(config.min_feedrate, 600.0);
        assert_eq!(args.files.len(), 2);
    }

    #[test]
    fn test_no_files_is_representable() {
        let args = Args::parse_from(["craftmap"]);
        assert!(args.files.is_empty());
    }
}

//! Single-pass line transducer over one GCODE file.
//!
//! Reads the input line by line, inserts `;segType:` annotations after
//! recognized KISSlicer path comments, routes motion commands through the
//! feedrate normalizer, and atomically replaces the original file with the
//! rewritten copy.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};

use crate::classify;
use crate::config::Config;
use crate::normalize::FeedrateNormalizer;

/// Suffix appended to the input filename for the replacement file. Keeping
/// the temp file in the input's directory makes the final rename a
/// same-filesystem atomic replace.
const TMP_SUFFIX: &str = ".tmp";

/// Longest line accepted before the file is rejected as malformed.
const MAX_LINE_LEN: usize = 1 << 20;

/// Prefix of the annotation lines this tool inserts.
const SEG_TYPE_PREFIX: &[u8] = b";segType:";

/// Counters reported after a file has been processed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub lines: u64,
    pub annotations: u64,
}

/// Rewrite `path` in place.
///
/// The transformed content is written to a temp file next to the input and
/// renamed over it only on full success. Any failure leaves the original
/// untouched; a failure after the temp file was created leaves the partial
/// temp file on disk for inspection.
pub fn process_file(path: &Path, config: &Config) -> Result<Stats> {
    let input =
        File::open(path).with_context(|| format!("cannot open {}", path.display()))?;

    let tmp_path = tmp_path_for(path);
    let output = File::create(&tmp_path)
        .with_context(|| format!("cannot create {}", tmp_path.display()))?;
    debug!("writing replacement to {}", tmp_path.display());

    let mut writer = BufWriter::new(output);
    let stats = transform(BufReader::new(input), &mut writer, config)
        .with_context(|| format!("error rewriting {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("error writing {}", tmp_path.display()))?;
    drop(writer);

    fs::rename(&tmp_path, path)
        .with_context(|| format!("cannot replace {}", path.display()))?;
    info!(
        "{}: {} lines, {} annotations inserted",
        path.display(),
        stats.lines,
        stats.annotations
    );
    Ok(stats)
}

/// Transform one GCODE stream.
///
/// Split out from [`process_file`] so the loop can be tested against
/// in-memory buffers.
pub fn transform<R, W>(mut input: R, output: &mut W, config: &Config) -> Result<Stats>
where
    R: BufRead,
    W: Write,
{
    let mut normalizer = FeedrateNormalizer::new(config);
    let mut stats = Stats::default();
    let mut line: Vec<u8> = Vec::new();
    let mut translated = false;

    loop {
        line.clear();
        let n = (&mut input)
            .take(MAX_LINE_LEN as u64 + 1)
            .read_until(b'\n', &mut line)
            .context("read error")?;
        if n == 0 {
            break;
        }
        if line.len() > MAX_LINE_LEN {
            bail!("line {} exceeds {} bytes", stats.lines + 1, MAX_LINE_LEN);
        }
        stats.lines += 1;

        let tag = classify::segment_type(&line);

        // When re-running over our own output, drop the annotations from
        // the previous run; fresh ones are inserted below.
        if translated && line.starts_with(SEG_TYPE_PREFIX) {
            continue;
        }

        if is_motion_line(&line) {
            normalizer
                .process_line(&line, output)
                .context("write error")?;
        } else {
            output.write_all(&line).context("write error")?;
        }

        if let Some(tag) = tag {
            writeln!(output, ";segType:{}", tag).context("write error")?;
            stats.annotations += 1;
            translated = true;
        }
    }

    Ok(stats)
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(TMP_SUFFIX);
    PathBuf::from(name)
}

/// `G0`/`G1` followed by a non-digit, non-period byte, so `G10` or `G1.5`
/// stay untouched.
fn is_motion_line(line: &[u8]) -> bool {
    if !(line.starts_with(b"G0") || line.starts_with(b"G1")) {
        return false;
    }
    match line.get(2) {
        Some(b) => !b.is_ascii_digit() && *b != b'.',
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn run(input: &str) -> String {
        let mut output = Vec::new();
        transform(Cursor::new(input), &mut output, &Config::default()).expect("transform");
        String::from_utf8(output).expect("ascii output")
    }

    #[test]
    fn test_annotation_inserted_after_path_comment() {
        let input = "; 'Loop Path', 1.0 [feed mm/s], 1.0 [head mm/s]\n";
        assert_eq!(
            run(input),
            "; 'Loop Path', 1.0 [feed mm/s], 1.0 [head mm/s]\n;segType:Loop\n"
        );
    }

    #[test]
    fn test_unknown_label_passes_through_unannotated() {
        let input = "; 'Destring Path', 1.0 [feed mm/s], 1.0 [head mm/s]\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_unrecognized_lines_round_trip() {
        let input = "M104 S210\n; plain comment\nT0\nG28 ; home\n\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_g10_is_not_a_motion_command() {
        assert!(is_motion_line(b"G0 X1\n"));
        assert!(is_motion_line(b"G1 X1\n"));
        assert!(is_motion_line(b"G1\n"));
        assert!(is_motion_line(b"G1"));
        assert!(!is_motion_line(b"G10 P0\n"));
        assert!(!is_motion_line(b"G1.5 X1\n"));
        assert!(!is_motion_line(b"G28\n"));
        assert!(!is_motion_line(b"M104 S210\n"));
    }

    #[test]
    fn test_motion_lines_are_normalized() {
        // Short segment below the default 2-unit threshold gets the
        // default 900 feedrate floor.
        let input = "G1 X1 Y0 F500\n";
        assert_eq!(run(input), "G1 X1 Y0 F900\n");
    }

    #[test]
    fn test_reprocessing_is_idempotent() {
        let input = "\
; 'Perimeter Path', 2.0 [feed mm/s], 10.0 [head mm/s]\n\
G1 X10 Y0 F1200\n\
; 'Solid Path', 2.0 [feed mm/s], 10.0 [head mm/s]\n\
G1 X20 Y0 F1200\n";
        let once = run(input);
        let twice = run(&once);
        assert_eq!(once, twice);
        assert_eq!(once.matches(";segType:").count(), 2);
    }

    #[test]
    fn test_stale_annotations_only_skipped_after_first_match() {
        // A leading ;segType: line before any recognized path comment is
        // foreign content and must survive.
        let input = ";segType:Loop\nM104 S210\n";
        assert_eq!(run(input), input);
    }

    #[test]
    fn test_stats_count_lines_and_annotations() {
        let input = "; 'Skirt Path', 1.0 [feed mm/s], 1.0 [head mm/s]\nM104 S210\n";
        let mut output = Vec::new();
        let stats =
            transform(Cursor::new(input), &mut output, &Config::default()).expect("transform");
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.annotations, 1);
    }

    #[test]
    fn test_overlong_line_is_rejected() {
        let mut input = vec![b'X'; MAX_LINE_LEN + 1];
        input.push(b'\n');
        let mut output = Vec::new();
        let result = transform(Cursor::new(input), &mut output, &Config::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_final_line_without_terminator() {
        assert_eq!(run("M104 S210"), "M104 S210");
        assert_eq!(run("G1 X1 Y0 F500"), "G1 X1 Y0 F900");
    }

    #[test]
    fn test_tmp_path_is_sibling_of_input() {
        let tmp = tmp_path_for(Path::new("/prints/benchy.gcode"));
        assert_eq!(tmp, PathBuf::from("/prints/benchy.gcode.tmp"));
    }
}

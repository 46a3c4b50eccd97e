//! Feedrate normalization for short segments ("bang removal").
//!
//! Tracks position and feedrate state across the motion lines of one file
//! and rewrites each `G0`/`G1` line so that:
//! - segments shorter than the configured minimum length never run slower
//!   than the configured minimum feedrate, and
//! - a feedrate token is omitted when its value is already in effect, and
//!   re-emitted whenever the effective value changes.

use std::io::{self, Write};

use crate::config::Config;

/// Per-file normalizer state.
///
/// GCODE is modal: axes and feedrate keep their last commanded value, so
/// `x`, `y` and `feed` carry over to lines that omit them. `written` is the
/// last feedrate actually emitted to the output and only changes when a
/// token is written.
#[derive(Debug)]
pub struct FeedrateNormalizer {
    x: f64,
    y: f64,
    feed: f64,
    written: f64,
    min_feedrate: f64,
    min_length_sq: f64,
}

impl FeedrateNormalizer {
    pub fn new(config: &Config) -> Self {
        FeedrateNormalizer {
            x: 0.0,
            y: 0.0,
            feed: 0.0,
            written: 0.0,
            min_feedrate: config.min_feedrate,
            min_length_sq: config.min_length * config.min_length,
        }
    }

    /// Rewrite one motion-command line and write it to `out`.
    ///
    /// The caller has already established that `line` is a `G0`/`G1`
    /// command; this method owns writing the line (possibly preceded or
    /// followed by synthetic `G1 F<min>` lines).
    pub fn process_line(&mut self, line: &[u8], out: &mut dyn Write) -> io::Result<()> {
        let mut x = self.x;
        let mut y = self.y;
        let mut feed = self.feed;
        let mut have_ez = false;
        let mut feed_span: Option<(usize, usize)> = None;

        // Scan parameter fields up to a comment or the line terminator.
        let mut i = 0;
        while i < line.len() {
            let c = line[i];
            if c == b';' || c == b'\r' || c == b'\n' {
                break;
            }
            i += 1;
            match c {
                b'X' => {
                    let (value, len) = scan_number(&line[i..]);
                    x = value;
                    i += len;
                }
                b'Y' => {
                    let (value, len) = scan_number(&line[i..]);
                    y = value;
                    i += len;
                }
                b'E' | b'Z' => have_ez = true,
                b'F' => {
                    let start = i - 1;
                    let (value, len) = scan_number(&line[i..]);
                    feed = value;
                    i += len;
                    feed_span = Some((start, i));
                }
                _ => {}
            }
        }

        let dx = x - self.x;
        let dy = y - self.y;

        // Position and modal feedrate update regardless of which branch
        // fires below.
        self.x = x;
        self.y = y;
        self.feed = feed;

        let length_sq = dx * dx + dy * dy;
        let mut effective = feed;

        if length_sq < self.min_length_sq && self.min_feedrate > feed {
            if have_ez && length_sq == 0.0 {
                // Zero-length extrusion or Z move: the line itself cannot
                // carry the clamped feedrate without disturbing the move,
                // so bracket it with standalone feedrate commands.
                if self.written != self.min_feedrate {
                    writeln!(out, "G1 F{}", self.min_feedrate)?;
                }
                out.write_all(line)?;
                writeln!(out, "G1 F{}", self.min_feedrate)?;
                self.written = self.min_feedrate;
                return Ok(());
            }
            effective = self.min_feedrate;
        }

        // Widen the token span to swallow one preceding space.
        let feed_span = feed_span.map(|(start, end)| {
            if start > 0 && line[start - 1] == b' ' {
                (start - 1, end)
            } else {
                (start, end)
            }
        });

        match feed_span {
            // Redundant token: drop it ("bang removal").
            Some((start, end)) if effective == self.written => {
                out.write_all(&line[..start])?;
                out.write_all(&line[end..])?;
            }
            _ => {
                let (start, end) = match feed_span {
                    Some(span) => {
                        self.written = feed;
                        span
                    }
                    // No token on the line: insert where the scan stopped,
                    // before any comment.
                    None => (i, i),
                };
                if effective != self.written {
                    out.write_all(&line[..start])?;
                    write!(out, " F{}", effective)?;
                    out.write_all(&line[end..])?;
                    self.written = effective;
                } else {
                    out.write_all(line)?;
                }
            }
        }

        Ok(())
    }
}

/// Parse a decimal number at the start of `bytes`, with an optional
/// exponent suffix.
///
/// Returns the value and the number of bytes consumed. A field that does
/// not start with a number yields `(0.0, 0)`; GCODE tolerance is
/// permissive, so malformed fields never abort processing.
fn scan_number(bytes: &[u8]) -> (f64, usize) {
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let mut seen_digit = false;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        seen_digit = true;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            seen_digit = true;
        }
    }
    if !seen_digit {
        return (0.0, 0);
    }

    // Exponent, only consumed when at least one digit follows; a bare
    // trailing "e" stays in the line as a separate field.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }

    // The span is ASCII digits, sign and dot, so both conversions succeed.
    match std::str::from_utf8(&bytes[..end])
        .ok()
        .and_then(|text| text.parse::<f64>().ok())
    {
        Some(value) => (value, end),
        None => (0.0, 0),
    }
}

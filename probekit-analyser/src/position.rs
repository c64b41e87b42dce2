use std::fmt;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::error::AnalyseError;

/// Largest index on either axis of the sensor grid.
pub const GRID_MAX: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Coordinate {
    pub x: i64,
    pub y: i64,
}

impl Coordinate {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Both indices even and inside `0..=GRID_MAX`.
    pub fn is_addressable(&self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|&v| (0..=GRID_MAX).contains(&v) && v % 2 == 0)
    }

    /// Parses `"x,y"` where each component is float text truncated toward zero.
    ///
    /// `line` is only used for error reporting.
    pub fn parse(text: &str, line: usize) -> Result<Self, AnalyseError> {
        let malformed = || AnalyseError::MalformedCoordinate {
            line,
            text: text.to_string(),
        };

        let components = text
            .split(',')
            .map(|c| c.trim().parse::<f64>().ok().filter(|v| v.is_finite()))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(malformed)?;

        match components[..] {
            [x, y] => Ok(Self::new(x.trunc() as i64, y.trunc() as i64)),
            _ => Err(malformed()),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

/// A capture line carrying a coordinate, with any hit prefix removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    /// 1-based line number in the capture log.
    pub line: usize,
    pub content: String,
}

impl Hit {
    /// Coordinate text is everything before `content_separator`, trimmed.
    pub fn coordinate(&self, content_separator: &str) -> Result<Coordinate, AnalyseError> {
        let prefix = self
            .content
            .split(content_separator)
            .next()
            .unwrap_or_default();

        Coordinate::parse(prefix.trim(), self.line)
    }
}

/// Collects lines whose first space-separated token equals `marker`.
pub fn extract_hits<I, S>(lines: I, marker: &str) -> Vec<Hit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.as_ref().trim_end_matches(['\r', '\n']);
            let mut parts = line.splitn(3, ' ');
            if parts.next()? != marker {
                return None;
            }
            let _tag = parts.next();

            Some(Hit {
                line: i + 1,
                content: parts.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Takes every non-blank line whole, for logs that hold nothing but
/// `x,y<separator>payload` lines.
pub fn extract_lines<I, S>(lines: I) -> Vec<Hit>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
{
    lines
        .into_iter()
        .enumerate()
        .filter_map(|(i, line)| {
            let line = line.as_ref().trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                return None;
            }

            Some(Hit {
                line: i + 1,
                content: line.to_string(),
            })
        })
        .collect()
}

fn read_log(path: &Path) -> Result<String, AnalyseError> {
    fs::read_to_string(path).map_err(|source| AnalyseError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_hits<P: AsRef<Path>>(path: P, marker: &str) -> Result<Vec<Hit>, AnalyseError> {
    Ok(extract_hits(read_log(path.as_ref())?.lines(), marker))
}

pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<Hit>, AnalyseError> {
    Ok(extract_lines(read_log(path.as_ref())?.lines()))
}

/// Parses every hit's coordinate in order; the first malformed one aborts.
pub fn parse_positions(hits: &[Hit], content_separator: &str) -> Result<Vec<Coordinate>, AnalyseError> {
    hits.iter().map(|hit| hit.coordinate(content_separator)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_truncates_floats() -> Result<(), AnalyseError> {
        assert_eq!(Coordinate::parse("2.0,4.9", 1)?, Coordinate::new(2, 4));
        assert_eq!(Coordinate::parse(" 6 , 0.0 ", 1)?, Coordinate::new(6, 0));
        assert_eq!(Coordinate::parse("-0.5,10.2", 1)?, Coordinate::new(0, 10));

        Ok(())
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        let err = Coordinate::parse("x,4", 7).unwrap_err();
        match err {
            AnalyseError::MalformedCoordinate { line, text } => {
                assert_eq!(line, 7);
                assert_eq!(text, "x,4");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(Coordinate::parse("2,4,6", 1).is_err());
        assert!(Coordinate::parse("2", 1).is_err());
        assert!(Coordinate::parse("", 1).is_err());
        assert!(Coordinate::parse("nan,2", 1).is_err());
    }

    #[test]
    fn test_addressable() {
        assert!(Coordinate::new(0, 10).is_addressable());
        assert!(!Coordinate::new(3, 4).is_addressable());
        assert!(!Coordinate::new(12, 4).is_addressable());
        assert!(!Coordinate::new(-2, 4).is_addressable());
    }

    #[test]
    fn test_extract_hits_and_positions() -> Result<(), AnalyseError> {
        let log = [
            "hit 0001 2.0,4.0 ||payload one\n",
            "miss 0002 8.0,8.0 ||payload two\n",
            "hit 0003 6.0,0.0 ||payload three\n",
        ];

        let hits = extract_hits(log, "hit");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].line, 1);
        assert_eq!(hits[0].content, "2.0,4.0 ||payload one");
        assert_eq!(hits[1].line, 3);

        let positions = parse_positions(&hits, "||")?;
        assert_eq!(positions, vec![Coordinate::new(2, 4), Coordinate::new(6, 0)]);

        Ok(())
    }

    #[test]
    fn test_corrupt_hit_aborts_positions() {
        let hits = extract_hits(["hit 1 2.0,4.0 ||ok", "hit 2 x,4 ||bad"], "hit");
        let err = parse_positions(&hits, "||").unwrap_err();

        assert!(matches!(err, AnalyseError::MalformedCoordinate { line: 2, .. }));
    }

    #[test]
    fn test_coordinate_lines_with_single_bar() -> Result<(), AnalyseError> {
        let log = ["2.0,4.0|room/1 on\n", "\n", "6.0,0.0|room/2 || on\n"];

        let lines = extract_lines(log);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].content, "2.0,4.0|room/1 on");
        assert_eq!(lines[1].line, 3);

        let positions = parse_positions(&lines, "|")?;
        assert_eq!(positions, vec![Coordinate::new(2, 4), Coordinate::new(6, 0)]);

        Ok(())
    }

    #[test]
    fn test_corrupt_coordinate_line_aborts() {
        let lines = extract_lines(["2.0,4.0|ok", "room/3|bad"]);

        assert!(matches!(
            parse_positions(&lines, "|"),
            Err(AnalyseError::MalformedCoordinate { line: 2, .. })
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Coordinate::new(2, 4).to_string(), "[2, 4]");
    }
}

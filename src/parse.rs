use crate::error::{Error, Result};
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// A corrected coordinate on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Adjacent pairs are written back to back (`[1,2],[3,4]`), so the comma
/// between them is ambiguous with the comma inside a pair.
static PAIR_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\]\)])\s*,\s*([\[\(])").expect("valid boundary pattern")
});

/// Parse a whole coordinate file into raw pairs, in file order.
pub fn parse_coordinates(text: &str) -> Result<Vec<[f64; 2]>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }

    split_pairs(text)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            parse_pair(chunk).map_err(|reason| Error::Parse {
                chunk: i + 1,
                text: chunk.to_string(),
                reason,
            })
        })
        .collect()
}

/// Cut the text at each pair boundary, keeping the closing bracket with the
/// pair before it and the opening bracket with the pair after it. Only a
/// bracket, comma, bracket run separates pairs; any other text stays inside
/// a chunk and fails there.
fn split_pairs(text: &str) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut start = 0;
    for m in PAIR_BOUNDARY.find_iter(text) {
        // both brackets are single-byte
        chunks.push(&text[start..m.start() + 1]);
        start = m.end() - 1;
    }
    chunks.push(&text[start..]);
    chunks
}

/// Read and parse the coordinate file.
pub fn load_coordinates(path: &Path) -> Result<Vec<[f64; 2]>> {
    info!("Loading coordinates from {:?}...", path);
    let text = fs::read_to_string(path)?;
    let pairs = parse_coordinates(&text)?;
    info!("Parsed {} coordinate pairs", pairs.len());
    Ok(pairs)
}

/// Swap the two components of every pair; the file stores them as (y, x).
pub fn swap_axes(pairs: &mut [[f64; 2]]) {
    for pair in pairs.iter_mut() {
        pair.swap(0, 1);
    }
}

pub fn into_points(pairs: &[[f64; 2]]) -> Vec<Point> {
    pairs.iter().map(|&[x, y]| Point { x, y }).collect()
}

/// Literal `[a,b]` or `(a,b)` with exactly two finite numbers.
fn parse_pair(chunk: &str) -> std::result::Result<[f64; 2], String> {
    let chunk = chunk.trim();
    let inner = match (chunk.chars().next(), chunk.chars().last()) {
        (Some('['), Some(']')) | (Some('('), Some(')')) if chunk.len() >= 2 => {
            &chunk[1..chunk.len() - 1]
        }
        _ => return Err("expected a bracketed pair".to_string()),
    };

    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("expected 2 numbers, found {}", parts.len()));
    }

    let a = parse_number(parts[0])?;
    let b = parse_number(parts[1])?;
    Ok([a, b])
}

fn parse_number(token: &str) -> std::result::Result<f64, String> {
    let token = token.trim();
    // f64::from_str also accepts "inf" and "NaN", which are not literals
    let literal = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && token
            .trim_start_matches(['+', '-'])
            .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if !literal {
        return Err(format!("{:?} is not a number", token));
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        Ok(_) => Err(format!("{:?} is out of range", token)),
        Err(e) => {
            debug!("Rejected number {:?}: {}", token, e);
            Err(format!("{:?} is not a number", token))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_and_swaps_example() {
        let mut pairs = parse_coordinates("[1,2],[3,4],[5,6]").unwrap();
        assert_eq!(pairs, vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);

        swap_axes(&mut pairs);
        assert_eq!(pairs, vec![[2.0, 1.0], [4.0, 3.0], [6.0, 5.0]]);
    }

    #[test]
    fn swap_is_an_involution() {
        let original = vec![[12.5, -34.0], [0.0, 7.25], [-1.0, -1.0]];
        let mut pairs = original.clone();
        swap_axes(&mut pairs);
        swap_axes(&mut pairs);
        assert_eq!(pairs, original);
    }

    #[test]
    fn count_matches_bracketed_literals() {
        let text = (0..57)
            .map(|i| format!("[{},{}]", -(i as f64) * 1.5, i * 2))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(parse_coordinates(&text).unwrap().len(), 57);
    }

    #[test]
    fn accepts_whitespace_tuples_and_exponents() {
        let pairs = parse_coordinates(" [ -12.5 , 3e2 ], (4, +.5)\n").unwrap();
        assert_eq!(pairs, vec![[-12.5, 300.0], [4.0, 0.5]]);
    }

    #[test]
    fn empty_text_yields_no_pairs() {
        assert!(parse_coordinates("").unwrap().is_empty());
        assert!(parse_coordinates("  \n").unwrap().is_empty());
    }

    #[test]
    fn rejects_anything_but_numeric_literals() {
        for bad in [
            "[1,2],[3]",
            "[1,2,3]",
            "[1,2],[__import__('os'),4]",
            "[1+1,2]",
            "[inf,2]",
            "[1,nan]",
            "[1,2],",
            "[1,2)",
            "1,2",
            "[[1,2],[3,4]]",
        ] {
            assert!(parse_coordinates(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn only_comma_separates_pairs() {
        assert!(parse_coordinates("[1,2]\n[3,4]").is_err());
        assert!(parse_coordinates("[1,2] [3,4]").is_err());
        // line breaks inside a pair are plain whitespace
        let pairs = parse_coordinates("[1,\n2],\n[3,4]").unwrap();
        assert_eq!(pairs, vec![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn error_names_the_failing_chunk() {
        match parse_coordinates("[1,2],[3,x],[5,6]") {
            Err(Error::Parse { chunk, text, .. }) => {
                assert_eq!(chunk, 2);
                assert_eq!(text, "[3,x]");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[10,-20],[30,-40]").unwrap();
        let pairs = load_coordinates(file.path()).unwrap();
        let points = into_points(&pairs);
        assert_eq!(points[1], Point { x: 30.0, y: -40.0 });
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_coordinates(&dir.path().join("missing.txt"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}

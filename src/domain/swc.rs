//! SWC reconstruction format: parse tabular rows into a tree and write it back.
//!
//! Accepted input:
//! - `#` comment lines; a comment naming columns (`# id type x y z radius parent`)
//!   is used as header
//! - an optional plain header row (first non-comment row that is not numeric)
//! - whitespace and/or comma separated columns
//!
//! Without a header the standard order `n type x y z radius parent` applies.
//! `id` is a synonym for `n`, `pid` for `parent` and `r` for `radius`.

use std::fmt::Write as _;

use glam::DVec3;
use itertools::Itertools;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::domain::builder::TreeBuilder;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::node::{Node, NodeId, StructureType};
use crate::domain::tree::Tree;

const COLUMNS: [&str; 7] = ["n", "type", "x", "y", "z", "radius", "parent"];

/// Column positions resolved from a header (or the SWC default order).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    n: usize,
    kind: usize,
    x: usize,
    y: usize,
    z: usize,
    radius: usize,
    parent: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            n: 0,
            kind: 1,
            x: 2,
            y: 3,
            z: 4,
            radius: 5,
            parent: 6,
        }
    }
}

impl ColumnMap {
    /// Resolve a header row; `None` unless every column is named.
    fn from_header(names: &[&str]) -> Option<Self> {
        let find = |aliases: &[&str]| {
            names
                .iter()
                .position(|name| aliases.iter().any(|a| name.eq_ignore_ascii_case(a)))
        };
        Some(Self {
            n: find(&["n", "id"])?,
            kind: find(&["type", "t"])?,
            x: find(&["x"])?,
            y: find(&["y"])?,
            z: find(&["z"])?,
            radius: find(&["radius", "r"])?,
            parent: find(&["parent", "pid"])?,
        })
    }

    fn width(&self) -> usize {
        [
            self.n,
            self.kind,
            self.x,
            self.y,
            self.z,
            self.radius,
            self.parent,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
            + 1
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|f| !f.is_empty())
        .collect()
}

fn is_numeric_row(fields: &[&str]) -> bool {
    fields.first().is_some_and(|f| f.parse::<f64>().is_ok())
}

/// Parse SWC text into flat node records, without checking tree invariants.
#[instrument(level = "debug", skip_all)]
pub fn parse_records(content: &str) -> DomainResult<Vec<Node>> {
    let mut columns: Option<ColumnMap> = None;
    let mut records = Vec::new();

    for (line_no, raw) in content.lines().enumerate() {
        let line_no = line_no + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(comment) = trimmed.strip_prefix('#') {
            if records.is_empty() && columns.is_none() {
                columns = ColumnMap::from_header(&split_fields(comment));
            }
            continue;
        }

        let fields = split_fields(trimmed);
        if !is_numeric_row(&fields) {
            if records.is_empty() && columns.is_none() {
                if let Some(map) = ColumnMap::from_header(&fields) {
                    columns = Some(map);
                    continue;
                }
            }
            return Err(DomainError::parse(line_no, format!("unexpected row: {trimmed}")));
        }

        let map = *columns.get_or_insert_with(ColumnMap::default);
        if fields.len() < map.width() {
            return Err(DomainError::parse(
                line_no,
                format!("expected {} columns, found {}", map.width(), fields.len()),
            ));
        }
        records.push(parse_row(&fields, &map, line_no)?);
    }

    debug!("parsed {} records", records.len());
    Ok(records)
}

fn parse_row(fields: &[&str], map: &ColumnMap, line_no: usize) -> DomainResult<Node> {
    let float = |idx: usize, name: &str| -> DomainResult<f64> {
        fields[idx]
            .parse::<f64>()
            .map_err(|e| DomainError::parse(line_no, format!("{name}: {e}")))
    };
    // Some tracers write integer columns as floats ("12.0")
    let integer = |idx: usize, name: &str| -> DomainResult<i64> {
        if let Ok(value) = fields[idx].parse::<i64>() {
            return Ok(value);
        }
        let value = float(idx, name)?;
        if value.fract() != 0.0 {
            return Err(DomainError::parse(
                line_no,
                format!("{name}: expected an integer, found {value}"),
            ));
        }
        // i64::MAX is not representable, so the upper bound is exclusive
        if value < i64::MIN as f64 || value >= i64::MAX as f64 {
            return Err(DomainError::parse(
                line_no,
                format!("{name}: {value} out of range"),
            ));
        }
        Ok(value as i64)
    };

    let id = integer(map.n, "n")?;
    let code = integer(map.kind, "type")?;
    let code = i32::try_from(code)
        .map_err(|_| DomainError::parse(line_no, format!("type: code {code} out of range")))?;
    let parent = integer(map.parent, "parent")?;
    Ok(Node {
        id: NodeId(id),
        kind: StructureType::from_code(code),
        position: DVec3::new(float(map.x, "x")?, float(map.y, "y")?, float(map.z, "z")?),
        radius: float(map.radius, "radius")?,
        parent: (parent >= 0).then_some(NodeId(parent)),
    })
}

/// Parse SWC text into a validated tree.
pub fn parse(content: &str) -> DomainResult<Tree> {
    let records = parse_records(content)?;
    TreeBuilder::new().build(records)
}

/// Serialize a tree to SWC text, one row per node in ascending id order.
pub fn to_swc(tree: &Tree) -> String {
    let mut out = format!("# {}\n", COLUMNS.iter().join(" "));
    for node in tree.nodes() {
        let parent = node.parent.map(|p| p.0).unwrap_or(-1);
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {}",
            node.id,
            node.kind.code(),
            node.position.x,
            node.position.y,
            node.position.z,
            node.radius,
            parent
        );
    }
    out
}

/// SHA-256 of the SWC serialization, hex encoded.
///
/// Equal fingerprints mean byte-identical output, which is how repeated
/// seeded runs are compared.
pub fn fingerprint(tree: &Tree) -> String {
    hex::encode(Sha256::digest(to_swc(tree).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::MalformedInput;
    use rstest::rstest;

    const NEURON: &str = "\
# a small reconstruction
1 1 0.0 0.0 0.0 5.0 -1
2 3 10.0 0.0 0.0 1.0 1
3 3 20.0 5.0 0.0 0.8 2
4 3 20.0 -5.0 0.0 0.8 2
5 2 -10.0 0.0 0.0 0.5 1
";

    #[test]
    fn given_standard_swc_when_parsing_then_builds_tree() {
        let tree = parse(NEURON).unwrap();
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.root_id(), NodeId(1));
        assert_eq!(tree.root().kind, StructureType::Soma);
        assert_eq!(tree.get(NodeId(5)).unwrap().kind, StructureType::Axon);
        assert_eq!(tree.child_count(NodeId(2)), 2);
    }

    #[test]
    fn given_written_swc_when_parsing_again_then_equal_tree() {
        let tree = parse(NEURON).unwrap();
        let again = parse(&to_swc(&tree)).unwrap();
        assert_eq!(tree, again);
        assert_eq!(fingerprint(&tree), fingerprint(&again));
    }

    #[test]
    fn given_csv_with_id_header_when_parsing_then_maps_columns_by_name() {
        let csv = "\
id,parent,type,x,y,z,radius
1,-1,1,0,0,0,3
2,1,3,1,2,3,0.5
";
        let tree = parse(csv).unwrap();
        let node = tree.get(NodeId(2)).unwrap();
        assert_eq!(node.parent, Some(NodeId(1)));
        assert_eq!(node.position, DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(node.radius, 0.5);
    }

    #[test]
    fn given_float_ids_when_parsing_then_accepts_integral_values() {
        let tree = parse("1.0 1 0 0 0 1 -1.0\n2.0 3 1 0 0 1 1.0\n").unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn given_short_row_when_parsing_then_reports_line() {
        let err = parse("1 1 0 0 0 1 -1\n2 3 1 0\n").unwrap_err();
        assert!(matches!(err, DomainError::Parse { line: 2, .. }));
    }

    #[test]
    fn given_two_roots_when_parsing_then_malformed() {
        let err = parse("1 1 0 0 0 1 -1\n2 1 0 0 0 1 -1\n").unwrap_err();
        assert!(matches!(
            err,
            DomainError::MalformedInput(MalformedInput::MultipleRoots(_))
        ));
    }

    #[test]
    fn given_type_code_beyond_i32_when_parsing_then_parse_error() {
        let err = parse("1 4294967297 0 0 0 1 -1\n").unwrap_err();
        assert!(
            matches!(&err, DomainError::Parse { line: 1, message } if message.contains("type")),
            "got {err:?}"
        );
    }

    #[rstest]
    #[case::exponent("1e20")]
    #[case::long_digits("99999999999999999999")]
    #[case::negative("-1e30")]
    fn given_id_beyond_i64_when_parsing_then_parse_error(#[case] id: &str) {
        let err = parse(&format!("{id} 1 0 0 0 1 -1\n")).unwrap_err();
        match err {
            DomainError::Parse { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("out of range"), "got {message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn given_id_above_f64_precision_when_parsing_then_exact() {
        let tree = parse("9007199254740993 1 0 0 0 1 -1\n").unwrap();
        assert_eq!(tree.root_id(), NodeId(9007199254740993));
    }
}

//! SWC morphology format
//!
//! One sample per line: `id type x y z radius parent`, `#` starts a comment.
//! Samples of type 1 form the soma. Neurite samples are cut into sections at
//! branch points; every child section repeats the branch point as its first
//! point, so section continuity holds in the in-memory tree.

use std::collections::HashMap;
use std::fmt::Write as _;

use generational_arena::Index;
use thiserror::Error;

use crate::domain::{DomainError, Morphology, Point, SectionType, Soma};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SwcError {
    #[error("line {line}: expected 7 fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("line {line}: invalid {field} value '{value}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("line {line}: duplicate sample id {id}")]
    DuplicateId { line: usize, id: i64 },

    #[error("line {line}: parent {parent} of sample {id} is not defined before it")]
    UnknownParent { line: usize, id: i64, parent: i64 },

    #[error("line {line}: soma sample {id} attached to a neurite")]
    SomaUnderNeurite { line: usize, id: i64 },

    #[error("invalid structure: {0}")]
    Structure(#[from] DomainError),
}

#[derive(Debug, Clone)]
struct Sample {
    section_type: SectionType,
    point: Point,
    radius: f64,
    /// Position of the parent in the sample list.
    parent: Option<usize>,
}

fn parse_field<T: std::str::FromStr>(
    value: &str,
    line: usize,
    field: &'static str,
) -> Result<T, SwcError> {
    value.parse().map_err(|_| SwcError::InvalidNumber {
        line,
        field,
        value: value.to_string(),
    })
}

fn parse_samples(content: &str) -> Result<Vec<Sample>, SwcError> {
    let mut samples: Vec<Sample> = Vec::new();
    let mut positions: HashMap<i64, usize> = HashMap::new();

    for (i, raw) in content.lines().enumerate() {
        let line = i + 1;
        let data = raw.split('#').next().unwrap_or("").trim();
        if data.is_empty() {
            continue;
        }
        let fields: Vec<&str> = data.split_whitespace().collect();
        if fields.len() != 7 {
            return Err(SwcError::FieldCount {
                line,
                found: fields.len(),
            });
        }

        let id: i64 = parse_field(fields[0], line, "id")?;
        let code: i32 = parse_field(fields[1], line, "type")?;
        let x: f64 = parse_field(fields[2], line, "x")?;
        let y: f64 = parse_field(fields[3], line, "y")?;
        let z: f64 = parse_field(fields[4], line, "z")?;
        let radius: f64 = parse_field(fields[5], line, "radius")?;
        let parent_id: i64 = parse_field(fields[6], line, "parent")?;

        if positions.contains_key(&id) {
            return Err(SwcError::DuplicateId { line, id });
        }
        let parent = if parent_id < 0 {
            None
        } else {
            Some(
                *positions
                    .get(&parent_id)
                    .ok_or(SwcError::UnknownParent {
                        line,
                        id,
                        parent: parent_id,
                    })?,
            )
        };

        let section_type = SectionType::from_code(code);
        if section_type == SectionType::Soma {
            if let Some(p) = parent {
                if samples[p].section_type != SectionType::Soma {
                    return Err(SwcError::SomaUnderNeurite { line, id });
                }
            }
        }

        positions.insert(id, samples.len());
        samples.push(Sample {
            section_type,
            point: Point::new(x, y, z),
            radius,
            parent,
        });
    }
    Ok(samples)
}

/// Parse SWC text into a section tree.
pub fn parse(content: &str) -> Result<Morphology, SwcError> {
    let samples = parse_samples(content)?;

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); samples.len()];
    for (pos, sample) in samples.iter().enumerate() {
        if let Some(parent) = sample.parent {
            children[parent].push(pos);
        }
    }

    let is_soma = |pos: usize| samples[pos].section_type == SectionType::Soma;

    let mut soma = Soma::default();
    for sample in samples.iter().filter(|s| s.section_type == SectionType::Soma) {
        soma.points.push(sample.point);
        soma.radii.push(sample.radius);
    }
    let mut morph = Morphology::with_soma(soma);

    // (first sample of the section, branch point to prepend, parent section)
    let mut pending: Vec<(usize, Option<usize>, Option<Index>)> = samples
        .iter()
        .enumerate()
        .filter(|(pos, s)| !is_soma(*pos) && s.parent.map_or(true, is_soma))
        .map(|(pos, _)| (pos, None, None))
        .rev()
        .collect();

    while let Some((start, branch_point, parent_section)) = pending.pop() {
        let mut points = Vec::new();
        let mut radii = Vec::new();
        if let Some(bp) = branch_point {
            points.push(samples[bp].point);
            radii.push(samples[bp].radius);
        }

        let mut current = start;
        loop {
            points.push(samples[current].point);
            radii.push(samples[current].radius);
            match children[current].as_slice() {
                [only] => current = *only,
                _ => break,
            }
        }

        let section_type = samples[start].section_type;
        let idx = match parent_section {
            None => morph.append_root_section(section_type, points, radii)?,
            Some(parent) => morph.append_section(parent, section_type, points, radii)?,
        };

        for &child in children[current].iter().rev() {
            pending.push((child, Some(current), Some(idx)));
        }
    }

    Ok(morph)
}

/// Render a section tree as SWC text.
///
/// Samples are renumbered from 1, soma first. Root sections attach to the
/// first soma sample; the repeated branch point of child sections is dropped.
pub fn render(morph: &Morphology) -> String {
    let mut out = String::from("# id type x y z radius parent\n");
    let mut next_id: i64 = 1;

    let mut emit = |out: &mut String, code: i32, point: &Point, radius: f64, parent: i64| {
        let id = next_id;
        next_id += 1;
        // Writing into a String cannot fail
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {}",
            id, code, point.x, point.y, point.z, radius, parent
        );
        id
    };

    let soma = morph.soma();
    let mut soma_root = -1;
    let mut previous = -1;
    for (point, radius) in soma.points.iter().zip(&soma.radii) {
        previous = emit(&mut out, SectionType::Soma.code(), point, *radius, previous);
        if soma_root < 0 {
            soma_root = previous;
        }
    }

    let mut last_ids: HashMap<Index, i64> = HashMap::new();
    for (idx, section) in morph.iter() {
        let (skip, mut parent_id) = match section.parent() {
            None => (0, soma_root),
            Some(parent) => (1, last_ids.get(&parent).copied().unwrap_or(soma_root)),
        };
        let code = section.section_type().code();
        for (point, radius) in section.points().iter().zip(section.radii()).skip(skip) {
            parent_id = emit(&mut out, code, point, *radius, parent_id);
        }
        last_ids.insert(idx, parent_id);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORK: &str = "\
# soma and a bifurcating dendrite
1 1 0 0 0 5 -1
2 3 0 5 0 1 1
3 3 0 10 0 1 2
4 3 -3 13 0 0.5 3
5 3 -6 16 0 0.5 4
6 3 3 13 0 0.5 3
";

    #[test]
    fn given_bifurcation_when_parsing_then_builds_three_sections() {
        let morph = parse(FORK).unwrap();

        assert_eq!(morph.soma().points, vec![Point::new(0.0, 0.0, 0.0)]);
        assert_eq!(morph.section_count(), 3);
        assert_eq!(morph.roots().len(), 1);

        let sections: Vec<_> = morph.iter().map(|(_, s)| s).collect();
        assert_eq!(
            sections[0].points(),
            &[Point::new(0.0, 5.0, 0.0), Point::new(0.0, 10.0, 0.0)]
        );
        assert_eq!(sections[0].section_type(), SectionType::BasalDendrite);
        // Children start with the branch point
        assert_eq!(sections[1].points()[0], Point::new(0.0, 10.0, 0.0));
        assert_eq!(sections[1].points().len(), 3);
        assert_eq!(sections[2].points(), &[Point::new(0.0, 10.0, 0.0), Point::new(3.0, 13.0, 0.0)]);
        assert_eq!(sections[2].radii(), &[1.0, 0.5]);
    }

    #[test]
    fn given_parsed_tree_when_rendering_then_reparses_to_same_shape() {
        let morph = parse(FORK).unwrap();

        let again = parse(&render(&morph)).unwrap();

        assert_eq!(again.section_count(), morph.section_count());
        assert_eq!(again.point_count(), morph.point_count());
        for ((_, a), (_, b)) in again.iter().zip(morph.iter()) {
            assert_eq!(a.points(), b.points());
            assert_eq!(a.radii(), b.radii());
            assert_eq!(a.children().len(), b.children().len());
        }
    }

    #[test]
    fn given_parsed_tree_when_rendering_then_drops_branch_point_duplicates() {
        let rendered = render(&parse(FORK).unwrap());

        let samples = rendered.lines().filter(|l| !l.starts_with('#')).count();
        assert_eq!(samples, 6);
    }

    #[test]
    fn given_wrong_field_count_when_parsing_then_reports_line() {
        let result = parse("1 1 0 0 0 5 -1\n2 3 0 5 0 1\n");

        assert_eq!(result.unwrap_err(), SwcError::FieldCount { line: 2, found: 6 });
    }

    #[test]
    fn given_garbage_number_when_parsing_then_fails() {
        let result = parse("1 1 0 zero 0 5 -1\n");

        assert!(matches!(
            result.unwrap_err(),
            SwcError::InvalidNumber { line: 1, field: "y", .. }
        ));
    }

    #[test]
    fn given_forward_parent_when_parsing_then_fails() {
        let result = parse("1 3 0 0 0 1 2\n2 3 0 1 0 1 -1\n");

        assert_eq!(
            result.unwrap_err(),
            SwcError::UnknownParent {
                line: 1,
                id: 1,
                parent: 2
            }
        );
    }

    #[test]
    fn given_duplicate_id_when_parsing_then_fails() {
        let result = parse("1 1 0 0 0 5 -1\n1 3 0 5 0 1 1\n");

        assert_eq!(result.unwrap_err(), SwcError::DuplicateId { line: 2, id: 1 });
    }

    #[test]
    fn given_soma_sample_below_neurite_when_parsing_then_fails() {
        let result = parse("1 3 0 0 0 1 -1\n2 1 0 1 0 1 1\n");

        assert_eq!(result.unwrap_err(), SwcError::SomaUnderNeurite { line: 2, id: 2 });
    }

    #[test]
    fn given_neurite_without_soma_when_parsing_then_becomes_root() {
        let morph = parse("1 2 0 0 0 1 -1\n2 2 1 0 0 1 1\n3 2 2 0 0 1 2\n").unwrap();

        assert!(morph.soma().is_empty());
        assert_eq!(morph.section_count(), 1);
        assert!(render(&morph).contains("1 2 0 0 0 1 -1"));
    }
}

//! Unravelling: re-expanding segments shrunk by slicing and dehydration.
//!
//! Each segment direction is replaced by the principal direction of a sliding
//! window of original points around it. Segment lengths are preserved and each
//! new segment starts where the previously unravelled one ended, so the tree
//! stays connected while its shape changes.

use std::ops::Range;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::morphology::{Morphology, Point};
use crate::domain::principal::principal_direction;

pub const DEFAULT_WINDOW_HALF_LENGTH: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnravelOptions {
    /// Number of segments on each side of the unravelled one used for
    /// direction estimation.
    pub window_half_length: usize,
}

impl Default for UnravelOptions {
    fn default() -> Self {
        Self {
            window_half_length: DEFAULT_WINDOW_HALF_LENGTH,
        }
    }
}

impl UnravelOptions {
    pub fn with_window_half_length(window_half_length: usize) -> Self {
        Self { window_half_length }
    }
}

/// Original-point window used for the segment ending at `center`.
///
/// The window is `[center - half - 1, center + half + 1)` clamped to the
/// section. It is skewed by one towards the section start; keep it that way,
/// unravelled coordinates depend on these exact bounds.
pub fn window_bounds(center: usize, point_count: usize, half_length: usize) -> Range<usize> {
    let start = center.saturating_sub(half_length + 1);
    let end = (center + half_length + 1).min(point_count);
    start..end
}

/// Unravel every section of `morphology` into a new morphology.
///
/// The input is left untouched. The result has the same sections, topology and
/// point counts; only coordinates differ. Any failure aborts the whole tree.
pub fn unravel(morphology: &Morphology, options: &UnravelOptions) -> DomainResult<Morphology> {
    let mut unravelled = morphology.clone();

    // Pre-order: a parent is always rewritten before its children read from it
    for (position, (idx, section)) in morphology.iter().enumerate() {
        let anchor = match section.parent() {
            None => section.points().first().copied(),
            Some(parent) => unravelled
                .section(parent)
                .ok_or(DomainError::SectionNotFound)?
                .points()
                .last()
                .copied(),
        }
        .ok_or(DomainError::EmptySection { section: position })?;

        let points = unravel_section(section.points(), anchor, options.window_half_length)
            .map_err(|e| match e {
                SectionFailure::Empty => DomainError::EmptySection { section: position },
                SectionFailure::NonFinite(point) => DomainError::NonFiniteCoordinate {
                    section: position,
                    point,
                },
            })?;
        unravelled.set_points(idx, points)?;
    }

    Ok(unravelled)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionFailure {
    Empty,
    /// Index of the first offending point.
    NonFinite(usize),
}

/// Unravel one polyline starting from `anchor`.
///
/// Point 0 of the result is `anchor`; point `i` is point `i - 1` plus the
/// windowed principal direction scaled to the length of original segment
/// `i - 1 -> i` and oriented along it. When the window has no spread the
/// original segment vector is used as direction.
pub fn unravel_section(
    points: &[Point],
    anchor: Point,
    half_length: usize,
) -> Result<Vec<Point>, SectionFailure> {
    if points.is_empty() {
        return Err(SectionFailure::Empty);
    }
    if let Some(bad) = points
        .iter()
        .position(|p| p.iter().any(|c| !c.is_finite()))
    {
        return Err(SectionFailure::NonFinite(bad));
    }
    if anchor.iter().any(|c| !c.is_finite()) {
        return Err(SectionFailure::NonFinite(0));
    }

    let point_count = points.len();
    let mut unravelled = Vec::with_capacity(point_count);
    unravelled.push(anchor);

    for center in 1..point_count {
        let previous = unravelled[center - 1];
        let segment = points[center] - points[center - 1];
        let length = segment.norm();
        if length == 0.0 {
            unravelled.push(previous);
            continue;
        }

        let window = &points[window_bounds(center, point_count, half_length)];
        let mut direction = principal_direction(window).unwrap_or(segment);
        direction *= length / direction.norm();

        // Orthogonal case keeps the sign as computed
        if segment.dot(&direction) < 0.0 {
            direction = -direction;
        }

        unravelled.push(previous + direction);
    }

    Ok(unravelled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::morphology::SectionType;
    use rstest::rstest;

    const EPS: f64 = 1e-9;

    fn pts(raw: &[[f64; 3]]) -> Vec<Point> {
        raw.iter().map(|p| Point::new(p[0], p[1], p[2])).collect()
    }

    fn assert_points_close(actual: &[Point], expected: &[Point]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).norm() < EPS, "{} != {}", a, e);
        }
    }

    #[rstest]
    #[case::first_segment(1, 10, 5, 0..7)]
    #[case::last_segment(9, 10, 5, 3..10)]
    #[case::interior(5, 20, 2, 2..8)]
    #[case::zero_half_length(4, 10, 0, 3..5)]
    #[case::tiny_section(1, 2, 5, 0..2)]
    fn given_center_when_computing_window_then_bounds_are_clamped(
        #[case] center: usize,
        #[case] point_count: usize,
        #[case] half_length: usize,
        #[case] expected: Range<usize>,
    ) {
        assert_eq!(window_bounds(center, point_count, half_length), expected);
    }

    #[test]
    fn given_any_center_when_computing_window_then_stays_inside_section() {
        for point_count in 2..12 {
            for half_length in 0..6 {
                for center in 1..point_count {
                    let window = window_bounds(center, point_count, half_length);
                    assert!(window.end <= point_count);
                    assert!(window.start < center && center < window.end);
                }
            }
        }
    }

    #[test]
    fn given_straight_line_when_unravelling_then_unchanged() {
        let points = pts(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
        ]);

        let result = unravel_section(&points, points[0], 1).unwrap();

        assert_points_close(&result, &points);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    #[case(50)]
    fn given_single_segment_when_unravelling_then_unchanged(#[case] half_length: usize) {
        let points = pts(&[[1.0, 2.0, 3.0], [4.0, -2.0, 3.5]]);

        let result = unravel_section(&points, points[0], half_length).unwrap();

        assert_points_close(&result, &points);
    }

    #[test]
    fn given_zero_half_length_when_unravelling_then_each_segment_keeps_its_direction() {
        // Two-point windows reproduce each segment exactly
        let points = pts(&[
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 1.0, 1.0],
        ]);

        let result = unravel_section(&points, points[0], 0).unwrap();

        assert_points_close(&result, &points);
    }

    #[test]
    fn given_zigzag_when_unravelling_then_segment_lengths_are_preserved() {
        let points = pts(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.8, 0.0],
            [2.0, -0.7, 0.1],
            [3.0, 0.9, -0.2],
            [4.0, -0.6, 0.0],
            [5.0, 0.5, 0.3],
        ]);

        let result = unravel_section(&points, points[0], 2).unwrap();

        for i in 1..points.len() {
            let original = (points[i] - points[i - 1]).norm();
            let new = (result[i] - result[i - 1]).norm();
            assert!((original - new).abs() < EPS);
        }
        // The zigzag is straightened along x
        assert!(result[5].x > points[5].x);
    }

    #[test]
    fn given_anchor_when_unravelling_then_section_is_translated_onto_it() {
        let points = pts(&[[0.0, 0.0, 0.0], [0.0, 0.0, 2.0], [0.0, 0.0, 4.0]]);
        let anchor = Point::new(10.0, 10.0, 10.0);

        let result = unravel_section(&points, anchor, 5).unwrap();

        assert_points_close(
            &result,
            &pts(&[[10.0, 10.0, 10.0], [10.0, 10.0, 12.0], [10.0, 10.0, 14.0]]),
        );
    }

    #[test]
    fn given_repeated_point_when_unravelling_then_zero_segment_is_kept() {
        let points = pts(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);

        let result = unravel_section(&points, points[0], 1).unwrap();

        assert_eq!(result[2], result[1]);
        assert_points_close(&result, &points);
    }

    #[test]
    fn given_nan_coordinate_when_unravelling_then_fails() {
        let points = pts(&[[0.0, 0.0, 0.0], [f64::NAN, 0.0, 0.0]]);

        let result = unravel_section(&points, points[0], 5);

        assert_eq!(result, Err(SectionFailure::NonFinite(1)));
    }

    #[test]
    fn given_empty_section_when_unravelling_tree_then_fails() {
        let mut morph = Morphology::new();
        morph
            .append_root_section(SectionType::Axon, Vec::new(), Vec::new())
            .unwrap();

        let result = unravel(&morph, &UnravelOptions::default());

        assert_eq!(result.unwrap_err(), DomainError::EmptySection { section: 0 });
    }

    #[test]
    fn given_bent_child_when_unravelling_tree_then_child_starts_at_parent_end() {
        let mut morph = Morphology::new();
        let root_points = pts(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.3, 0.0],
            [2.0, -0.2, 0.0],
            [3.0, 0.1, 0.0],
        ]);
        let root = morph
            .append_root_section(SectionType::BasalDendrite, root_points.clone(), vec![1.0; 4])
            .unwrap();
        let child = morph
            .append_section(
                root,
                SectionType::BasalDendrite,
                pts(&[[3.0, 0.1, 0.0], [3.5, 1.0, 0.0], [3.7, 2.0, 0.2]]),
                vec![0.5; 3],
            )
            .unwrap();

        let result = unravel(&morph, &UnravelOptions::with_window_half_length(1)).unwrap();

        let new_root = result.section(root).unwrap().points();
        let new_child = result.section(child).unwrap().points();
        assert_eq!(new_root[0], root_points[0]);
        assert_eq!(new_child[0], *new_root.last().unwrap());
        // Input is never touched
        assert_eq!(morph.section(root).unwrap().points(), root_points.as_slice());
    }
}

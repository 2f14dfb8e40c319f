//! Ordering and overlap of path-encoded ranges
//!
//! Pre-migration records locate their text by child-index paths from the
//! document root. Points are ordered by comparing paths index by index (a
//! path that is a prefix of another comes first), then by offset.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A `(path, offset)` point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyPoint<'a> {
    pub path: &'a [usize],
    pub offset: usize,
}

impl Ord for LegacyPoint<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_paths(self.path, other.path).then(self.offset.cmp(&other.offset))
    }
}

impl PartialOrd for LegacyPoint<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lexicographic comparison of index paths
pub fn compare_paths(a: &[usize], b: &[usize]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let cmp = x.cmp(y);
        if cmp != Ordering::Equal {
            return cmp;
        }
    }

    // Identical prefix: the shorter (ancestor) path sorts first
    a.len().cmp(&b.len())
}

/// Serialized range of a legacy record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRange {
    pub start_container_path: Vec<usize>,
    pub end_container_path: Vec<usize>,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl LegacyRange {
    pub fn start(&self) -> LegacyPoint<'_> {
        LegacyPoint {
            path: &self.start_container_path,
            offset: self.start_offset,
        }
    }

    pub fn end(&self) -> LegacyPoint<'_> {
        LegacyPoint {
            path: &self.end_container_path,
            offset: self.end_offset,
        }
    }

    /// Closed-interval intersection test
    pub fn overlaps(&self, other: &LegacyRange) -> bool {
        self.start() <= other.end() && other.start() <= self.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: &[usize], so: usize, end: &[usize], eo: usize) -> LegacyRange {
        LegacyRange {
            start_container_path: start.to_vec(),
            end_container_path: end.to_vec(),
            start_offset: so,
            end_offset: eo,
        }
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(compare_paths(&[1, 2], &[1, 2, 0]), Ordering::Less);
        assert_eq!(compare_paths(&[1, 3], &[1, 2, 9]), Ordering::Greater);
        assert_eq!(compare_paths(&[0, 4], &[0, 4]), Ordering::Equal);
    }

    #[test]
    fn test_offset_breaks_ties() {
        let a = LegacyPoint {
            path: &[1, 0],
            offset: 3,
        };
        let b = LegacyPoint {
            path: &[1, 0],
            offset: 7,
        };
        assert!(a < b);
    }

    #[test]
    fn test_identical_ranges_overlap() {
        let a = range(&[1, 1, 0], 2, &[1, 1, 0], 9);
        assert!(a.overlaps(&a.clone()));
    }

    #[test]
    fn test_disjoint_branches_do_not_overlap() {
        let a = range(&[1, 0, 0], 0, &[1, 0, 0], 5);
        let b = range(&[2, 3, 0], 1, &[2, 3, 0], 4);

        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_touching_ranges_overlap() {
        let a = range(&[1, 0], 0, &[1, 0], 5);
        let b = range(&[1, 0], 5, &[1, 2], 1);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_sort_points() {
        let mut ranges = vec![
            range(&[1, 4], 0, &[1, 4], 1),
            range(&[1], 2, &[1], 3),
            range(&[1, 2, 0], 8, &[1, 2, 0], 9),
            range(&[1, 2, 0], 1, &[1, 2, 0], 2),
        ];
        ranges.sort_by(|a, b| a.start().cmp(&b.start()));

        assert_eq!(ranges[0].start_container_path, vec![1]);
        assert_eq!(ranges[1].start_offset, 1);
        assert_eq!(ranges[2].start_offset, 8);
        assert_eq!(ranges[3].start_container_path, vec![1, 4]);
    }
}

/// Contiguous byte range owned by one part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    pub part_index: usize,
    pub start_byte: u64,
    pub length: u64,
}

impl RangeSpec {
    /// Inclusive last byte, `None` for an empty range.
    pub fn end_byte(&self) -> Option<u64> {
        self.length.checked_sub(1).map(|n| self.start_byte + n)
    }
}

/// Splits `[0, file_size)` into `num_parts` ranges of `file_size / num_parts`
/// bytes; the last range absorbs the remainder. When there are more parts
/// than bytes the leading ranges are empty.
pub fn compute_ranges(file_size: u64, num_parts: u64) -> Vec<RangeSpec> {
    let num_parts = num_parts.max(1);
    let part_size = file_size / num_parts;

    (0..num_parts)
        .map(|i| {
            let start_byte = i * part_size;
            let length = if i == num_parts - 1 {
                file_size - start_byte
            } else {
                part_size
            };
            RangeSpec {
                part_index: i as usize,
                start_byte,
                length,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(ranges: &[RangeSpec], file_size: u64) {
        let mut next = 0;
        for (i, r) in ranges.iter().enumerate() {
            assert_eq!(r.part_index, i);
            assert_eq!(r.start_byte, next, "gap or overlap before part {i}");
            next += r.length;
        }
        assert_eq!(next, file_size);
    }

    #[test]
    fn thousand_bytes_in_three_parts() {
        let ranges = compute_ranges(1000, 3);
        let bounds: Vec<_> = ranges
            .iter()
            .map(|r| (r.start_byte, r.end_byte().unwrap()))
            .collect();
        assert_eq!(bounds, vec![(0, 332), (333, 665), (666, 999)]);
        assert_eq!(ranges.iter().map(|r| r.length).sum::<u64>(), 1000);
    }

    #[test]
    fn ranges_cover_file_exactly() {
        for file_size in [0, 1, 2, 7, 100, 999, 1000, 1001, 65_537] {
            for num_parts in 1..=12 {
                let ranges = compute_ranges(file_size, num_parts);
                assert_eq!(ranges.len() as u64, num_parts);
                assert_covers(&ranges, file_size);
            }
        }
    }

    #[test]
    fn single_part_spans_whole_file() {
        let ranges = compute_ranges(4096, 1);
        assert_eq!(ranges[0].start_byte, 0);
        assert_eq!(ranges[0].end_byte(), Some(4095));
    }

    #[test]
    fn more_parts_than_bytes_yields_empty_leading_ranges() {
        let ranges = compute_ranges(3, 5);
        assert!(ranges[..4].iter().all(|r| r.length == 0));
        assert_eq!(ranges[4].start_byte, 0);
        assert_eq!(ranges[4].end_byte(), Some(2));
    }

    #[test]
    fn empty_file_has_only_empty_ranges() {
        let ranges = compute_ranges(0, 4);
        assert!(ranges.iter().all(|r| r.end_byte().is_none()));
    }
}

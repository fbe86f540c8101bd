/// A contiguous, inclusive run of heights handled by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBatch {
    pub start: u64,
    pub end: u64,
}

impl BlockBatch {
    pub fn heights(&self) -> std::ops::RangeInclusive<u64> {
        self.start..=self.end
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}

impl std::fmt::Display for BlockBatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Splits `[from, to]` into batches of `batch_size` heights; the last batch
/// is clipped to `to`. Yields nothing when `from > to`.
pub fn partition(from: u64, to: u64, batch_size: u64) -> BatchIter {
    BatchIter {
        next: (from <= to).then_some(from),
        to,
        batch_size: batch_size.max(1),
    }
}

#[derive(Debug, Clone)]
pub struct BatchIter {
    next: Option<u64>,
    to: u64,
    batch_size: u64,
}

impl Iterator for BatchIter {
    type Item = BlockBatch;

    fn next(&mut self) -> Option<BlockBatch> {
        let start = self.next?;
        let end = start
            .checked_add(self.batch_size - 1)
            .map_or(self.to, |end| end.min(self.to));

        self.next = if end < self.to { Some(end + 1) } else { None };
        Some(BlockBatch { start, end })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_covers_range_without_gaps_or_overlaps() {
        let batches: Vec<_> = partition(265_401, 265_437, 10).collect();

        assert_eq!(batches.first().unwrap().start, 265_401);
        assert_eq!(batches.last().unwrap().end, 265_437);
        for pair in batches.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start);
        }
        let total: u64 = batches.iter().map(BlockBatch::len).sum();
        assert_eq!(total, 37);
    }

    #[test]
    fn test_last_batch_is_clipped() {
        let batches: Vec<_> = partition(1, 25, 10).collect();
        assert_eq!(
            batches,
            vec![
                BlockBatch { start: 1, end: 10 },
                BlockBatch { start: 11, end: 20 },
                BlockBatch { start: 21, end: 25 },
            ]
        );
    }

    #[test]
    fn test_single_height_range() {
        let batches: Vec<_> = partition(7, 7, 10).collect();
        assert_eq!(batches, vec![BlockBatch { start: 7, end: 7 }]);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert_eq!(partition(10, 9, 5).count(), 0);
    }

    #[test]
    fn test_range_ending_at_max_height_terminates() {
        let batches: Vec<_> = partition(u64::MAX - 4, u64::MAX, 3).collect();
        assert_eq!(
            batches,
            vec![
                BlockBatch {
                    start: u64::MAX - 4,
                    end: u64::MAX - 2
                },
                BlockBatch {
                    start: u64::MAX - 1,
                    end: u64::MAX
                },
            ]
        );
    }
}

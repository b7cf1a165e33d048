//! Full-factorial expansion of parameterised opcodes and bit-groups.

/// Every combination of member indices for parameters with the given member
/// counts, one row per combination. The first parameter varies slowest and
/// the last fastest, so a row's position equals the mixed-radix number its
/// indices spell (see [`row_index`]).
pub fn full_factorial(levels: &[usize]) -> Vec<Vec<usize>> {
    let total: usize = levels.iter().product();
    let mut rows = vec![vec![0; levels.len()]; total];
    if total == 0 {
        return rows;
    }

    let mut nreps = total;
    for (i, &level) in levels.iter().enumerate() {
        nreps /= level;
        let ncycles = total / (level * nreps);
        let mut count = 0;
        for _ in 0..ncycles {
            for num in 0..level {
                for _ in 0..nreps {
                    rows[count][i] = num;
                    count += 1;
                }
            }
        }
    }
    rows
}

/// Position in [`full_factorial`]'s output of the row holding `indices`.
pub fn row_index(levels: &[usize], indices: &[usize]) -> usize {
    debug_assert_eq!(levels.len(), indices.len());
    levels
        .iter()
        .zip(indices)
        .fold(0, |acc, (&level, &index)| acc * level + index)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn test_two_by_three() {
        let rows = full_factorial(&[2, 3]);
        assert_eq!(
            rows,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2],
            ]
        );
    }

    #[test]
    fn test_cartesian_product() {
        let levels = [2, 4, 3];
        let rows = full_factorial(&levels);
        assert_eq!(rows.len(), 24);
        let unique: BTreeSet<_> = rows.iter().cloned().collect();
        assert_eq!(unique.len(), 24);
        for (i, row) in rows.iter().enumerate() {
            assert!(row.iter().zip(levels).all(|(&v, l)| v < l));
            assert_eq!(row_index(&levels, row), i);
        }
    }

    #[test]
    fn test_degenerate() {
        assert_eq!(full_factorial(&[]), vec![Vec::<usize>::new()]);
        assert!(full_factorial(&[3, 0]).is_empty());
        assert_eq!(full_factorial(&[1]), vec![vec![0]]);
        assert_eq!(row_index(&[], &[]), 0);
    }
}

//! Which variant plays which role at each aggregation step.
//!
//! With `n` variants in a fixed order, step `i` (for `i < n − 1`) tests
//! variant `i` against the variants that follow it cyclically. The last
//! variant is never a subject: its probability is the complement of the
//! others. Kept apart from the comparators so the role assignment can be
//! tested without any floating-point work.

/// Variant indices for one aggregation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Roles {
    /// Two variants: is `subject` better than `rival`?
    Pair { subject: usize, rival: usize },
    /// Three variants: is `subject` better than both rivals?
    Triple {
        subject: usize,
        first_rival: usize,
        second_rival: usize,
    },
}

impl Roles {
    pub fn subject(&self) -> usize {
        match *self {
            Roles::Pair { subject, .. } | Roles::Triple { subject, .. } => subject,
        }
    }

    pub fn rivals(&self) -> Vec<usize> {
        match *self {
            Roles::Pair { rival, .. } => vec![rival],
            Roles::Triple {
                first_rival,
                second_rival,
                ..
            } => vec![first_rival, second_rival],
        }
    }
}

/// Role assignments for `n` variants, one per directly computed probability.
///
/// Empty for `n = 1` (the lone variant wins with certainty) and for counts
/// outside the supported range, which callers reject beforehand.
pub fn rotations(n: usize) -> Vec<Roles> {
    match n {
        2 => vec![Roles::Pair {
            subject: 0,
            rival: 1,
        }],
        3 => (0..n - 1)
            .map(|i| Roles::Triple {
                subject: i,
                first_rival: (i + 1) % n,
                second_rival: (i + 2) % n,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_variant_has_no_steps() {
        assert!(rotations(1).is_empty());
    }

    #[test]
    fn two_variants_compare_first_against_second() {
        assert_eq!(
            rotations(2),
            vec![Roles::Pair {
                subject: 0,
                rival: 1
            }]
        );
    }

    #[test]
    fn three_variants_rotate_cyclically() {
        assert_eq!(
            rotations(3),
            vec![
                Roles::Triple {
                    subject: 0,
                    first_rival: 1,
                    second_rival: 2
                },
                Roles::Triple {
                    subject: 1,
                    first_rival: 2,
                    second_rival: 0
                },
            ]
        );
    }

    #[test]
    fn last_variant_is_never_a_subject() {
        for n in 1..=3 {
            assert!(rotations(n).iter().all(|r| r.subject() != n - 1));
            assert_eq!(rotations(n).len(), n - 1);
        }
    }

    #[test]
    fn every_step_covers_all_variants_once() {
        for n in 2..=3 {
            for roles in rotations(n) {
                let mut seen = roles.rivals();
                seen.push(roles.subject());
                seen.sort_unstable();
                assert_eq!(seen, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn unsupported_counts_yield_no_steps() {
        assert!(rotations(0).is_empty());
        assert!(rotations(4).is_empty());
    }
}

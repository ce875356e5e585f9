use std::ops::{Mul, Not};

// A facelet permutation. apply(target)[i] == target[perm[i]], i.e. position i
// receives the symbol that used to sit at perm[i].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permutation {
    perm: Vec<usize>,
    perm_inv: Vec<usize>,
}

impl Permutation {
    // None if `perm` is not a bijection on 0..perm.len()
    pub fn new(perm: Vec<usize>) -> Option<Permutation> {
        let mut perm_inv = vec![usize::MAX; perm.len()];
        for i in 0..perm.len() {
            let p = perm[i];
            if p >= perm.len() || perm_inv[p] != usize::MAX {
                return None;
            }
            perm_inv[p] = i;
        }
        Some(Permutation { perm, perm_inv })
    }

    pub fn apply<T: Clone>(&self, target: &[T]) -> Vec<T> {
        assert_eq!(self.len(), target.len());
        self.perm.iter().map(|&p| target[p].clone()).collect()
    }

    pub fn apply_inv<T: Clone>(&self, target: &[T]) -> Vec<T> {
        assert_eq!(self.len(), target.len());
        self.perm_inv.iter().map(|&p| target[p].clone()).collect()
    }

    pub fn is_identity(&self) -> bool {
        self.perm.iter().enumerate().all(|(i, &p)| i == p)
    }

    // positions whose content is changed by this permutation
    pub fn moved(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.perm.iter().copied().enumerate().filter(|&(i, p)| i != p)
    }

    pub fn len(&self) -> usize {
        self.perm.len()
    }
}

impl Not for Permutation {
    type Output = Permutation;

    fn not(self) -> Self::Output {
        Permutation {
            perm: self.perm_inv,
            perm_inv: self.perm,
        }
    }
}

impl Not for &Permutation {
    type Output = Permutation;

    fn not(self) -> Self::Output {
        !self.clone()
    }
}

// Composition of permutations.
// (x * y).apply(seq) == x.apply(y.apply(seq)) holds.
impl Mul<&Permutation> for &Permutation {
    type Output = Permutation;

    fn mul(self, rhs: &Permutation) -> Self::Output {
        assert_eq!(self.len(), rhs.len());
        let perm: Vec<usize> = self.perm.iter().map(|&p| rhs.perm[p]).collect();
        let mut perm_inv = vec![0; perm.len()];
        for (i, &p) in perm.iter().enumerate() {
            perm_inv[p] = i;
        }
        Permutation { perm, perm_inv }
    }
}

impl Mul<Permutation> for Permutation {
    type Output = Permutation;

    fn mul(self, rhs: Permutation) -> Self::Output {
        &self * &rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permutation() {
        let a = Permutation::new(vec![1, 2, 3, 0]).unwrap();
        let test_seq = &["a", "b", "c", "d"];
        assert_eq!(a.len(), 4);
        assert_eq!(a.apply(test_seq), vec!["b", "c", "d", "a"]);
        assert_eq!(a.apply_inv(test_seq), vec!["d", "a", "b", "c"]);
        assert_eq!((!&a).apply(test_seq), vec!["d", "a", "b", "c"]);

        let b = Permutation::new(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(a.apply(&b.apply(test_seq)), (&a * &b).apply(test_seq));
        assert_eq!(b.apply(&a.apply(test_seq)), (&b * &a).apply(test_seq));

        assert_eq!(!(&a * &b), !b.clone() * !a.clone());
    }

    #[test]
    fn test_inverse_law() {
        let a = Permutation::new(vec![0, 6, 2, 1, 4, 5, 3]).unwrap();
        let test_seq = vec!["a", "b", "c", "d", "e", "f", "g"];
        assert_eq!(a.apply_inv(&a.apply(&test_seq)), test_seq);
        assert!((&a * &!&a).is_identity());
        assert_eq!(a.moved().count(), 3);
    }

    #[test]
    fn test_rejects_non_bijection() {
        assert!(Permutation::new(vec![0, 0, 1]).is_none());
        assert!(Permutation::new(vec![0, 3, 1]).is_none());
        assert!(Permutation::new(vec![]).is_some());
    }
}

//! Labelled training examples and the sources that hold them.

use crate::error::{Error, Result};

/// One labelled example.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pattern<'a> {
    pub input: &'a [f64],
    pub target: &'a [f64],
}

/// An ordered, finite, random-access collection of patterns.
///
/// Sources are read-only; the trainer walks them by index once per epoch.
pub trait PatternSource {
    /// Returns the number of patterns.
    fn len(&self) -> usize;

    /// Returns the pattern at `index`.
    ///
    /// Panics if `index >= len()`.
    fn pattern(&self, index: usize) -> Pattern<'_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, O> PatternSource for Vec<(I, O)>
where
    I: AsRef<[f64]>,
    O: AsRef<[f64]>,
{
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn pattern(&self, index: usize) -> Pattern<'_> {
        let (input, target) = &self[index];
        Pattern {
            input: input.as_ref(),
            target: target.as_ref(),
        }
    }
}

impl<I, O, const N: usize> PatternSource for [(I, O); N]
where
    I: AsRef<[f64]>,
    O: AsRef<[f64]>,
{
    fn len(&self) -> usize {
        N
    }

    fn pattern(&self, index: usize) -> Pattern<'_> {
        let (input, target) = &self[index];
        Pattern {
            input: input.as_ref(),
            target: target.as_ref(),
        }
    }
}

/// An owned pattern source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternSet {
    patterns: Vec<(Vec<f64>, Vec<f64>)>,
}

impl PatternSet {
    pub fn new() -> Self {
        PatternSet::default()
    }

    pub fn push(&mut self, input: Vec<f64>, target: Vec<f64>) {
        self.patterns.push((input, target));
    }
}

impl std::iter::FromIterator<(Vec<f64>, Vec<f64>)> for PatternSet {
    fn from_iter<T: IntoIterator<Item = (Vec<f64>, Vec<f64>)>>(iter: T) -> Self {
        PatternSet {
            patterns: iter.into_iter().collect(),
        }
    }
}

impl PatternSource for PatternSet {
    fn len(&self) -> usize {
        self.patterns.len()
    }

    fn pattern(&self, index: usize) -> Pattern<'_> {
        self.patterns.pattern(index)
    }
}

/// Verifies that every pattern in `source` has `inputs` inputs and `outputs`
/// targets.
pub fn validate(source: &dyn PatternSource, inputs: usize, outputs: usize) -> Result<()> {
    for index in 0..source.len() {
        let pattern = source.pattern(index);
        if pattern.input.len() != inputs {
            return Err(Error::Data(format!(
                "pattern {} has {} inputs, the network expects {}",
                index,
                pattern.input.len(),
                inputs
            )));
        }
        if pattern.target.len() != outputs {
            return Err(Error::Data(format!(
                "pattern {} has {} targets, the network produces {}",
                index,
                pattern.target.len(),
                outputs
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_source() {
        let examples = [([0.0, 1.0], [1.0]), ([1.0, 1.0], [0.0])];
        assert_eq!(examples.len(), 2);
        let p = PatternSource::pattern(&examples, 1);
        assert_eq!(p.input, &[1.0, 1.0]);
        assert_eq!(p.target, &[0.0]);
        assert!(validate(&examples, 2, 1).is_ok());
    }

    #[test]
    fn pattern_set() {
        let mut set: PatternSet = vec![(vec![1.0], vec![0.0, 1.0])].into_iter().collect();
        set.push(vec![2.0], vec![1.0, 0.0]);
        assert_eq!(PatternSource::len(&set), 2);
        assert_eq!(set.pattern(1).input, &[2.0]);
    }

    #[test]
    fn mismatched_widths() {
        let examples = vec![(vec![0.0, 0.0], vec![0.0]), (vec![0.0], vec![1.0])];
        assert_eq!(
            validate(&examples, 2, 1),
            Err(Error::Data(
                "pattern 1 has 1 inputs, the network expects 2".to_string()
            ))
        );
        assert!(matches!(validate(&examples[..1].to_vec(), 2, 2), Err(Error::Data(_))));
    }
}

use sdkpin_oracle::{Basis, Classification};
use std::collections::BTreeMap;

/// Oracle verdicts for the packages a run cares about.
///
/// Lookups of packages that were never classified answer "not managed".
#[derive(Debug, Clone, Default)]
pub struct ManagedSet {
    verdicts: BTreeMap<String, Classification>,
}

impl ManagedSet {
    pub fn new(verdicts: BTreeMap<String, Classification>) -> Self {
        Self { verdicts }
    }

    /// Treat exactly `names` as managed, as an authority list would.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            verdicts: names
                .into_iter()
                .map(|n| (n.into(), Classification::new(true, Basis::Authority)))
                .collect(),
        }
    }

    pub fn is_managed(&self, package: &str) -> bool {
        self.verdicts.get(package).is_some_and(|c| c.managed)
    }

    pub fn get(&self, package: &str) -> Option<&Classification> {
        self.verdicts.get(package)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Classification)> {
        self.verdicts.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Packages whose probe could not run or timed out.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &Classification)> {
        self.iter().filter(|(_, c)| c.basis == Basis::ProbeFailed)
    }

    pub fn len(&self) -> usize {
        self.verdicts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verdicts.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, Classification> {
        self.verdicts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_packages_are_not_managed() {
        let set = ManagedSet::from_names(["expo-image"]);
        assert!(set.is_managed("expo-image"));
        assert!(!set.is_managed("zod"));
    }

    #[test]
    fn failed_verdicts_are_listed() {
        let mut verdicts = BTreeMap::new();
        verdicts.insert("a".to_owned(), Classification::new(false, Basis::ProbeFailed));
        verdicts.insert("b".to_owned(), Classification::new(true, Basis::ProbeMismatch));
        let set = ManagedSet::new(verdicts);
        let failed: Vec<_> = set.failed().map(|(p, _)| p).collect();
        assert_eq!(failed, vec!["a"]);
        assert!(!set.is_managed("a"));
    }
}

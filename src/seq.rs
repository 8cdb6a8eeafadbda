//! Reusable and one-shot sequences.
//!
//! A [`DataSeq`] is either a materialized list that can be iterated any number
//! of times, or a single-pass producer of fallible values. One-shot sequences
//! are promoted with [`DataSeq::reuse`]; a reusable one never turns back into a
//! producer.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// A sequence of decoded values.
pub enum DataSeq<T> {
    /// Materialized, multiply iterable.
    Reusable(Vec<T>),
    /// Single pass; pulling drives the underlying source.
    OneShot(Box<dyn Iterator<Item = Result<T>>>),
}

impl<T: 'static> DataSeq<T> {
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self::Reusable(items)
    }

    /// One-shot sequence over infallible values.
    pub fn one_shot<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'static,
    {
        Self::OneShot(Box::new(iter.into_iter().map(Ok)))
    }

    pub fn from_results<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        Self::OneShot(Box::new(iter.into_iter()))
    }

    /// One-shot sequence whose producer runs on the first pull.
    pub fn defer<F, I>(producer: F) -> Self
    where
        F: FnOnce() -> I + 'static,
        I: IntoIterator<Item = Result<T>>,
        I::IntoIter: 'static,
    {
        Self::OneShot(Box::new(std::iter::once_with(producer).flatten()))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::Reusable(Vec::new())
    }

    #[must_use]
    pub fn is_reusable(&self) -> bool {
        matches!(self, Self::Reusable(_))
    }

    /// Materialize into a reusable sequence.
    ///
    /// # Errors
    ///
    /// Returns the first error pulled from a one-shot sequence.
    pub fn reuse(self) -> Result<Self> {
        self.to_vec().map(Self::Reusable)
    }

    pub fn map<U: 'static, F>(self, mut f: F) -> DataSeq<U>
    where
        F: FnMut(T) -> U + 'static,
    {
        match self {
            Self::Reusable(items) => DataSeq::Reusable(items.into_iter().map(f).collect()),
            Self::OneShot(iter) => DataSeq::OneShot(Box::new(iter.map(move |r| r.map(&mut f)))),
        }
    }

    #[must_use]
    pub fn filter<F>(self, mut keep: F) -> Self
    where
        F: FnMut(&T) -> bool + 'static,
    {
        match self {
            Self::Reusable(mut items) => {
                items.retain(|item| keep(item));
                Self::Reusable(items)
            }
            Self::OneShot(iter) => Self::OneShot(Box::new(
                iter.filter(move |r| r.as_ref().map_or(true, |item| keep(item))),
            )),
        }
    }

    /// Observe each value as it passes.
    #[must_use]
    pub fn peek<F>(self, mut f: F) -> Self
    where
        F: FnMut(&T) + 'static,
    {
        match self {
            Self::Reusable(items) => {
                items.iter().for_each(&mut f);
                Self::Reusable(items)
            }
            Self::OneShot(iter) => Self::OneShot(Box::new(iter.inspect(move |r| {
                if let Ok(item) = r {
                    f(item);
                }
            }))),
        }
    }

    #[must_use]
    pub fn limit(self, n: usize) -> Self {
        match self {
            Self::Reusable(mut items) => {
                items.truncate(n);
                Self::Reusable(items)
            }
            Self::OneShot(iter) => Self::OneShot(Box::new(iter.take(n))),
        }
    }

    /// # Errors
    ///
    /// Stops at and returns the first error of a one-shot sequence.
    pub fn for_each<F: FnMut(T)>(self, mut f: F) -> Result<()> {
        for item in self {
            f(item?);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence.
    pub fn to_vec(self) -> Result<Vec<T>> {
        match self {
            Self::Reusable(items) => Ok(items),
            Self::OneShot(iter) => iter.collect(),
        }
    }

    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence.
    pub fn to_set(self) -> Result<HashSet<T>>
    where
        T: Eq + Hash,
    {
        self.into_iter().collect()
    }

    /// Key every value; later values replace earlier ones with the same key.
    ///
    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence.
    pub fn to_map<K, F>(self, mut key: F) -> Result<HashMap<K, T>>
    where
        K: Eq + Hash,
        F: FnMut(&T) -> K,
    {
        self.into_iter()
            .map(|r| r.map(|item| (key(&item), item)))
            .collect()
    }

    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence.
    pub fn group_by<K, F>(self, mut key: F) -> Result<HashMap<K, Vec<T>>>
    where
        K: Eq + Hash,
        F: FnMut(&T) -> K,
    {
        let mut groups: HashMap<K, Vec<T>> = HashMap::new();
        for item in self {
            let item = item?;
            groups.entry(key(&item)).or_default().push(item);
        }
        Ok(groups)
    }

    /// The values of a reusable sequence.
    #[must_use]
    pub fn as_slice(&self) -> Option<&[T]> {
        match self {
            Self::Reusable(items) => Some(items),
            Self::OneShot(_) => None,
        }
    }

    /// Borrowing iteration, for reusable sequences only.
    pub fn iter(&self) -> Option<std::slice::Iter<'_, T>> {
        self.as_slice().map(<[T]>::iter)
    }

    /// Run `f` on every value across the global rayon pool.
    ///
    /// No ordering is guaranteed. A one-shot sequence is drained first, so
    /// its errors surface before any work starts. A panic in `f` propagates.
    ///
    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence.
    pub fn par_for_each<F>(self, f: F) -> Result<()>
    where
        T: Send + Sync,
        F: Fn(&T) + Send + Sync,
    {
        let items = self.to_vec()?;
        items.par_iter().for_each(f);
        Ok(())
    }

    /// Like [`DataSeq::par_for_each`] on a dedicated pool of `threads`
    /// workers; `0` means one per CPU.
    ///
    /// # Errors
    ///
    /// Returns the first error of a one-shot sequence, or a pool build error.
    pub fn par_for_each_in<F>(self, threads: usize, f: F) -> Result<()>
    where
        T: Send + Sync,
        F: Fn(&T) + Send + Sync,
    {
        let threads = if threads == 0 { num_cpus::get() } else { threads };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .with_context(|| format!("build pool of {threads} threads"))?;
        let items = self.to_vec()?;
        pool.install(|| items.par_iter().for_each(f));
        Ok(())
    }
}

impl<T> Default for DataSeq<T> {
    fn default() -> Self {
        Self::Reusable(Vec::new())
    }
}

impl<T> From<Vec<T>> for DataSeq<T> {
    fn from(items: Vec<T>) -> Self {
        Self::Reusable(items)
    }
}

impl<T> FromIterator<T> for DataSeq<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Reusable(iter.into_iter().collect())
    }
}

impl<T: 'static> IntoIterator for DataSeq<T> {
    type Item = Result<T>;
    type IntoIter = Box<dyn Iterator<Item = Result<T>>>;

    fn into_iter(self) -> Self::IntoIter {
        match self {
            Self::Reusable(items) => Box::new(items.into_iter().map(Ok)),
            Self::OneShot(iter) => iter,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn deferred_producer_runs_on_first_pull() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let seq = DataSeq::defer(move || {
            counter.set(counter.get() + 1);
            vec![Ok(1), Ok(2)]
        });
        assert_eq!(calls.get(), 0);
        assert_eq!(seq.to_vec().unwrap(), vec![1, 2]);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reuse_promotes_one_shot() {
        let seq = DataSeq::one_shot(1..=3).reuse().unwrap();
        assert!(seq.is_reusable());
        assert_eq!(seq.as_slice(), Some(&[1, 2, 3][..]));
        assert_eq!(seq.iter().unwrap().sum::<i32>(), 6);
    }

    #[test]
    fn operators_compose_lazily() {
        let seen = Rc::new(Cell::new(0));
        let peeked = Rc::clone(&seen);
        let out = DataSeq::one_shot(1..100)
            .filter(|n| n % 2 == 0)
            .peek(move |_| peeked.set(peeked.get() + 1))
            .map(|n| n * 10)
            .limit(3)
            .to_vec()
            .unwrap();
        assert_eq!(out, vec![20, 40, 60]);
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn grouping_and_keys() {
        let groups = DataSeq::from_vec(vec!["apple", "avocado", "banana"])
            .group_by(|s| s.as_bytes()[0])
            .unwrap();
        assert_eq!(groups[&b'a'], vec!["apple", "avocado"]);
        let keyed = DataSeq::from_vec(vec![(1, "a"), (1, "b")])
            .to_map(|(k, _)| *k)
            .unwrap();
        assert_eq!(keyed[&1], (1, "b"));
    }

    #[test]
    fn errors_stop_terminal_operations() {
        let seq = DataSeq::from_results(vec![Ok(1), Err(anyhow::anyhow!("boom")), Ok(3)]);
        assert!(seq.to_vec().is_err());
    }

    #[test]
    fn parallel_side_effects_see_every_value() {
        let total = AtomicUsize::new(0);
        DataSeq::from_vec((1..=100).collect::<Vec<usize>>())
            .par_for_each_in(4, |n| {
                total.fetch_add(*n, Ordering::Relaxed);
            })
            .unwrap();
        assert_eq!(total.load(Ordering::Relaxed), 5050);
    }
}

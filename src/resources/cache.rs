use std::sync::{ Arc, PoisonError, RwLock };

/// Local copy of a remote collection. Writers call in only after the remote call succeeded.
#[derive(Debug)]
pub struct RecordCache<T> {
    records: Arc<RwLock<Vec<T>>>,
}

impl<T> Clone for RecordCache<T> {
    fn clone(&self) -> Self {
        Self { records: Arc::clone(&self.records) }
    }
}

impl<T> Default for RecordCache<T> {
    fn default() -> Self {
        Self { records: Arc::new(RwLock::new(Vec::new())) }
    }
}

impl<T: Clone> RecordCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<T> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn first(&self) -> Option<T> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).first().cloned()
    }

    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.records.read().unwrap_or_else(PoisonError::into_inner).iter().find(|r| pred(r)).cloned()
    }

    pub fn replace_all(&self, records: Vec<T>) {
        *self.records.write().unwrap_or_else(PoisonError::into_inner) = records;
    }

    pub fn push(&self, record: T) {
        self.records.write().unwrap_or_else(PoisonError::into_inner).push(record);
    }

    /// Returns how many records were dropped.
    pub fn remove_where(&self, pred: impl Fn(&T) -> bool) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|r| !pred(r));
        before - records.len()
    }

    /// Applies `update` to every matching record; returns the updated copies.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, update: impl Fn(&mut T)) -> Vec<T> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let mut touched = Vec::new();
        for record in records.iter_mut().filter(|r| pred(r)) {
            update(record);
            touched.push(record.clone());
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_are_visible_through_clones() {
        let cache: RecordCache<(u32, bool)> = RecordCache::new();
        let other = cache.clone();
        cache.replace_all(vec![(1, false), (2, false)]);
        other.push((3, true));

        assert_eq!(cache.update_where(|r| r.0 == 2, |r| r.1 = true), vec![(2, true)]);
        assert_eq!(cache.remove_where(|r| r.0 == 1), 1);
        assert_eq!(cache.snapshot(), vec![(2, true), (3, true)]);
        assert_eq!(other.first(), Some((2, true)));
        assert_eq!(cache.find(|r| r.0 == 9), None);
    }
}

//! Pools of volatile buffers recycled across frames.

use std::sync::Arc;

use crate::error::GraphicsResult;

/// Pool of reference-counted volatile buffers.
///
/// An entry is free exactly when the pool holds its only reference. Lookup
/// is first-fit over entries in creation order; entries are never resized
/// or evicted, a miss always appends a new one.
#[derive(Debug)]
pub struct VolatilePool<T> {
    entries: Vec<Arc<T>>,
}

impl<T> Default for VolatilePool<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> VolatilePool<T> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the first free entry accepted by `fits`, or create one with
    /// `create` and append it.
    pub fn find_or_create(
        &mut self,
        fits: impl Fn(&T) -> bool,
        create: impl FnOnce() -> GraphicsResult<Arc<T>>,
    ) -> GraphicsResult<Arc<T>> {
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| Arc::strong_count(entry) == 1 && fits(entry))
        {
            return Ok(entry.clone());
        }

        let entry = create()?;
        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Number of pooled entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pooled reference.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fit_reuse() {
        let mut pool: VolatilePool<u32> = VolatilePool::new();

        let a = pool.find_or_create(|&cap| cap >= 100, || Ok(Arc::new(100))).unwrap();
        drop(a);
        let b = pool.find_or_create(|&cap| cap >= 50, || Ok(Arc::new(50))).unwrap();
        assert_eq!(*b, 100);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_referenced_entry_not_reused() {
        let mut pool: VolatilePool<u32> = VolatilePool::new();

        let held = pool.find_or_create(|_| true, || Ok(Arc::new(1))).unwrap();
        let other = pool.find_or_create(|_| true, || Ok(Arc::new(2))).unwrap();
        assert!(!Arc::ptr_eq(&held, &other));
        assert_eq!(pool.len(), 2);
        assert_eq!(Arc::strong_count(&held), 2);
    }

    #[test]
    fn test_creation_failure_leaves_pool_unchanged() {
        let mut pool: VolatilePool<u32> = VolatilePool::new();
        let result = pool.find_or_create(
            |_| false,
            || Err(crate::GraphicsError::ContextLost),
        );
        assert!(result.is_err());
        assert!(pool.is_empty());
    }
}

//! Per-subject mutual exclusion.
//!
//! Lookup-then-write sequences (duplicate-email check then insert, find exercise bundle then
//! append or insert) must not interleave for the same subject. [`SubjectLocks`] hands out one
//! mutex per key; different keys proceed in parallel.

use crate::BundleResult;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Lock key for merges of one user's exercise bundle.
pub(crate) fn user_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

/// Lock key for registrations with one email address.
pub(crate) fn email_key(normalised_email: &str) -> String {
    format!("email:{normalised_email}")
}

#[derive(Debug, Default)]
pub struct SubjectLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `key`.
    ///
    /// The guarded value is `()`, so a lock poisoned by a panicking holder is recovered rather
    /// than reported.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> BundleResult<T>) -> BundleResult<T> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(table.entry(key.to_string()).or_default())
        };

        let result = {
            let _guard = entry.lock().unwrap_or_else(|poisoned| {
                tracing::warn!(key, "recovering subject lock poisoned by a panicked holder");
                poisoned.into_inner()
            });
            f()
        };

        // Drop the table entry once nobody else holds or waits on it.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&entry) == 2 {
            table.remove(key);
        }

        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BundleError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn same_key_is_serialised() {
        let locks = Arc::new(SubjectLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                thread::spawn(move || {
                    locks
                        .with_lock("user:1", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_inside.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(5));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 0, "idle keys should be released");
    }

    #[test]
    fn result_and_errors_pass_through() {
        let locks = SubjectLocks::new();
        assert_eq!(locks.with_lock("a", || Ok(7)).unwrap(), 7);

        let err = locks
            .with_lock::<()>("a", || Err(BundleError::InvalidInput("nope".into())))
            .unwrap_err();
        assert!(matches!(err, BundleError::InvalidInput(_)));
        assert_eq!(locks.len(), 0);
    }

    #[test]
    fn nested_distinct_keys_do_not_deadlock() {
        let locks = SubjectLocks::new();
        let value = locks
            .with_lock(&email_key("a@b.c"), || locks.with_lock(&user_key("1"), || Ok(1)))
            .unwrap();
        assert_eq!(value, 1);
    }

    #[test]
    fn panicked_holder_does_not_block_the_key() {
        let locks = Arc::new(SubjectLocks::new());

        let panicking = {
            let locks = Arc::clone(&locks);
            thread::spawn(move || {
                locks
                    .with_lock::<()>(&user_key("12345"), || panic!("merge blew up"))
                    .ok();
            })
        };
        assert!(panicking.join().is_err());

        let value = locks.with_lock(&user_key("12345"), || Ok(42)).unwrap();
        assert_eq!(value, 42);
        assert_eq!(locks.len(), 0);
    }
}

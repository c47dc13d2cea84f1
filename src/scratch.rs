//! Per-thread scratch buffers
//!
//! Matching pads short inputs into a temporary buffer. Buffers come from a
//! small thread-local pool and go back to it when the closure passed to
//! [`with_scratch`] returns, unwinds, or exits early.

use std::cell::RefCell;

/// Buffers kept per thread
const MAX_POOLED: usize = 8;

/// Buffers larger than this are dropped instead of pooled
const MAX_POOLED_CAPACITY: usize = 64 * 1024;

thread_local! {
    static POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}

struct Scratch {
    buf: Vec<u8>,
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let mut buf = std::mem::take(&mut self.buf);
        if buf.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buf.clear();
        // The pool may already be gone during thread teardown
        let _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_POOLED {
                pool.push(buf);
            }
        });
    }
}

/// Run `f` with an empty scratch buffer borrowed from the thread's pool
///
/// Nested calls receive distinct buffers.
pub fn with_scratch<R>(f: impl FnOnce(&mut Vec<u8>) -> R) -> R {
    let buf = POOL
        .try_with(|pool| pool.borrow_mut().pop())
        .ok()
        .flatten()
        .unwrap_or_default();
    let mut scratch = Scratch { buf };
    f(&mut scratch.buf)
}

/// Number of idle buffers pooled on the current thread
pub fn pooled() -> usize {
    POOL.try_with(|pool| pool.borrow().len()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_returned_and_cleared() {
        std::thread::spawn(|| {
            assert_eq!(pooled(), 0);
            with_scratch(|buf| buf.extend_from_slice(b"Mozilla"));
            assert_eq!(pooled(), 1);
            with_scratch(|buf| {
                assert!(buf.is_empty());
                assert!(buf.capacity() >= 7);
            });
            assert_eq!(pooled(), 1);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_nested_calls_get_distinct_buffers() {
        std::thread::spawn(|| {
            with_scratch(|outer| {
                outer.push(1);
                with_scratch(|inner| {
                    assert!(inner.is_empty());
                    inner.push(2);
                });
                assert_eq!(outer.as_slice(), &[1]);
            });
            assert_eq!(pooled(), 2);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_returned_after_early_exit() {
        fn first_nul(input: &[u8]) -> Option<usize> {
            with_scratch(|buf| {
                buf.extend_from_slice(input);
                let pos = buf.iter().position(|b| *b == 0)?;
                Some(pos)
            })
        }

        std::thread::spawn(|| {
            assert_eq!(first_nul(b"abc"), None);
            assert_eq!(first_nul(b"a\0c"), Some(1));
            assert_eq!(pooled(), 1);
        })
        .join()
        .unwrap();
    }

    #[test]
    fn test_returned_after_panic() {
        std::thread::spawn(|| {
            let result = std::panic::catch_unwind(|| {
                with_scratch(|buf| {
                    buf.push(0);
                    panic!("boom");
                })
            });
            assert!(result.is_err());
            assert_eq!(pooled(), 1);
        })
        .join()
        .unwrap();
    }
}

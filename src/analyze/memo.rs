// src/analyze/memo.rs
//! Bounded memo table shared by the analysis workers.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

/// FIFO-bounded map from text to a computed value. Concurrent callers asking
/// for the same key await one computation instead of repeating it.
///
/// Cells that a caller still holds are skipped by eviction, so the table can
/// briefly exceed its capacity while many distinct keys are in flight.
pub struct BoundedMemo<V> {
    capacity: usize,
    state: Mutex<MemoState<V>>,
}

struct MemoState<V> {
    cells: HashMap<String, Arc<OnceCell<V>>>,
    order: VecDeque<String>,
}

impl<V: Clone> BoundedMemo<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(MemoState {
                cells: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = self.cell_for(key);
        cell.get_or_init(compute).await.clone()
    }

    /// Completed value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.cells.get(key).and_then(|c| c.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cells
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell_for(&self, key: &str) -> Arc<OnceCell<V>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cell) = state.cells.get(key) {
            return cell.clone();
        }
        let mut busy = Vec::new();
        while state.cells.len() >= self.capacity {
            let Some(oldest) = state.order.pop_front() else {
                break;
            };
            let in_flight = state
                .cells
                .get(&oldest)
                .is_some_and(|c| Arc::strong_count(c) > 1);
            if in_flight {
                busy.push(oldest);
            } else {
                state.cells.remove(&oldest);
            }
        }
        for key in busy.into_iter().rev() {
            state.order.push_front(key);
        }
        let cell = Arc::new(OnceCell::new());
        state.cells.insert(key.to_string(), cell.clone());
        state.order.push_back(key.to_string());
        cell
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn evicts_oldest_at_capacity() {
        let memo = BoundedMemo::new(2);
        memo.get_or_compute("a", || async { 1 }).await;
        memo.get_or_compute("b", || async { 2 }).await;
        memo.get_or_compute("c", || async { 3 }).await;
        assert_eq!(memo.len(), 2);
        assert_eq!(memo.get("a"), None);
        assert_eq!(memo.get("c"), Some(3));
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_computation() {
        let memo = Arc::new(BoundedMemo::new(8));
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let memo = memo.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                memo.get_or_compute("same", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    42
                })
                .await
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn in_flight_cells_survive_eviction() {
        let memo = Arc::new(BoundedMemo::new(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let (release, gate) = tokio::sync::oneshot::channel::<()>();

        let first = {
            let memo = memo.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                memo.get_or_compute("a", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    let _ = gate.await;
                    1
                })
                .await
            })
        };
        while calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(memo.get_or_compute("b", || async { 2 }).await, 2);
        assert_eq!(memo.len(), 2);

        let second = {
            let memo = memo.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                memo.get_or_compute("a", || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    99
                })
                .await
            })
        };
        release.send(()).unwrap();
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(second.await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::oneshot;

/// FIFO ticket dispenser that serializes mutations of one session.
///
/// Every operation that touches session state awaits `acquire()` before
/// reading or writing anything, and holds the returned [`TaskGuard`] for the
/// whole critical section. Tickets resolve strictly in acquisition order, so
/// a user command and a transport signal can never interleave their
/// mutations. Releasing happens in `Drop`, which makes it impossible to
/// forget on an early `?` return.
///
/// Once an operation holds a ticket it runs to completion; acquire futures
/// are only ever dropped before they are woken, never after.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<Mutex<TaskQueueInner>>,
}

struct TaskQueueInner {
    busy: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TaskQueueInner {
                busy: false,
                waiters: VecDeque::new(),
            })),
        }
    }

    /// Espera el turno y devuelve el ticket de la sección crítica.
    pub async fn acquire(&self) -> TaskGuard {
        let waiter = {
            let mut inner = self.inner.lock();
            if !inner.busy {
                inner.busy = true;
                None
            } else {
                let (tx, rx) = oneshot::channel();
                inner.waiters.push_back(tx);
                Some(rx)
            }
        };

        if let Some(rx) = waiter {
            // El guard saliente avisa por este canal; si el canal muere es
            // porque la cola entera fue descartada y no queda nada que proteger.
            let _ = rx.await;
        }

        TaskGuard {
            inner: self.inner.clone(),
        }
    }

    /// Cantidad de operaciones esperando turno.
    #[allow(dead_code)]
    pub fn pending(&self) -> usize {
        self.inner.lock().waiters.len()
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Ticket vivo; soltarlo despierta a la siguiente operación en la fila.
pub struct TaskGuard {
    inner: Arc<Mutex<TaskQueueInner>>,
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        loop {
            match inner.waiters.pop_front() {
                Some(next) => {
                    // Un receptor descartado ya no espera turno, probar el siguiente.
                    if next.send(()).is_ok() {
                        return;
                    }
                }
                None => {
                    inner.busy = false;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc as StdArc;
    use tokio::sync::Mutex as AsyncMutex;

    #[tokio::test]
    async fn test_acquire_resolves_in_fifo_order() {
        let queue = TaskQueue::new();
        let order = StdArc::new(AsyncMutex::new(Vec::new()));

        let first = queue.acquire().await;

        let mut handles = Vec::new();
        for i in 0..3 {
            let queue = queue.clone();
            let order = order.clone();
            handles.push(tokio::spawn(async move {
                let _ticket = queue.acquire().await;
                order.lock().await.push(i);
            }));
        }

        // Dejar que los tres queden encolados antes de soltar el primero.
        tokio::task::yield_now().await;
        assert_eq!(queue.pending(), 3);

        drop(first);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().await, vec![0, 1, 2]);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_guard_released_on_error_path() {
        let queue = TaskQueue::new();

        async fn failing_op(queue: &TaskQueue) -> Result<(), &'static str> {
            let _ticket = queue.acquire().await;
            Err("boom")
        }

        assert!(failing_op(&queue).await.is_err());

        // El ticket se soltó a pesar del error; el siguiente no se bloquea.
        let _next = queue.acquire().await;
    }

    #[tokio::test]
    async fn test_dropped_waiter_is_skipped() {
        let queue = TaskQueue::new();
        let first = queue.acquire().await;

        let abandoned = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let _ticket = queue.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        abandoned.abort();
        let _ = abandoned.await;

        let survivor = {
            let queue = queue.clone();
            tokio::spawn(async move {
                let _ticket = queue.acquire().await;
                42
            })
        };
        tokio::task::yield_now().await;

        drop(first);
        assert_eq!(survivor.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_sequential_acquires_do_not_block() {
        let queue = TaskQueue::new();
        for _ in 0..5 {
            let ticket = queue.acquire().await;
            drop(ticket);
        }
        assert_eq!(queue.pending(), 0);
    }
}

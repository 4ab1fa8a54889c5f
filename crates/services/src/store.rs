//! Observable value container shared between services and the UI layer.

use tokio::sync::watch;

/// Holds a value and notifies subscribers whenever it changes.
///
/// Subscribers get a `watch::Receiver`, so a slow reader only ever sees the
/// latest value rather than a backlog of intermediate ones.
#[derive(Debug)]
pub struct Store<T> {
    tx: watch::Sender<T>,
}

impl<T> Store<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Mutate in place; subscribers are notified only when `f` returns true.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    /// Read the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }
}

impl<T: Clone> Store<T> {
    #[must_use]
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }
}

impl<T: Default> Default for Store<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_update_change_the_value() {
        let store = Store::new(1_u32);
        store.set(2);
        store.update(|v| *v += 3);
        assert_eq!(store.get(), 5);
        assert_eq!(store.with(|v| *v * 2), 10);
    }

    #[tokio::test]
    async fn subscribers_see_latest_value() {
        let store = Store::new(String::from("a"));
        let mut rx = store.subscribe();

        store.set("b".into());
        store.set("c".into());
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), "c");
    }

    #[tokio::test]
    async fn update_if_false_does_not_notify() {
        let store = Store::new(0_u32);
        let mut rx = store.subscribe();

        assert!(!store.update_if(|_| false));
        assert!(!rx.has_changed().unwrap());

        assert!(store.update_if(|v| {
            *v = 9;
            true
        }));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), 9);
    }
}

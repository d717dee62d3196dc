use parking_lot::Mutex;
use std::sync::{Arc, Weak};

/// Shared, lock-protected state handed to pollers and views.
pub type Shared<T> = Arc<Mutex<T>>;

/// Non-owning handle: lets a background task notice its owner is gone.
pub type WeakShared<T> = Weak<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

//! Registration with the engine's list of input listeners.

use log::info;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u32);

/// The engine-owned listener list.
pub trait InputListeners {
    fn position(&self, id: ListenerId) -> Option<usize>;
    fn push(&mut self, id: ListenerId);
    fn remove_at(&mut self, index: usize);
}

impl InputListeners for Vec<ListenerId> {
    fn position(&self, id: ListenerId) -> Option<usize> {
        self.iter().position(|entry| *entry == id)
    }

    fn push(&mut self, id: ListenerId) {
        Vec::push(self, id);
    }

    fn remove_at(&mut self, index: usize) {
        self.remove(index);
    }
}

/// Adds or removes `id`. Adding an already present listener and removing
/// an absent one are no-ops. Returns whether the list changed.
pub fn register_listener(listeners: &mut dyn InputListeners, id: ListenerId, register: bool) -> bool {
    match (register, listeners.position(id)) {
        (true, None) => {
            listeners.push(id);
            info!("registered for input events");
            true
        }
        (false, Some(index)) => {
            listeners.remove_at(index);
            info!("unregistered from input events");
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_keeps_one_entry() {
        let mut listeners: Vec<ListenerId> = vec![ListenerId(1)];
        assert!(register_listener(&mut listeners, ListenerId(9), true));
        assert!(!register_listener(&mut listeners, ListenerId(9), true));
        assert_eq!(listeners, vec![ListenerId(1), ListenerId(9)]);
    }

    #[test]
    fn unregistering_removes_only_our_entry() {
        let mut listeners: Vec<ListenerId> = vec![ListenerId(9), ListenerId(1)];
        assert!(register_listener(&mut listeners, ListenerId(9), false));
        assert!(!register_listener(&mut listeners, ListenerId(9), false));
        assert_eq!(listeners, vec![ListenerId(1)]);
    }
}

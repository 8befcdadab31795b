//! DictionaryHub: owner of the current dictionary and its observers
//!
//! Subscribers (live views, the suggestion popover, the reading-mode
//! renderer) register a callback and are notified after every publish.
//! Everything runs on the host's event thread, so the hub uses `Rc`/`RefCell`.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::ShortcodeDictionary;

pub type SubscriberId = u64;

type Callback = Rc<dyn Fn(&Rc<ShortcodeDictionary>)>;

/// Observer registry for dictionary updates
pub struct DictionaryHub {
    current: RefCell<Option<Rc<ShortcodeDictionary>>>,
    subscribers: RefCell<Vec<(SubscriberId, Callback)>>,
    next_id: Cell<SubscriberId>,
}

impl DictionaryHub {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            current: RefCell::new(None),
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        })
    }

    /// The dictionary published last, if any
    pub fn current(&self) -> Option<Rc<ShortcodeDictionary>> {
        self.current.borrow().clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.current.borrow().is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Register a callback fired after every publish.
    ///
    /// The returned guard unsubscribes when cancelled or dropped.
    pub fn subscribe<F>(self: &Rc<Self>, callback: F) -> Subscription
    where
        F: Fn(&Rc<ShortcodeDictionary>) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push((id, Rc::new(callback)));

        Subscription {
            hub: Rc::downgrade(self),
            id,
            active: true,
        }
    }

    /// Remove a subscriber. Safe to call for unknown or already removed ids.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Replace the current dictionary and notify every subscriber
    pub fn publish(&self, dictionary: ShortcodeDictionary) {
        let dictionary = Rc::new(dictionary);
        tracing::info!(entries = dictionary.len(), "shortcode dictionary published");
        *self.current.borrow_mut() = Some(dictionary.clone());

        // Snapshot: callbacks may unsubscribe (themselves or others) while we iterate
        let snapshot: Vec<(SubscriberId, Callback)> = self.subscribers.borrow().clone();
        for (id, callback) in snapshot {
            let still_registered = self.subscribers.borrow().iter().any(|(sid, _)| *sid == id);
            if still_registered {
                callback(&dictionary);
            }
        }
    }
}

/// Guard for one hub subscription
pub struct Subscription {
    hub: Weak<DictionaryHub>,
    id: SubscriberId,
    active: bool,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Unsubscribe. Idempotent; a no-op once the hub is gone.
    pub fn cancel(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

// ==================== TESTS ====================

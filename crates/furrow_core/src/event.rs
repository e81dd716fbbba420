//! Typed publish/subscribe
//!
//! Listeners are closures keyed by the event type they accept. Dispatch is
//! synchronous and runs listeners in subscription order.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&dyn Any)>;

pub struct EventBus {
    next_id: u64,
    listeners: HashMap<TypeId, Vec<(ListenerId, Listener)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: HashMap::new(),
        }
    }

    /// Register `listener` for events of type `E`.
    pub fn subscribe<E, F>(&mut self, mut listener: F) -> ListenerId
    where
        E: 'static,
        F: FnMut(&E) + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;

        let erased: Listener = Box::new(move |event: &dyn Any| {
            if let Some(event) = event.downcast_ref::<E>() {
                listener(event);
            }
        });
        self.listeners
            .entry(TypeId::of::<E>())
            .or_default()
            .push((id, erased));
        id
    }

    /// Remove a listener. Returns false when the id is unknown.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        for list in self.listeners.values_mut() {
            if let Some(index) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(index);
                return true;
            }
        }
        false
    }

    /// Deliver `event` to every listener of its type; returns how many ran.
    pub fn dispatch<E: 'static>(&mut self, event: &E) -> usize {
        let Some(list) = self.listeners.get_mut(&TypeId::of::<E>()) else {
            return 0;
        };
        for (_, listener) in list.iter_mut() {
            listener(event);
        }
        list.len()
    }

    pub fn listener_count<E: 'static>(&self) -> usize {
        self.listeners
            .get(&TypeId::of::<E>())
            .map_or(0, |list| list.len())
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("event_types", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Ping(u32);
    struct Pong;

    #[test]
    fn dispatch_reaches_only_matching_type() {
        let mut bus = EventBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe::<Ping, _>(move |ping| sink.borrow_mut().push(ping.0));

        assert_eq!(bus.dispatch(&Ping(7)), 1);
        assert_eq!(bus.dispatch(&Pong), 0);
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let count = Rc::new(RefCell::new(0));

        let c = count.clone();
        let id = bus.subscribe::<Pong, _>(move |_| *c.borrow_mut() += 1);
        bus.dispatch(&Pong);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.dispatch(&Pong);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count::<Pong>(), 0);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let mut bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let o = order.clone();
            bus.subscribe::<Ping, _>(move |_| o.borrow_mut().push(tag));
        }
        bus.dispatch(&Ping(0));
        assert_eq!(*order.borrow(), vec!["a", "b", "c"]);
    }
}

//! Capabilities of event producers.

use crate::on_event::OnEvent;

/// Something events can be sent to.
pub trait EventSender<E> {
    /// Send an event.
    fn send(&self, event: E);
}

/// Something that supplies events to receivers.
pub trait EventSupplier<E> {
    /// A registrar for the supplied events.
    fn on_event(&self) -> OnEvent<E>;
}

//! Extra supply dependencies of registrations.

use ripple_supply::Supply;

use crate::on_event::OnEvent;
use crate::receiver::EventReceiver;

/// Make every registration depend on `required`.
///
/// Registrations are cut off with the reason of `required` when it goes off.
/// If it is off already, registrations end right away.
pub fn supply_on<E: 'static>(required: &Supply) -> impl FnOnce(&OnEvent<E>) -> OnEvent<E> {
    let required = required.clone();
    move |source| {
        let source = source.clone();
        OnEvent::new(move |receiver: EventReceiver<E>| {
            receiver.supply().needs(&required);
            source.register(receiver)
        })
    }
}

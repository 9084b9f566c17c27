//! Filtering of events by a predicate.

use std::rc::Rc;

use crate::on_event::OnEvent;
use crate::receiver::EventReceiver;

/// Pass through the events matching `predicate`.
///
/// Recurrent events are filtered by the same predicate.
pub fn filter<E, P>(predicate: P) -> impl FnOnce(&OnEvent<E>) -> OnEvent<E>
where
    E: 'static,
    P: Fn(&E) -> bool + 'static,
{
    move |source| {
        let source = source.clone();
        let predicate = Rc::new(predicate);

        OnEvent::new(move |downstream: EventReceiver<E>| {
            let predicate = Rc::clone(&predicate);
            let supply = downstream.supply().clone();

            source.register(EventReceiver::with_supply(supply, move |context, event| {
                if !predicate(event) {
                    return;
                }
                let predicate = Rc::clone(&predicate);
                let context = context.map(move |event: &E, emit: &dyn Fn(&E)| {
                    if predicate(event) {
                        emit(event);
                    }
                });
                downstream.receive(&context, event);
            }))
        })
    }
}

//! Operators over registrars.
//!
//! An operator is a function taking a registrar and returning a new one,
//! applied with [`OnEvent::pipe`](crate::OnEvent::pipe) or, for several at
//! once, with [`pipe!`](crate::pipe!). Each function here returns such an
//! operator.

mod filter;
mod share;
mod supply_on;
mod thru;

pub use filter::filter;
pub use share::share;
pub use supply_on::supply_on;
pub use thru::{Pass, dig, map, thru};

/// Apply operators to a registrar, left to right.
///
/// `pipe!(source, first, second)` is `source.pipe(first).pipe(second)`.
///
/// ```
/// use ripple_events::{EventNotifier, operators, pipe};
///
/// let notifier = EventNotifier::<u32>::new();
/// let labels = pipe!(
///     notifier.on_event(),
///     operators::filter(|n: &u32| n % 2 == 0),
///     operators::map(|n: &u32| format!("#{n}")),
/// );
/// labels.on(|label| assert_eq!(label, "#4"));
/// notifier.send(3);
/// notifier.send(4);
/// ```
#[macro_export]
macro_rules! pipe {
    ($source:expr, $first:expr $(, $rest:expr)* $(,)?) => {
        $source.pipe($first)$(.pipe($rest))*
    };
}

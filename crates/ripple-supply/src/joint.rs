//! Joint cutoff of several supplies.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::reason::OffReason;
use crate::supply::Supply;

/// Countdown shared by the parts of a joint supply.
///
/// The target is cut off when the last part goes off, with that part's
/// reason. Each part holds one listener entry; the target holds the keys to
/// unhook them if it goes off first.
pub(crate) struct Joint {
    target: Supply,
    remaining: Cell<usize>,
    last: RefCell<Option<OffReason>>,
}

impl Joint {
    pub(crate) fn new(target: Supply, parts: usize) -> Self {
        Self {
            target,
            remaining: Cell::new(parts),
            last: RefCell::new(None),
        }
    }

    pub(crate) fn attach(this: &Rc<Self>, part: &Supply) {
        let joint = Rc::clone(this);
        let Some(key) = part.listen(Box::new(move |reason| joint.part_off(reason))) else {
            return;
        };

        let part = part.downgrade();
        this.target.listen(Box::new(move |_| {
            if let Some(part) = part.upgrade() {
                part.unlisten(key);
            }
        }));
    }

    fn part_off(&self, reason: &OffReason) {
        *self.last.borrow_mut() = Some(reason.clone());

        let remaining = self.remaining.get().saturating_sub(1);
        self.remaining.set(remaining);
        if remaining == 0 {
            let reason = self.last.borrow_mut().take().unwrap_or_default();
            self.target.off(reason);
        }
    }
}

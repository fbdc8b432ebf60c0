use crossbeam_channel::{bounded, Receiver, Sender};
use std::num::NonZeroUsize;

/// A counting admission gate capping the number of tasks in flight.
///
/// Permits are slots in a bounded channel: acquiring sends into it and
/// blocks once every slot is taken, dropping a [`Permit`] takes a slot back
/// out.
#[derive(Debug)]
pub struct Gate {
    slots: Sender<()>,
    release: Receiver<()>,
}

/// One admitted task; dropping it frees the slot
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a Gate,
}

impl Gate {
    pub fn new(permits: NonZeroUsize) -> Self {
        let (slots, release) = bounded(permits.get());
        Self { slots, release }
    }

    /// Blocks until a slot is free
    pub fn acquire(&self) -> Permit<'_> {
        // both channel halves live in self, so the send cannot fail
        let _ = self.slots.send(());
        Permit { gate: self }
    }

    /// Number of permits currently held
    pub fn in_flight(&self) -> usize {
        self.slots.len()
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let _ = self.gate.release.recv();
    }
}

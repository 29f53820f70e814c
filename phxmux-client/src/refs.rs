use crate::model::Ref;

/// Issues the correlation refs of the outgoing frames. Refs are decimal
/// strings of a counter starting at 1.
#[derive(Debug)]
pub struct RefAllocator {
    counter: u64,
}

impl Default for RefAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl RefAllocator {
    pub fn new() -> Self {
        RefAllocator { counter: 1 }
    }

    /// Returns the current value and increments the counter.
    pub fn next(&mut self) -> Ref {
        let r = self.counter;
        self.counter += 1;

        r.to_string()
    }

    /// Starts over from 1, used when a new connection is opened.
    pub fn reset(&mut self) {
        self.counter = 1;
    }
}

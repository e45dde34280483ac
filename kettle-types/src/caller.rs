use alloy_primitives::Address;

/// Ordered chain of addresses describing the nested confidential calls that
/// led to the current precompile invocation.
///
/// The stack is immutable; entering a nested call produces a new stack via
/// [`CallerStack::pushed`]. An empty stack means execution is not inside a
/// confidential context at all. Entries may be `None` for frames that carry
/// no caller (e.g. the outermost dispatch frame).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerStack {
    frames: Vec<Option<Address>>,
}

impl CallerStack {
    #[must_use]
    pub const fn new() -> Self {
        Self { frames: Vec::new() }
    }

    #[must_use]
    pub fn from_frames(frames: Vec<Option<Address>>) -> Self {
        Self { frames }
    }

    /// Returns a new stack with `caller` pushed on top, leaving `self` untouched
    #[must_use]
    pub fn pushed(&self, caller: Option<Address>) -> Self {
        let mut frames = self.frames.clone();
        frames.push(caller);
        Self { frames }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Resolves the effective caller for an access-control decision: the most
    /// recent frame that is neither empty nor the precompile currently
    /// executing. Skipping the executing address ignores self-referential
    /// re-entrant frames.
    ///
    /// Can resolve to the zero address in fringe cases where every frame is
    /// empty or self-referential.
    #[must_use]
    pub fn effective_caller(&self, executing: Address) -> Address {
        for frame in self.frames.iter().rev() {
            if let Some(caller) = frame {
                if *caller != executing {
                    return *caller;
                }
            }
        }
        Address::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRECOMPILE: Address = Address::repeat_byte(0x20);

    #[test]
    fn test_empty_stack_has_no_effective_caller() {
        let stack = CallerStack::new();
        assert!(stack.is_empty());
        assert_eq!(stack.effective_caller(PRECOMPILE), Address::ZERO);
    }

    #[test]
    fn test_most_recent_caller_wins() {
        let older = Address::repeat_byte(0x01);
        let newer = Address::repeat_byte(0x02);
        let stack = CallerStack::new()
            .pushed(Some(older))
            .pushed(Some(newer));
        assert_eq!(stack.effective_caller(PRECOMPILE), newer);
    }

    #[test]
    fn test_nil_frames_are_skipped() {
        let caller = Address::repeat_byte(0x01);
        let stack = CallerStack::new().pushed(Some(caller)).pushed(None);
        assert_eq!(stack.effective_caller(PRECOMPILE), caller);
    }

    #[test]
    fn test_executing_precompile_is_skipped() {
        let caller = Address::repeat_byte(0x01);
        let stack = CallerStack::new()
            .pushed(Some(caller))
            .pushed(Some(PRECOMPILE));
        assert_eq!(stack.effective_caller(PRECOMPILE), caller);
    }

    #[test]
    fn test_all_frames_nil_or_self_resolves_to_zero() {
        let stack = CallerStack::new().pushed(None).pushed(Some(PRECOMPILE));
        assert_eq!(stack.effective_caller(PRECOMPILE), Address::ZERO);
    }

    #[test]
    fn test_push_is_copy_on_write() {
        let base = CallerStack::new().pushed(Some(Address::repeat_byte(0x01)));
        let extended = base.pushed(Some(Address::repeat_byte(0x02)));
        assert_eq!(base.len(), 1);
        assert_eq!(extended.len(), 2);
    }
}

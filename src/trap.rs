/// A trap to be redirected into the guest.
///
/// Produced when the hypervisor fails to read guest memory on the guest's behalf (for
/// example an unmapped hart-mask pointer). The redirect mechanism of the host delivers it to
/// the guest's own trap handler and sets up the guest control flow itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrapInfo {
    /// Cause code, in `scause` encoding.
    pub scause: usize,
    /// Trap value, usually the faulting address.
    pub stval: usize,
    /// Program counter of the instruction the trap is reported against.
    pub sepc: usize,
}

impl TrapInfo {
    /// Load page fault.
    pub const LOAD_PAGE_FAULT: usize = 13;

    /// Creates a trap with the given cause and trap value. `sepc` is filled in later.
    pub const fn new(scause: usize, stval: usize) -> Self {
        Self {
            scause,
            stval,
            sepc: 0,
        }
    }

    /// Reports the trap against the instruction at `sepc`.
    pub const fn at(mut self, sepc: usize) -> Self {
        self.sepc = sepc;
        self
    }
}

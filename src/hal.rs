use crate::{GuestVirtAddr, PhysCpuMask, SbiArchVCpu, SbiVCpu, TrapInfo};

/// A fence requested on a set of physical CPUs on behalf of a guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoteFence {
    /// Instruction cache fence (`FENCE.I`).
    FenceI,
    /// Guest TLB flush of `[start, start + size)`.
    Vma {
        /// Start of the virtual address range.
        start: usize,
        /// Size of the range in bytes.
        size: usize,
    },
    /// Guest TLB flush of `[start, start + size)`, limited to one address space.
    VmaAsid {
        /// Start of the virtual address range.
        start: usize,
        /// Size of the range in bytes.
        size: usize,
        /// The address space id.
        asid: usize,
    },
}

/// The interfaces which the underlying software (kernel or hypervisor) must implement.
///
/// All methods may be called concurrently from every physical CPU running a vcpu of a VM.
pub trait SbiHal: Sync {
    /// Arms the timer of `vcpu` for its next event, at absolute time `next_cycle`.
    fn set_timer(&self, vcpu: &SbiVCpu, next_cycle: u64);

    /// Reads one machine word from guest memory at `gva` with the privilege of the guest.
    ///
    /// # Returns
    ///
    /// * `Err(TrapInfo)` - The access faulted; `sepc` of the trap is filled in by the caller.
    fn read_guest_ulong(&self, vcpu: &SbiVCpu, gva: GuestVirtAddr) -> Result<usize, TrapInfo>;

    /// Redirects `trap` into the guest's own trap handler, updating its control flow.
    fn redirect_trap<A: SbiArchVCpu>(&self, vcpu: &SbiVCpu, regs: &mut A, trap: &TrapInfo);

    /// Issues `fence` on every physical CPU in `cpus`.
    ///
    /// The hypervisor is responsible for translating CPU ids into host hart ids.
    fn remote_fence(&self, cpus: PhysCpuMask, fence: RemoteFence);

    /// Makes sure `vcpu` notices its pending interrupts or requests, waking it if it sleeps
    /// and forcing a guest exit if it is running.
    fn kick_vcpu(&self, vcpu: &SbiVCpu);
}

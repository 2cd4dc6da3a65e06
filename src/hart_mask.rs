use core::fmt;

use memory_addr::{def_usize_addr, def_usize_addr_formatter};

use crate::{SbiHal, SbiVCpu, SbiVm, TrapInfo};

def_usize_addr! {
    /// Guest virtual address.
    pub type GuestVirtAddr;
}

def_usize_addr_formatter! {
    GuestVirtAddr = "GVA:{}";
}

/// A set of logical hart ids of a VM, one bit per hart.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct HartMask(usize);

impl HartMask {
    /// Creates a mask from its raw bits, as read from guest memory.
    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    /// Adds `hart_id` to the mask. Ids that do not fit in the mask are ignored.
    pub fn insert(&mut self, hart_id: usize) {
        if hart_id < usize::BITS as usize {
            self.0 |= 1 << hart_id;
        }
    }

    /// Raw bits of the mask.
    pub const fn bits(&self) -> usize {
        self.0
    }

    /// Whether `hart_id` is in the mask.
    pub const fn contains(&self, hart_id: usize) -> bool {
        hart_id < usize::BITS as usize && self.0 & (1 << hart_id) != 0
    }

    /// Iterates the hart ids in the mask, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        SetBits(self.0)
    }
}

impl fmt::Debug for HartMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HartMask({:#x})", self.0)
    }
}

/// A set of host physical CPUs, one bit per CPU.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysCpuMask(usize);

impl PhysCpuMask {
    /// An empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Adds `cpu` to the set. CPUs that do not fit in the mask are ignored.
    pub fn insert(&mut self, cpu: usize) {
        if cpu < usize::BITS as usize {
            self.0 |= 1 << cpu;
        }
    }

    /// Raw bits of the set.
    pub const fn bits(&self) -> usize {
        self.0
    }

    /// Whether the set is empty.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Iterates the CPUs in the set, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        SetBits(self.0)
    }
}

impl fmt::Debug for PhysCpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysCpuMask({:#x})", self.0)
    }
}

/// Resolves the hart mask argument of a legacy SBI call.
///
/// `mask_addr` is either zero, selecting every online vcpu, or the guest virtual address of
/// the mask. A faulting read yields the trap to redirect, reported against `sepc`.
pub(crate) fn resolve_hart_mask<H: SbiHal>(
    hal: &H,
    vm: &SbiVm,
    vcpu: &SbiVCpu,
    mask_addr: usize,
    sepc: usize,
) -> Result<HartMask, TrapInfo> {
    if mask_addr == 0 {
        return Ok(vm.online_mask());
    }

    let gva = GuestVirtAddr::from_usize(mask_addr);
    hal.read_guest_ulong(vcpu, gva)
        .map(HartMask::from_bits)
        .map_err(|trap| {
            debug!(
                "vcpu[{}] failed to read hart mask at {:?}: scause {:#x}, redirecting",
                vcpu.id(),
                gva,
                trap.scause
            );
            trap.at(sepc)
        })
}

struct SetBits(usize);

impl Iterator for SetBits {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.0 == 0 {
            return None;
        }
        let bit = self.0.trailing_zeros() as usize;
        self.0 &= self.0 - 1;
        Some(bit)
    }
}

use core::sync::atomic::{fence, AtomicBool, AtomicUsize, Ordering};

use axerrno::{ax_err, AxResult};
use bitflags::bitflags;

use crate::forward::{ReturnCell, SbiReturnState};

/// Physical CPU id meaning "not scheduled anywhere".
const NOT_SCHEDULED: usize = usize::MAX;

bitflags! {
    /// Virtual-supervisor interrupts pending on a vcpu, laid out as in `hvip`.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VsInterrupts: usize {
        /// VS-level software interrupt (IPI).
        const SOFT = 1 << 2;
        /// VS-level timer interrupt.
        const TIMER = 1 << 6;
        /// VS-level external interrupt.
        const EXTERNAL = 1 << 10;
    }
}

bitflags! {
    /// Requests posted to a vcpu by other vcpus, handled on its next entry/exit boundary.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VCpuRequests: usize {
        /// Stop running the guest and sleep until woken up.
        const SLEEP = 1 << 0;
    }
}

/// The constant part of [`SbiVCpu`].
struct SbiVCpuInnerConst {
    /// The id of the VM this vcpu belongs to.
    vm_id: usize,
    /// The id of the vcpu, which is also the logical hart id seen by the guest.
    id: usize,
}

/// Per-vcpu counters.
#[derive(Debug, Default)]
pub struct VCpuStat {
    ecall_exits: AtomicUsize,
}

impl VCpuStat {
    /// Number of `ecall` traps handled for this vcpu.
    pub fn ecall_exits(&self) -> usize {
        self.ecall_exits.load(Ordering::Relaxed)
    }

    pub(crate) fn inc_ecall_exits(&self) {
        self.ecall_exits.fetch_add(1, Ordering::Relaxed);
    }
}

/// A virtual CPU as seen by the SBI layer.
///
/// This is the shared handle of a vcpu: it is `Sync` and usually lives in an `Arc` held by
/// the [`SbiVm`](crate::SbiVm). Other vcpus may only touch it through the narrow signals
/// below ([`Self::set_interrupt`], [`Self::request_power_off`], [`Self::make_request`]);
/// the register context of the vcpu is owned by the thread running it and never reachable
/// from here.
///
/// Every signal is a single atomic read-modify-write followed by a full fence, so a target
/// that is woken up or kicked afterwards always observes it.
pub struct SbiVCpu {
    /// The constant part of the vcpu.
    inner_const: SbiVCpuInnerConst,
    /// The physical CPU currently running this vcpu, or [`NOT_SCHEDULED`].
    phys_cpu: AtomicUsize,
    /// Set when the VM is shutting down.
    power_off: AtomicBool,
    /// Pending [`VsInterrupts`].
    pending_irqs: AtomicUsize,
    /// Pending [`VCpuRequests`].
    requests: AtomicUsize,
    /// State of the forward/return protocol.
    sbi_return: ReturnCell,
    stat: VCpuStat,
}

impl SbiVCpu {
    /// Create a new [`SbiVCpu`], not scheduled on any physical CPU.
    pub const fn new(vm_id: usize, id: usize) -> Self {
        Self {
            inner_const: SbiVCpuInnerConst { vm_id, id },
            phys_cpu: AtomicUsize::new(NOT_SCHEDULED),
            power_off: AtomicBool::new(false),
            pending_irqs: AtomicUsize::new(0),
            requests: AtomicUsize::new(0),
            sbi_return: ReturnCell::new(),
            stat: VCpuStat {
                ecall_exits: AtomicUsize::new(0),
            },
        }
    }

    /// Get the id of the vcpu.
    pub const fn id(&self) -> usize {
        self.inner_const.id
    }

    /// Get the id of the VM the vcpu belongs to.
    pub const fn vm_id(&self) -> usize {
        self.inner_const.vm_id
    }

    /// Get whether the vcpu is the BSP. We always assume the first vcpu (vcpu with id #0) is the BSP.
    pub const fn is_bsp(&self) -> bool {
        self.inner_const.id == 0
    }

    /// Get the physical CPU the vcpu is scheduled on, if any.
    pub fn phys_cpu(&self) -> Option<usize> {
        match self.phys_cpu.load(Ordering::Acquire) {
            NOT_SCHEDULED => None,
            cpu => Some(cpu),
        }
    }

    /// Bind the vcpu to the physical CPU `cpu`.
    ///
    /// `cpu` must fit in a [`PhysCpuMask`](crate::PhysCpuMask), otherwise remote fences
    /// could not reach it.
    pub fn bind(&self, cpu: usize) -> AxResult {
        if cpu >= usize::BITS as usize {
            return ax_err!(InvalidInput, "physical CPU id out of range");
        }
        match self.phys_cpu.compare_exchange(
            NOT_SCHEDULED,
            cpu,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(_) => ax_err!(BadState, "vcpu is already bound to a physical CPU"),
        }
    }

    /// Unbind the vcpu from its physical CPU.
    pub fn unbind(&self) -> AxResult {
        match self.phys_cpu.swap(NOT_SCHEDULED, Ordering::AcqRel) {
            NOT_SCHEDULED => ax_err!(BadState, "vcpu is not bound to a physical CPU"),
            _ => Ok(()),
        }
    }

    /// Marks `irq` pending on the vcpu.
    pub fn set_interrupt(&self, irq: VsInterrupts) {
        self.pending_irqs.fetch_or(irq.bits(), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Clears `irq` on the vcpu.
    pub fn unset_interrupt(&self, irq: VsInterrupts) {
        self.pending_irqs.fetch_and(!irq.bits(), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Get the interrupts currently pending on the vcpu.
    pub fn pending_interrupts(&self) -> VsInterrupts {
        VsInterrupts::from_bits_truncate(self.pending_irqs.load(Ordering::Acquire))
    }

    /// Asks the vcpu to stop running the guest for good.
    pub fn request_power_off(&self) {
        self.power_off.store(true, Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Whether the vcpu has been powered off.
    pub fn is_powered_off(&self) -> bool {
        self.power_off.load(Ordering::Acquire)
    }

    /// Posts `req` to the vcpu.
    pub fn make_request(&self, req: VCpuRequests) {
        self.requests.fetch_or(req.bits(), Ordering::Release);
        fence(Ordering::SeqCst);
    }

    /// Takes every request posted so far. Called by the vcpu itself on its entry/exit path.
    pub fn take_requests(&self) -> VCpuRequests {
        VCpuRequests::from_bits_truncate(self.requests.swap(0, Ordering::AcqRel))
    }

    /// Get the state of the forward/return protocol.
    pub fn return_state(&self) -> SbiReturnState {
        self.sbi_return.get()
    }

    /// Get the counters of the vcpu.
    pub fn stat(&self) -> &VCpuStat {
        &self.stat
    }

    pub(crate) fn sbi_return(&self) -> &ReturnCell {
        &self.sbi_return
    }
}

impl core::fmt::Debug for SbiVCpu {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SbiVCpu")
            .field("vm_id", &self.vm_id())
            .field("id", &self.id())
            .field("phys_cpu", &self.phys_cpu())
            .field("power_off", &self.is_powered_off())
            .field("pending_irqs", &self.pending_interrupts())
            .field("return_state", &self.return_state())
            .finish()
    }
}

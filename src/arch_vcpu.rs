use crate::GprIndex;

/// Architecture-specific register context of a trapping vCPU.
///
/// The hypervisor keeps the guest registers in whatever layout its world switch needs. This
/// trait is the narrow window the SBI dispatcher looks through: the eight registers of the
/// SBI calling convention and the guest program counter.
///
/// Only the thread running the vCPU holds `&mut` access to its register context. Other vCPUs
/// never touch it; they go through the atomic signals of [`SbiVCpu`](crate::SbiVCpu).
pub trait SbiArchVCpu {
    /// Reads one of `a0`-`a7`.
    fn gpr(&self, index: GprIndex) -> usize;

    /// Writes one of `a0`-`a7`.
    fn set_gpr(&mut self, index: GprIndex, val: usize);

    /// Gets the guest program counter (`sepc` of the trap).
    fn sepc(&self) -> usize;

    /// Sets the guest program counter.
    fn set_sepc(&mut self, sepc: usize);

    /// Advances the guest program counter by `instr_len` bytes.
    fn advance_pc(&mut self, instr_len: usize) {
        let sepc = self.sepc();
        self.set_sepc(sepc.wrapping_add(instr_len));
    }

    /// Sets the primary return value (`a0`) delivered to the guest.
    fn set_return_value(&mut self, val: usize) {
        self.set_gpr(GprIndex::A0, val);
    }
}

use crate::SbiArchVCpu;

/// Index of a general purpose register taking part in the SBI calling convention.
///
/// `a7` carries the extension id, `a6` the function id and `a0`-`a5` the arguments.
/// Results come back in `a0` (error) and `a1` (value).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum GprIndex {
    A0 = 0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
}

impl GprIndex {
    /// All argument/identifier registers in ABI order.
    pub const ALL: [GprIndex; 8] = [
        GprIndex::A0,
        GprIndex::A1,
        GprIndex::A2,
        GprIndex::A3,
        GprIndex::A4,
        GprIndex::A5,
        GprIndex::A6,
        GprIndex::A7,
    ];
}

/// A plain copy of the guest registers the SBI dispatcher looks at.
///
/// Hypervisors usually keep a full trap frame; this type is handy for the hosts that do not
/// and for tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GuestRegs {
    /// `a0`-`a7`.
    pub a: [usize; 8],
    /// Guest program counter of the trapping `ecall`.
    pub sepc: usize,
}

impl GuestRegs {
    /// Creates a register context for an `ecall` at `sepc`.
    pub const fn new(sepc: usize) -> Self {
        Self { a: [0; 8], sepc }
    }

    /// Loads extension id, function id and arguments in one go.
    pub fn with_call(mut self, eid: usize, fid: usize, args: [usize; 6]) -> Self {
        self.a[..6].copy_from_slice(&args);
        self.a[GprIndex::A6 as usize] = fid;
        self.a[GprIndex::A7 as usize] = eid;
        self
    }
}

impl SbiArchVCpu for GuestRegs {
    fn gpr(&self, index: GprIndex) -> usize {
        self.a[index as usize]
    }

    fn set_gpr(&mut self, index: GprIndex, val: usize) {
        self.a[index as usize] = val;
    }

    fn sepc(&self) -> usize {
        self.sepc
    }

    fn set_sepc(&mut self, sepc: usize) {
        self.sepc = sepc;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_call_layout() {
        let regs = GuestRegs::new(0x8020_0000).with_call(4, 0, [0x1000, 2, 3, 4, 5, 6]);
        assert_eq!(regs.gpr(GprIndex::A7), 4);
        assert_eq!(regs.gpr(GprIndex::A6), 0);
        assert_eq!(regs.gpr(GprIndex::A0), 0x1000);
        assert_eq!(regs.gpr(GprIndex::A5), 6);
        assert_eq!(regs.sepc(), 0x8020_0000);
    }
}

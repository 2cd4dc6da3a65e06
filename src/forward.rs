use core::sync::atomic::{AtomicU8, Ordering};

use crate::dispatch::{Handled, ECALL_INSN_LEN};
use crate::{
    GprIndex, SbiArchVCpu, SbiCall, SbiDispatcher, SbiExitReason, SbiForwardCall, SbiHal,
    SbiVCpu,
};

/// The state of the forward/return protocol of one vcpu.
///
/// ```text
/// Idle --forward--> AwaitingResult --complete--> Completed --next ecall--> Idle
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SbiReturnState {
    /// No call is pending on the monitor.
    Idle = 0,
    /// A call was forwarded, the monitor has not completed it yet.
    AwaitingResult = 1,
    /// The pending call was completed. Further completions are ignored.
    Completed = 2,
}

impl SbiReturnState {
    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::AwaitingResult,
            2 => Self::Completed,
            _ => Self::Idle,
        }
    }
}

/// Atomic cell holding a [`SbiReturnState`].
pub(crate) struct ReturnCell(AtomicU8);

impl ReturnCell {
    pub(crate) const fn new() -> Self {
        Self(AtomicU8::new(SbiReturnState::Idle as u8))
    }

    pub(crate) fn get(&self) -> SbiReturnState {
        SbiReturnState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// A new call was trapped: a completed call is done with.
    pub(crate) fn begin_call(&self) {
        // Nothing to do unless the previous call was completed.
        self.transition(SbiReturnState::Completed, SbiReturnState::Idle);
    }

    /// A call was forwarded to the monitor.
    pub(crate) fn forward(&self) {
        self.0
            .store(SbiReturnState::AwaitingResult as u8, Ordering::Release);
    }

    /// Claims the right to apply the result of the pending call.
    ///
    /// Returns `true` for exactly one caller per forwarded call.
    pub(crate) fn claim_completion(&self) -> bool {
        self.transition(SbiReturnState::AwaitingResult, SbiReturnState::Completed)
    }

    fn transition(&self, from: SbiReturnState, to: SbiReturnState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl<H: SbiHal> SbiDispatcher<H> {
    /// Hands `call` over to the VM monitor. The guest stays where it is until the call is
    /// completed.
    pub(crate) fn forward(&self, vcpu: &SbiVCpu, call: &SbiCall) -> Handled {
        vcpu.sbi_return().forward();
        Handled::exit(SbiExitReason::Forward(SbiForwardCall::from(call)))
    }

    /// Completes the call forwarded by `vcpu` with the results filled in by the monitor.
    ///
    /// The results land in `a0`/`a1` and the guest moves past its `ecall`. Only the first
    /// completion of a forwarded call does anything; later (duplicated) ones, completions
    /// without a pending call and completions for a powered-off vcpu leave the registers
    /// untouched.
    ///
    /// Returns whether the results were applied.
    pub fn complete<A: SbiArchVCpu>(
        &self,
        vcpu: &SbiVCpu,
        regs: &mut A,
        call: &SbiForwardCall,
    ) -> bool {
        if !vcpu.sbi_return().claim_completion() {
            debug!(
                "vcpu[{}] no pending SBI call, completion of eid {:#x} ignored",
                vcpu.id(),
                call.extension_id
            );
            return false;
        }
        if vcpu.is_powered_off() {
            debug!(
                "vcpu[{}] is powered off, completion of eid {:#x} dropped",
                vcpu.id(),
                call.extension_id
            );
            return false;
        }

        trace!(
            "vcpu[{}] sbi_return: eid {:#x} ret {:#x?}",
            vcpu.id(),
            call.extension_id,
            call.ret
        );
        regs.set_gpr(GprIndex::A0, call.ret[0]);
        regs.set_gpr(GprIndex::A1, call.ret[1]);
        regs.advance_pc(ECALL_INSN_LEN);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_machine() {
        let cell = ReturnCell::new();
        assert_eq!(cell.get(), SbiReturnState::Idle);
        // Nothing pending.
        assert!(!cell.claim_completion());

        cell.forward();
        assert_eq!(cell.get(), SbiReturnState::AwaitingResult);
        // A new trap while waiting does not drop the pending call.
        cell.begin_call();
        assert_eq!(cell.get(), SbiReturnState::AwaitingResult);

        assert!(cell.claim_completion());
        assert!(!cell.claim_completion());
        assert_eq!(cell.get(), SbiReturnState::Completed);

        cell.begin_call();
        assert_eq!(cell.get(), SbiReturnState::Idle);
    }
}

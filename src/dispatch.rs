use sbi_spec::binary::RET_ERR_NOT_SUPPORTED;

use crate::{SbiArchVCpu, SbiCall, SbiConfig, SbiExitReason, SbiHal, SbiVCpu, SbiVm};

/// Width of the `ecall` instruction. The guest program counter moves past it once the call
/// is done.
pub const ECALL_INSN_LEN: usize = 4;

/// What a handler did with a call.
pub(crate) struct Handled {
    pub(crate) exit: SbiExitReason,
    /// Whether the guest program counter should move past the `ecall`.
    pub(crate) advance_pc: bool,
}

impl Handled {
    /// Done in place, the guest continues after the `ecall`.
    pub(crate) const fn resume() -> Self {
        Self {
            exit: SbiExitReason::Nothing,
            advance_pc: true,
        }
    }

    /// A trap was redirected into the guest, which now continues in its trap handler.
    pub(crate) const fn redirected() -> Self {
        Self {
            exit: SbiExitReason::Nothing,
            advance_pc: false,
        }
    }

    /// The monitor has to act before the guest may continue.
    pub(crate) const fn exit(exit: SbiExitReason) -> Self {
        Self {
            exit,
            advance_pc: false,
        }
    }
}

/// Handles the SBI calls of the vcpus of a VM.
///
/// The dispatcher holds no per-call state, one instance can serve every vcpu of every VM
/// concurrently. Each call is handled on the thread running the trapping vcpu.
pub struct SbiDispatcher<H: SbiHal> {
    hal: H,
    config: SbiConfig,
}

impl<H: SbiHal> SbiDispatcher<H> {
    /// Create a new [`SbiDispatcher`].
    pub const fn new(hal: H, config: SbiConfig) -> Self {
        Self { hal, config }
    }

    /// Get the host services used by the dispatcher.
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Get the configuration of the dispatcher.
    pub fn config(&self) -> &SbiConfig {
        &self.config
    }

    /// Handles an `ecall` trapped from `vcpu`, whose register context is `regs`.
    ///
    /// Returns [`SbiExitReason::Nothing`] if the guest can be resumed right away. Any other
    /// reason has to be handled by the VM monitor first; a forwarded call is finished with
    /// [`Self::complete`].
    pub fn handle_ecall<A: SbiArchVCpu>(
        &self,
        vm: &SbiVm,
        vcpu: &SbiVCpu,
        regs: &mut A,
    ) -> SbiExitReason {
        let call = SbiCall::decode(regs);
        vcpu.sbi_return().begin_call();

        trace!(
            "vcpu[{}] sbi_call: eid {:#x} fid {:#x} param {:#x?} sepc {:#x}",
            vcpu.id(),
            call.extension_id,
            call.function_id,
            call.args,
            regs.sepc()
        );

        let handled = if !self.config.legacy_v01 {
            self.forward(vcpu, &call)
        } else if let Some(ext) = call.legacy_extension() {
            self.handle_legacy(ext, &call, vm, vcpu, regs)
        } else {
            warn!(
                "vcpu[{}] unsupported SBI extension id {:#x} function id {:#x}",
                vcpu.id(),
                call.extension_id,
                call.function_id
            );
            regs.set_return_value(RET_ERR_NOT_SUPPORTED);
            Handled::resume()
        };

        if handled.advance_pc {
            regs.advance_pc(ECALL_INSN_LEN);
        }
        vcpu.stat().inc_ecall_exits();

        handled.exit
    }
}

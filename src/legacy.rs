use crate::dispatch::Handled;
use crate::hart_mask::resolve_hart_mask;
use crate::{
    LegacyExtension, PhysCpuMask, RemoteFence, SbiArchVCpu, SbiCall, SbiDispatcher,
    SbiExitReason, SbiHal, SbiVCpu, SbiVm, SystemEvent, SystemEventKind, VCpuRequests,
    VsInterrupts, Xlen,
};

impl<H: SbiHal> SbiDispatcher<H> {
    /// Handles one of the SBI v0.1 legacy extensions.
    pub(crate) fn handle_legacy<A: SbiArchVCpu>(
        &self,
        ext: LegacyExtension,
        call: &SbiCall,
        vm: &SbiVm,
        vcpu: &SbiVCpu,
        regs: &mut A,
    ) -> Handled {
        match ext {
            // The console lives in user space.
            LegacyExtension::ConsoleGetchar | LegacyExtension::ConsolePutchar => {
                self.forward(vcpu, call)
            }
            LegacyExtension::SetTimer => {
                let next_cycle = match self.config().xlen {
                    Xlen::Rv32 => call.join_u64(),
                    Xlen::Rv64 => call.args[0] as u64,
                };
                self.hal().set_timer(vcpu, next_cycle);
                Handled::resume()
            }
            LegacyExtension::ClearIpi => {
                vcpu.unset_interrupt(VsInterrupts::SOFT);
                Handled::resume()
            }
            LegacyExtension::SendIpi => self.send_ipi(call, vm, vcpu, regs),
            LegacyExtension::RemoteFenceI => {
                self.remote_fence(call, vm, vcpu, regs, RemoteFence::FenceI)
            }
            LegacyExtension::RemoteSfenceVma => {
                let fence = RemoteFence::Vma {
                    start: call.args[1],
                    size: call.args[2],
                };
                self.remote_fence(call, vm, vcpu, regs, fence)
            }
            LegacyExtension::RemoteSfenceVmaAsid => {
                let fence = RemoteFence::VmaAsid {
                    start: call.args[1],
                    size: call.args[2],
                    asid: call.args[3],
                };
                self.remote_fence(call, vm, vcpu, regs, fence)
            }
            LegacyExtension::Shutdown => self.shutdown(vm, vcpu),
        }
    }

    fn send_ipi<A: SbiArchVCpu>(
        &self,
        call: &SbiCall,
        vm: &SbiVm,
        vcpu: &SbiVCpu,
        regs: &mut A,
    ) -> Handled {
        let mask = match resolve_hart_mask(self.hal(), vm, vcpu, call.args[0], regs.sepc()) {
            Ok(mask) => mask,
            Err(trap) => {
                self.hal().redirect_trap(vcpu, regs, &trap);
                return Handled::redirected();
            }
        };

        // Interrupts are part of the logical vcpu state, scheduled or not.
        for target in vm.vcpus_in_mask(mask) {
            target.set_interrupt(VsInterrupts::SOFT);
            self.hal().kick_vcpu(target);
        }
        Handled::resume()
    }

    fn remote_fence<A: SbiArchVCpu>(
        &self,
        call: &SbiCall,
        vm: &SbiVm,
        vcpu: &SbiVCpu,
        regs: &mut A,
        fence: RemoteFence,
    ) -> Handled {
        let mask = match resolve_hart_mask(self.hal(), vm, vcpu, call.args[0], regs.sepc()) {
            Ok(mask) => mask,
            Err(trap) => {
                self.hal().redirect_trap(vcpu, regs, &trap);
                return Handled::redirected();
            }
        };

        let mut cpus = PhysCpuMask::empty();
        for target in vm.vcpus_in_mask(mask) {
            match target.phys_cpu() {
                Some(cpu) => cpus.insert(cpu),
                None => debug!(
                    "vcpu[{}] {:?}: vcpu[{}] is not scheduled, skipped",
                    vcpu.id(),
                    fence,
                    target.id()
                ),
            }
        }
        self.hal().remote_fence(cpus, fence);
        Handled::resume()
    }

    fn shutdown(&self, vm: &SbiVm, vcpu: &SbiVCpu) -> Handled {
        info!("VM[{}] shutdown requested by vcpu[{}]", vm.id(), vcpu.id());

        vm.power_off_all();
        vm.make_all_vcpus_request(VCpuRequests::SLEEP, |target| self.hal().kick_vcpu(target));

        Handled::exit(SbiExitReason::SystemEvent(SystemEvent::new(
            SystemEventKind::Shutdown,
        )))
    }
}

// Copyright 2025 The Axvisor Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! AxSBI - Legacy SBI call dispatcher for RISC-V guests of ArceOS hypervisors.
//!
//! When a guest vCPU executes `ecall` from VS-mode, the hypervisor hands the trapping vCPU
//! to [`SbiDispatcher::handle_ecall`]. The dispatcher decodes the call from `a0`-`a7` and
//! either emulates it in place (timer, IPIs, remote fences, shutdown) or forwards it to the
//! user-space VM monitor, resuming the guest later through [`SbiDispatcher::complete`].
//!
//! # Features
//!
//! - SBI v0.1 legacy extension set
//! - Forward/return protocol with exactly-once completion
//! - Hart-mask decoding from guest memory, with trap redirection on faults
//! - Cross-vCPU signalling (IPI, power-off, sleep requests) through atomic per-vCPU flags
//! - Host services abstracted behind [`SbiHal`], guest registers behind [`SbiArchVCpu`]

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
extern crate log;

// Core modules
mod arch_vcpu; // Guest register context trait
mod call; // Call record decoding
mod config; // Dispatcher configuration
mod dispatch; // Call dispatcher
mod exit; // Exit reasons handed back to the hypervisor
mod forward; // Forward/return bridge
mod hal; // Host services used by the dispatcher
mod hart_mask; // Logical and physical hart masks
mod legacy; // Legacy extension handlers
mod regs; // Plain register context
mod trap; // Trap descriptor
mod vcpu; // Shared vCPU handle
mod vm; // VM-wide vCPU collection


// Public API exports
pub use arch_vcpu::SbiArchVCpu;
pub use call::{LegacyExtension, SbiCall};
pub use config::{SbiConfig, Xlen};
pub use dispatch::{SbiDispatcher, ECALL_INSN_LEN};
pub use exit::{SbiExitReason, SbiForwardCall, SystemEvent, SystemEventKind};
pub use forward::SbiReturnState;
pub use hal::{RemoteFence, SbiHal};
pub use hart_mask::{GuestVirtAddr, HartMask, PhysCpuMask};
pub use regs::{GprIndex, GuestRegs};
pub use trap::TrapInfo;
pub use vcpu::{SbiVCpu, VCpuRequests, VCpuStat, VsInterrupts};
pub use vm::SbiVm;

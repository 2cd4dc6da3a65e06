use sbi_spec::legacy;

use crate::{GprIndex, SbiArchVCpu};

/// One SBI call, decoded from the registers of the trapping vCPU.
///
/// Built once per trap; handlers read from it instead of going back to the registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SbiCall {
    /// Extension id, from `a7`.
    pub extension_id: usize,
    /// Function id, from `a6`. Unused by legacy extensions.
    pub function_id: usize,
    /// `a0`-`a5`.
    pub args: [usize; 6],
}

impl SbiCall {
    /// Decodes the call from the SBI calling convention registers.
    pub fn decode<A: SbiArchVCpu>(regs: &A) -> Self {
        let a = GprIndex::ALL.map(|idx| regs.gpr(idx));
        Self {
            extension_id: a[7],
            function_id: a[6],
            args: [a[0], a[1], a[2], a[3], a[4], a[5]],
        }
    }

    /// The legacy extension this call names, if any.
    pub fn legacy_extension(&self) -> Option<LegacyExtension> {
        LegacyExtension::from_eid(self.extension_id)
    }

    /// Joins `a0` (low half) and `a1` (high half) into a 64-bit value, as RV32 guests pass
    /// 64-bit SBI arguments.
    pub const fn join_u64(&self) -> u64 {
        ((self.args[1] as u64) << 32) | (self.args[0] as u64 & 0xffff_ffff)
    }
}

/// SBI v0.1 legacy extensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LegacyExtension {
    SetTimer,
    ConsolePutchar,
    ConsoleGetchar,
    ClearIpi,
    SendIpi,
    RemoteFenceI,
    RemoteSfenceVma,
    RemoteSfenceVmaAsid,
    Shutdown,
}

impl LegacyExtension {
    /// Looks up a legacy extension by extension id.
    pub const fn from_eid(eid: usize) -> Option<Self> {
        Some(match eid {
            legacy::LEGACY_SET_TIMER => Self::SetTimer,
            legacy::LEGACY_CONSOLE_PUTCHAR => Self::ConsolePutchar,
            legacy::LEGACY_CONSOLE_GETCHAR => Self::ConsoleGetchar,
            legacy::LEGACY_CLEAR_IPI => Self::ClearIpi,
            legacy::LEGACY_SEND_IPI => Self::SendIpi,
            legacy::LEGACY_REMOTE_FENCE_I => Self::RemoteFenceI,
            legacy::LEGACY_REMOTE_SFENCE_VMA => Self::RemoteSfenceVma,
            legacy::LEGACY_REMOTE_SFENCE_VMA_ASID => Self::RemoteSfenceVmaAsid,
            legacy::LEGACY_SHUTDOWN => Self::Shutdown,
            _ => return None,
        })
    }

    /// The extension id of this extension.
    pub const fn eid(self) -> usize {
        match self {
            Self::SetTimer => legacy::LEGACY_SET_TIMER,
            Self::ConsolePutchar => legacy::LEGACY_CONSOLE_PUTCHAR,
            Self::ConsoleGetchar => legacy::LEGACY_CONSOLE_GETCHAR,
            Self::ClearIpi => legacy::LEGACY_CLEAR_IPI,
            Self::SendIpi => legacy::LEGACY_SEND_IPI,
            Self::RemoteFenceI => legacy::LEGACY_REMOTE_FENCE_I,
            Self::RemoteSfenceVma => legacy::LEGACY_REMOTE_SFENCE_VMA,
            Self::RemoteSfenceVmaAsid => legacy::LEGACY_REMOTE_SFENCE_VMA_ASID,
            Self::Shutdown => legacy::LEGACY_SHUTDOWN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuestRegs;

    #[test]
    fn test_decode_reads_abi_registers() {
        let regs = GuestRegs::new(0).with_call(0x10, 3, [1, 2, 3, 4, 5, 6]);
        let call = SbiCall::decode(&regs);
        assert_eq!(call.extension_id, 0x10);
        assert_eq!(call.function_id, 3);
        assert_eq!(call.args, [1, 2, 3, 4, 5, 6]);
        assert_eq!(call.legacy_extension(), None);
    }

    #[test]
    fn test_legacy_ids_match_abi() {
        // The numbering is fixed by the SBI v0.1 ABI.
        let expected = [
            (0, LegacyExtension::SetTimer),
            (1, LegacyExtension::ConsolePutchar),
            (2, LegacyExtension::ConsoleGetchar),
            (3, LegacyExtension::ClearIpi),
            (4, LegacyExtension::SendIpi),
            (5, LegacyExtension::RemoteFenceI),
            (6, LegacyExtension::RemoteSfenceVma),
            (7, LegacyExtension::RemoteSfenceVmaAsid),
            (8, LegacyExtension::Shutdown),
        ];
        for (eid, ext) in expected {
            assert_eq!(LegacyExtension::from_eid(eid), Some(ext));
            assert_eq!(ext.eid(), eid);
        }
        assert_eq!(LegacyExtension::from_eid(9), None);
    }

    #[test]
    fn test_join_u64() {
        let call = SbiCall {
            extension_id: 0,
            function_id: 0,
            args: [0x0000_0001, 0x0000_0002, 0, 0, 0, 0],
        };
        assert_eq!(call.join_u64(), 0x0000_0002_0000_0001);
    }
}

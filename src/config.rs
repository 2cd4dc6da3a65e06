/// Register width of the guest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Xlen {
    /// RV32: 64-bit SBI values are split across two argument registers.
    Rv32,
    /// RV64.
    Rv64,
}

impl Xlen {
    /// The register width of the host.
    pub const fn host() -> Self {
        if usize::BITS == 32 {
            Xlen::Rv32
        } else {
            Xlen::Rv64
        }
    }
}

impl Default for Xlen {
    fn default() -> Self {
        Self::host()
    }
}

/// Configuration of an [`SbiDispatcher`](crate::SbiDispatcher).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SbiConfig {
    /// Guest register width.
    pub xlen: Xlen,
    /// Emulate the SBI v0.1 legacy extensions in the hypervisor.
    ///
    /// When disabled, every `ecall` is forwarded to the VM monitor as is.
    pub legacy_v01: bool,
}

impl Default for SbiConfig {
    fn default() -> Self {
        Self {
            xlen: Xlen::host(),
            legacy_v01: true,
        }
    }
}

use crate::SbiCall;

#[allow(unused_imports)] // used in doc
use super::SbiDispatcher;

/// The result of [`SbiDispatcher::handle_ecall`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum SbiExitReason {
    /// The call was handled (or redirected into the guest as a trap), the vcpu may resume.
    Nothing,
    /// The call must be completed by the user-space VM monitor.
    ///
    /// The guest must not be resumed until the monitor hands the envelope back through
    /// [`SbiDispatcher::complete`].
    Forward(SbiForwardCall),
    /// The guest reached a VM lifecycle milestone the monitor has to act on.
    SystemEvent(SystemEvent),
}

impl SbiExitReason {
    /// Whether the guest can be resumed right away.
    pub const fn resume_guest(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    /// Numeric form of [`Self::resume_guest`]: `0` to exit to the monitor, `1` to resume.
    pub const fn status(&self) -> i32 {
        self.resume_guest() as i32
    }
}

/// A SBI call forwarded to the VM monitor.
///
/// Created at forward time and consumed exactly once when the monitor completes the call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SbiForwardCall {
    /// The extension id (`a7`).
    pub extension_id: usize,
    /// The function id (`a6`).
    pub function_id: usize,
    /// The arguments (`a0`-`a5`).
    pub args: [usize; 6],
    /// The values to be returned in `a0` and `a1`.
    ///
    /// Pre-populated with the caller's own `a0`/`a1`, the monitor may overwrite them.
    pub ret: [usize; 2],
}

impl From<&SbiCall> for SbiForwardCall {
    fn from(call: &SbiCall) -> Self {
        Self {
            extension_id: call.extension_id,
            function_id: call.function_id,
            args: call.args,
            ret: [call.args[0], call.args[1]],
        }
    }
}

/// Kinds of [`SystemEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SystemEventKind {
    /// The whole VM should be powered off.
    Shutdown,
}

/// A VM lifecycle event delivered to the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SystemEvent {
    /// The kind of the event.
    pub kind: SystemEventKind,
    /// Event-specific flags. Always zero for now.
    pub flags: u64,
}

impl SystemEvent {
    /// Creates an event of `kind` with every other field zeroed.
    pub const fn new(kind: SystemEventKind) -> Self {
        Self { kind, flags: 0 }
    }
}

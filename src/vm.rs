use alloc::{sync::Arc, vec::Vec};

use axerrno::{ax_err, AxResult};

use crate::{HartMask, SbiVCpu, VCpuRequests};

/// The vcpus of one VM, as seen by the SBI layer.
///
/// The collection is built once when the VM is assembled and is read-only afterwards; the
/// dispatcher only reaches into other vcpus through the signals of [`SbiVCpu`].
pub struct SbiVm {
    id: usize,
    vcpus: Vec<Arc<SbiVCpu>>,
}

impl SbiVm {
    /// Create a VM from its vcpus, in creation order.
    ///
    /// Every vcpu must belong to VM `id` and carry a distinct hart id that a legacy hart
    /// mask can name.
    pub fn new(id: usize, vcpus: Vec<Arc<SbiVCpu>>) -> AxResult<Self> {
        if vcpus.is_empty() {
            return ax_err!(InvalidInput, "VM has no vcpu");
        }
        for (i, vcpu) in vcpus.iter().enumerate() {
            if vcpu.vm_id() != id {
                return ax_err!(InvalidInput, "vcpu belongs to another VM");
            }
            if vcpu.id() >= usize::BITS as usize {
                return ax_err!(InvalidInput, "vcpu id out of hart mask range");
            }
            if vcpus[..i].iter().any(|other| other.id() == vcpu.id()) {
                return ax_err!(AlreadyExists, "duplicated vcpu id");
            }
        }
        Ok(Self { id, vcpus })
    }

    /// Create a VM with `count` fresh vcpus numbered `0..count`.
    pub fn with_vcpus(id: usize, count: usize) -> AxResult<Self> {
        Self::new(id, (0..count).map(|i| Arc::new(SbiVCpu::new(id, i))).collect())
    }

    /// Get the id of the VM.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Number of vcpus online.
    pub fn online_vcpus(&self) -> usize {
        self.vcpus.len()
    }

    /// The mask naming every online vcpu by its hart id.
    pub fn online_mask(&self) -> HartMask {
        let mut mask = HartMask::default();
        for vcpu in &self.vcpus {
            mask.insert(vcpu.id());
        }
        mask
    }

    /// Iterates the vcpus in creation order.
    pub fn vcpus(&self) -> impl Iterator<Item = &Arc<SbiVCpu>> {
        self.vcpus.iter()
    }

    /// Looks up a vcpu by hart id.
    pub fn vcpu_by_id(&self, id: usize) -> Option<&Arc<SbiVCpu>> {
        self.vcpus.iter().find(|vcpu| vcpu.id() == id)
    }

    /// Iterates the vcpus named by `mask`. Hart ids without a vcpu are skipped.
    pub fn vcpus_in_mask(&self, mask: HartMask) -> impl Iterator<Item = &Arc<SbiVCpu>> {
        mask.iter().filter_map(move |id| {
            let vcpu = self.vcpu_by_id(id);
            if vcpu.is_none() {
                debug!("VM[{}] hart mask names unknown hart {}, skipped", self.id, id);
            }
            vcpu
        })
    }

    /// Sets the power-off flag of every vcpu, including the caller.
    pub fn power_off_all(&self) {
        for vcpu in &self.vcpus {
            vcpu.request_power_off();
        }
    }

    /// Posts `req` to every vcpu, then calls `kick` on each of them.
    ///
    /// Every request is visible to its target before the target is kicked.
    pub fn make_all_vcpus_request<F>(&self, req: VCpuRequests, kick: F)
    where
        F: Fn(&SbiVCpu),
    {
        for vcpu in &self.vcpus {
            vcpu.make_request(req);
        }
        for vcpu in &self.vcpus {
            kick(vcpu);
        }
    }
}

impl core::fmt::Debug for SbiVm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SbiVm")
            .field("id", &self.id)
            .field("vcpus", &self.vcpus)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axerrno::AxError;
    use core::cell::RefCell;

    #[test]
    fn test_vm_creation() {
        let vm = SbiVm::with_vcpus(2, 4).unwrap();
        assert_eq!(vm.id(), 2);
        assert_eq!(vm.online_vcpus(), 4);
        assert_eq!(vm.vcpus().map(|v| v.id()).collect::<Vec<_>>(), [0, 1, 2, 3]);
        assert_eq!(vm.vcpu_by_id(3).map(|v| v.id()), Some(3));
        assert!(vm.vcpu_by_id(4).is_none());
    }

    #[test]
    fn test_vm_creation_failure() {
        assert_eq!(SbiVm::with_vcpus(1, 0).unwrap_err(), AxError::InvalidInput);

        let dup = vec![Arc::new(SbiVCpu::new(1, 0)), Arc::new(SbiVCpu::new(1, 0))];
        assert_eq!(SbiVm::new(1, dup).unwrap_err(), AxError::AlreadyExists);

        let foreign = vec![Arc::new(SbiVCpu::new(1, 0)), Arc::new(SbiVCpu::new(7, 1))];
        assert_eq!(SbiVm::new(1, foreign).unwrap_err(), AxError::InvalidInput);

        let wide = vec![Arc::new(SbiVCpu::new(1, usize::BITS as usize))];
        assert_eq!(SbiVm::new(1, wide).unwrap_err(), AxError::InvalidInput);
    }

    #[test]
    fn test_online_mask() {
        assert_eq!(SbiVm::with_vcpus(1, 3).unwrap().online_mask().bits(), 0b111);

        let top = usize::BITS as usize - 1;
        let sparse = vec![
            Arc::new(SbiVCpu::new(1, 5)),
            Arc::new(SbiVCpu::new(1, 0)),
            Arc::new(SbiVCpu::new(1, top)),
        ];
        let vm = SbiVm::new(1, sparse).unwrap();
        assert_eq!(vm.online_mask().bits(), 1 << top | 0b10_0001);
    }

    #[test]
    fn test_vcpus_in_mask_skips_unknown_harts() {
        let vm = SbiVm::with_vcpus(1, 3).unwrap();
        let ids: Vec<_> = vm
            .vcpus_in_mask(HartMask::from_bits(0b1_0101))
            .map(|v| v.id())
            .collect();
        assert_eq!(ids, [0, 2]);
    }

    #[test]
    fn test_make_all_vcpus_request() {
        let vm = SbiVm::with_vcpus(1, 3).unwrap();
        let kicked = RefCell::new(Vec::new());
        vm.make_all_vcpus_request(VCpuRequests::SLEEP, |vcpu| {
            // The request is already visible when the vcpu is kicked.
            assert_eq!(vcpu.take_requests(), VCpuRequests::SLEEP);
            kicked.borrow_mut().push(vcpu.id());
        });
        assert_eq!(*kicked.borrow(), [0, 1, 2]);
    }
}

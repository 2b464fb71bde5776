//! Queue family resolution and queue retrieval.
//!
//! The default strategy picks the first queue family that supports graphics
//! and the first that supports compute, requests one queue per unique family
//! at device creation, and fetches queue 0 of each family afterwards.
//!
//! [`QueueSelection`] replaces all three steps when an application needs other
//! queues (a dedicated transfer family, say).

use crate::error::{Result, VkBaseError};
use crate::physical_device::PhysicalDeviceRef;
use ash::vk;

/// Anything that hands out queues of an existing logical device.
pub trait QueueSource {
    /// Get the queue at `queue_index` within `family_index`.
    ///
    /// The family must have been requested when the device was created.
    fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue;
}

impl QueueSource for ash::Device {
    fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue {
        // SAFETY: the device handle is valid for as long as `self` is borrowed.
        unsafe { self.get_device_queue(family_index, queue_index) }
    }
}

/// Queue family indices for graphics and compute work.
///
/// Both indices may refer to the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefaultQueueFamilyIndices {
    pub graphics: u32,
    pub compute: u32,
}

impl DefaultQueueFamilyIndices {
    /// Resolve indices from a queue family property list.
    ///
    /// Each capability takes the lowest index that supports it. Fails with
    /// [`VkBaseError::MissingQueueCapability`] when the list runs out before
    /// both are found.
    pub fn from_properties(properties: &[vk::QueueFamilyProperties]) -> Result<Self> {
        let mut graphics = None;
        let mut compute = None;

        for (index, family) in (0_u32..).zip(properties) {
            if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                graphics = Some(index);
            }
            if compute.is_none() && family.queue_flags.contains(vk::QueueFlags::COMPUTE) {
                compute = Some(index);
            }

            if let (Some(graphics), Some(compute)) = (graphics, compute) {
                return Ok(Self { graphics, compute });
            }
        }

        let mut missing = vk::QueueFlags::empty();
        if graphics.is_none() {
            missing |= vk::QueueFlags::GRAPHICS;
        }
        if compute.is_none() {
            missing |= vk::QueueFlags::COMPUTE;
        }

        Err(VkBaseError::MissingQueueCapability(missing))
    }

    /// Resolve indices from the queue families of a physical device.
    pub fn from_physical_device(device: PhysicalDeviceRef<'_>) -> Result<Self> {
        Self::from_properties(&device.queue_family_properties())
    }

    /// Families to request at device creation, without duplicates.
    pub fn unique_indices(&self) -> Vec<u32> {
        if self.graphics == self.compute {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.compute]
        }
    }
}

/// Graphics and compute queue handles, owned by the logical device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultQueues {
    pub graphics: vk::Queue,
    pub compute: vk::Queue,
}

impl DefaultQueues {
    /// Fetch queue 0 of each resolved family.
    pub fn fetch(source: &dyn QueueSource, indices: &DefaultQueueFamilyIndices) -> Self {
        Self {
            graphics: source.queue(indices.graphics, 0),
            compute: source.queue(indices.compute, 0),
        }
    }
}

type FamilyIndexGetter<I> = dyn Fn(PhysicalDeviceRef<'_>) -> Result<I>;
type UniqueIndexGetter<I> = dyn Fn(&I) -> Vec<u32>;
type QueueGetter<I, Q> = dyn Fn(&I, &dyn QueueSource) -> Q;

/// How queue families are chosen and how queues are fetched.
///
/// `I` is the index record resolved from a physical device and `Q` the queue
/// record fetched from the logical device.
pub struct QueueSelection<I, Q> {
    family_indices: Box<FamilyIndexGetter<I>>,
    unique_indices: Box<UniqueIndexGetter<I>>,
    queues: Box<QueueGetter<I, Q>>,
}

impl<I, Q> QueueSelection<I, Q> {
    /// Create a selection from its three steps.
    ///
    /// * `family_indices` - resolves the index record from a physical device
    /// * `unique_indices` - lists each family to create queues for, once
    /// * `queues` - fetches the queue record once the device exists
    pub fn new(
        family_indices: impl Fn(PhysicalDeviceRef<'_>) -> Result<I> + 'static,
        unique_indices: impl Fn(&I) -> Vec<u32> + 'static,
        queues: impl Fn(&I, &dyn QueueSource) -> Q + 'static,
    ) -> Self {
        Self {
            family_indices: Box::new(family_indices),
            unique_indices: Box::new(unique_indices),
            queues: Box::new(queues),
        }
    }

    pub(crate) fn family_indices(&self, device: PhysicalDeviceRef<'_>) -> Result<I> {
        (self.family_indices)(device)
    }

    pub(crate) fn unique_indices(&self, indices: &I) -> Vec<u32> {
        (self.unique_indices)(indices)
    }

    pub(crate) fn queues(&self, indices: &I, source: &dyn QueueSource) -> Q {
        (self.queues)(indices, source)
    }
}

impl Default for QueueSelection<DefaultQueueFamilyIndices, DefaultQueues> {
    fn default() -> Self {
        Self::new(
            DefaultQueueFamilyIndices::from_physical_device,
            DefaultQueueFamilyIndices::unique_indices,
            |indices, source| DefaultQueues::fetch(source, indices),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;

    fn family(flags: vk::QueueFlags) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        }
    }

    fn family_indices(graphics: u32, compute: u32) -> DefaultQueueFamilyIndices {
        DefaultQueueFamilyIndices { graphics, compute }
    }

    /// Hands out fake handles and remembers every request.
    #[derive(Default)]
    struct RecordingDevice {
        requests: RefCell<Vec<(u32, u32)>>,
    }

    impl RecordingDevice {
        fn handle(family_index: u32, queue_index: u32) -> vk::Queue {
            let raw = 0x1000 + u64::from(family_index) * 0x10 + u64::from(queue_index);
            vk::Queue::from_raw(raw)
        }
    }

    impl QueueSource for RecordingDevice {
        fn queue(&self, family_index: u32, queue_index: u32) -> vk::Queue {
            self.requests.borrow_mut().push((family_index, queue_index));
            Self::handle(family_index, queue_index)
        }
    }

    #[test]
    fn separate_graphics_and_compute_families() {
        let properties = [
            family(vk::QueueFlags::empty()),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];

        let indices = DefaultQueueFamilyIndices::from_properties(&properties).unwrap();

        assert_eq!(indices, family_indices(1, 2));
        assert_eq!(indices.unique_indices(), vec![1, 2]);
    }

    #[test]
    fn shared_graphics_and_compute_family() {
        let properties = [family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE)];

        let indices = DefaultQueueFamilyIndices::from_properties(&properties).unwrap();

        assert_eq!(indices, family_indices(0, 0));
        assert_eq!(indices.unique_indices(), vec![0]);
    }

    #[test]
    fn missing_graphics_family() {
        let properties = [family(vk::QueueFlags::COMPUTE)];

        let err = DefaultQueueFamilyIndices::from_properties(&properties).unwrap_err();

        assert!(matches!(
            err,
            VkBaseError::MissingQueueCapability(flags) if flags == vk::QueueFlags::GRAPHICS
        ));
    }

    #[test]
    fn missing_both_families() {
        let properties = [family(vk::QueueFlags::TRANSFER)];

        let err = DefaultQueueFamilyIndices::from_properties(&properties).unwrap_err();

        assert!(matches!(
            err,
            VkBaseError::MissingQueueCapability(flags)
                if flags == vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE
        ));
    }

    #[test]
    fn empty_property_list() {
        assert!(DefaultQueueFamilyIndices::from_properties(&[]).is_err());
    }

    #[test]
    fn first_matching_family_wins() {
        let properties = [
            family(vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::GRAPHICS),
            family(vk::QueueFlags::COMPUTE),
        ];

        let indices = DefaultQueueFamilyIndices::from_properties(&properties).unwrap();

        assert_eq!(indices, family_indices(1, 3));
    }

    #[test]
    fn compute_before_graphics() {
        let properties = [
            family(vk::QueueFlags::COMPUTE | vk::QueueFlags::TRANSFER),
            family(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE),
        ];

        let indices = DefaultQueueFamilyIndices::from_properties(&properties).unwrap();

        assert_eq!(indices, family_indices(1, 0));
        assert_eq!(indices.unique_indices(), vec![1, 0]);
    }

    #[test]
    fn fetch_uses_queue_zero_of_each_family() {
        let device = RecordingDevice::default();
        let indices = family_indices(1, 2);

        let queues = DefaultQueues::fetch(&device, &indices);

        assert_eq!(*device.requests.borrow(), vec![(1, 0), (2, 0)]);
        assert_eq!(queues.graphics, RecordingDevice::handle(1, 0));
        assert_eq!(queues.compute, RecordingDevice::handle(2, 0));
    }

    #[test]
    fn fetch_shared_family_returns_same_handle() {
        let device = RecordingDevice::default();
        let indices = family_indices(0, 0);

        let queues = DefaultQueues::fetch(&device, &indices);

        assert_eq!(queues.graphics, queues.compute);
    }

    #[test]
    fn default_selection_delegates_to_defaults() {
        let selection: QueueSelection<DefaultQueueFamilyIndices, DefaultQueues> =
            QueueSelection::default();
        let device = RecordingDevice::default();
        let indices = family_indices(3, 1);

        assert_eq!(selection.unique_indices(&indices), vec![3, 1]);

        let queues = selection.queues(&indices, &device);
        assert_eq!(queues.graphics, RecordingDevice::handle(3, 0));
        assert_eq!(queues.compute, RecordingDevice::handle(1, 0));
    }

    #[test]
    fn custom_selection() {
        struct TransferIndex(u32);
        struct TransferQueue(vk::Queue);

        let selection = QueueSelection::new(
            |_device| Ok(TransferIndex(4)),
            |index: &TransferIndex| vec![index.0],
            |index: &TransferIndex, source: &dyn QueueSource| {
                TransferQueue(source.queue(index.0, 0))
            },
        );
        let device = RecordingDevice::default();

        assert_eq!(selection.unique_indices(&TransferIndex(4)), vec![4]);

        let queue = selection.queues(&TransferIndex(4), &device);
        assert_eq!(queue.0, RecordingDevice::handle(4, 0));
        assert_eq!(*device.requests.borrow(), vec![(4, 0)]);
    }
}

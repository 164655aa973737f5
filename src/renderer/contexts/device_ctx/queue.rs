use ash::vk;

/// Capabilities of one queue family as reported for a physical device and surface
#[derive(Debug, Clone, Copy)]
pub struct QueueFamily {
    pub index: u32,
    pub properties: vk::QueueFamilyProperties,
    supports_present: bool,
}

impl QueueFamily {
    pub fn new(
        index: u32,
        properties: vk::QueueFamilyProperties,
        supports_present: bool
    ) -> Self {
        Self {
            index,
            properties,
            supports_present,
        }
    }

    pub fn supports_present(&self) -> bool {
        self.supports_present
    }

    pub fn supports_graphics(&self) -> bool {
        self.properties.queue_flags.contains(vk::QueueFlags::GRAPHICS)
    }

    pub fn queue_count(&self) -> u32 {
        self.properties.queue_count
    }
}

/// Queue families chosen for a device. Graphics and present may be the same family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilyIndices {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// One entry per distinct family, graphics first
    pub fn unique(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }

    /// Families that must share swapchain images, empty when one family does both jobs
    pub fn concurrent_families(&self) -> Vec<u32> {
        if self.is_shared() {
            Vec::new()
        } else {
            self.unique()
        }
    }
}

/// Graphics is the first family with graphics support and at least one queue. Present is
/// that same family when it can present, otherwise the first family that can.
pub fn find_queue_families(families: &[QueueFamily]) -> Option<QueueFamilyIndices> {
    let graphics = families
        .iter()
        .find(|family| family.supports_graphics() && family.queue_count() > 0)?;

    let present = if graphics.supports_present() {
        graphics
    } else {
        families
            .iter()
            .find(|family| family.supports_present() && family.queue_count() > 0)?
    };

    Some(QueueFamilyIndices {
        graphics: graphics.index,
        present: present.index,
    })
}

#[cfg(test)]
pub(crate) fn family(index: u32, flags: vk::QueueFlags, present: bool) -> QueueFamily {
    QueueFamily::new(
        index,
        vk::QueueFamilyProperties {
            queue_flags: flags,
            queue_count: 1,
            ..Default::default()
        },
        present,
    )
}

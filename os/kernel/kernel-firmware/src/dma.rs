//! Device-visible memory for property buffers.

use crate::FirmwareError;
use core::mem::ManuallyDrop;

pub const PAGE_SIZE: usize = 4096;

/// Rounds `size` up to a whole number of pages.
#[must_use]
pub const fn page_align(size: usize) -> usize {
    size.div_ceil(PAGE_SIZE) * PAGE_SIZE
}

/// A region of coherent memory shared with the VideoCore.
///
/// Accessors take `&self`: the device writes the region behind our back, so
/// every access must be a fresh load or store.
pub trait DmaRegion {
    /// Address of the region as seen by the VideoCore.
    fn bus_address(&self) -> u32;

    /// Raw (device-order) word at `index`.
    fn read_word(&self, index: usize) -> u32;

    /// Stores a raw (device-order) word at `index`.
    fn write_word(&self, index: usize, value: u32);
}

/// Source of coherent memory, e.g. the platform's DMA pool.
pub trait CoherentAllocator: Send + Sync {
    type Region: DmaRegion;

    /// Allocates `size` bytes (a multiple of [`PAGE_SIZE`]), page aligned.
    fn alloc_coherent(&self, size: usize) -> Option<Self::Region>;

    /// Returns a region obtained from [`CoherentAllocator::alloc_coherent`]
    /// with the size it was allocated with.
    fn free_coherent(&self, region: Self::Region, size: usize);
}

/// Page-aligned coherent buffer, freed with its allocation size on drop.
pub struct CoherentBuffer<'a, A: CoherentAllocator> {
    allocator: &'a A,
    region: ManuallyDrop<A::Region>,
    size: usize,
}

impl<'a, A: CoherentAllocator> CoherentBuffer<'a, A> {
    /// # Errors
    /// [`FirmwareError::OutOfMemory`] if the allocator has nothing left.
    pub fn new(allocator: &'a A, len: usize) -> Result<Self, FirmwareError> {
        let size = page_align(len);
        let region = allocator
            .alloc_coherent(size)
            .ok_or(FirmwareError::OutOfMemory)?;
        Ok(Self {
            allocator,
            region: ManuallyDrop::new(region),
            size,
        })
    }

    #[must_use]
    pub fn bus_address(&self) -> u32 {
        self.region.bus_address()
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Word at `index`, converted from little-endian.
    #[must_use]
    pub fn read(&self, index: usize) -> u32 {
        u32::from_le(self.region.read_word(index))
    }

    /// Stores `value` at `index` as little-endian.
    pub fn write(&self, index: usize, value: u32) {
        self.region.write_word(index, value.to_le());
    }
}

impl<A: CoherentAllocator> Drop for CoherentBuffer<'_, A> {
    fn drop(&mut self) {
        // SAFETY: the region is never touched again after this.
        let region = unsafe { ManuallyDrop::take(&mut self.region) };
        self.allocator.free_coherent(region, self.size);
    }
}

use crate::device::{Device, DeviceError};

/// A device buffer that only grows.
pub(crate) struct SizedBuffer<D: Device> {
    what: &'static str,
    buffer: Option<D::Buffer>,
    size: u64,
}

impl<D: Device> SizedBuffer<D> {
    pub fn new(what: &'static str) -> Self {
        Self { what, buffer: None, size: 0 }
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn buffer(&self) -> Option<&D::Buffer> {
        self.buffer.as_ref()
    }

    /// Replaces the buffer with one of `size` bytes unless it is already at
    /// least that large. Returns whether a new buffer was created.
    ///
    /// The old buffer is dropped only after its replacement exists.
    pub fn ensure_capacity(&mut self, device: &mut D, size: u64) -> Result<bool, DeviceError> {
        if self.buffer.is_some() && self.size >= size {
            return Ok(false);
        }
        let buffer = device.new_buffer(self.what, size)?;
        self.buffer = Some(buffer);
        self.size = size;
        Ok(true)
    }

    /// Like `ensure_capacity`, leaving 10% slack when it has to grow.
    pub fn reserve(&mut self, device: &mut D, needed: u64) -> Result<bool, DeviceError> {
        if self.buffer.is_some() && self.size >= needed {
            return Ok(false);
        }
        self.ensure_capacity(device, needed * 11 / 10)
    }

    pub fn upload(&self, device: &mut D, data: &[u8]) {
        if let Some(buf) = &self.buffer {
            device.upload_buffer(buf, data);
        }
    }

    pub fn download(&self, device: &mut D, dst: &mut [u8]) -> Result<(), DeviceError> {
        match &self.buffer {
            Some(buf) => device.download_buffer(buf, dst),
            None => Err(DeviceError::ContentLost),
        }
    }

    pub fn release(&mut self) {
        self.buffer = None;
        self.size = 0;
    }
}

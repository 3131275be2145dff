use core::sync::atomic::AtomicU8;

pub trait ReadCompleteHook {
    fn on_read_complete(&self);
}

/// Bus slave service serving a memory window to a bus master.
///
/// Byte transmission, start/stop handling and address matching are up to
/// the implementation, only the window and the hook are exchanged.
pub trait SlaveTransport<'a> {
    fn set_address(&mut self, address: u8);
    fn set_transmit_window(&mut self, window: &'a [AtomicU8]);
    /// Called once the bus master has read the whole window
    fn on_read_complete(&mut self, hook: &'a dyn ReadCompleteHook);
}

//! Glue between the aggregate and the bus slave service.

use hal::transport::{ReadCompleteHook, SlaveTransport};

use crate::aggregate::NavAggregate;

pub struct TransportAdapter<'a> {
    aggregate: &'a NavAggregate,
    address: u8,
}

impl<'a> TransportAdapter<'a> {
    pub fn new(aggregate: &'a NavAggregate, address: u8) -> Self {
        Self { aggregate, address }
    }

    /// Hands the published image and the readout hook to the transport
    pub fn attach<T: SlaveTransport<'a>>(&'a self, transport: &mut T) {
        transport.set_address(self.address);
        transport.set_transmit_window(self.aggregate.window());
        transport.on_read_complete(self);
        info!("Serving {} bytes at bus address {:#04x}", self.aggregate.window().len(), self.address);
    }
}

impl<'a> ReadCompleteHook for TransportAdapter<'a> {
    /// Deltas are relative to the previous readout
    fn on_read_complete(&self) {
        self.aggregate.readout_complete();
    }
}

mod test {
    #[cfg(test)]
    use core::sync::atomic::{AtomicU8, Ordering};

    #[cfg(test)]
    use hal::transport::{ReadCompleteHook, SlaveTransport};

    #[cfg(test)]
    #[derive(Default)]
    struct Slave<'a> {
        address: u8,
        window: &'a [AtomicU8],
        hook: Option<&'a dyn ReadCompleteHook>,
    }

    #[cfg(test)]
    impl<'a> SlaveTransport<'a> for Slave<'a> {
        fn set_address(&mut self, address: u8) {
            self.address = address;
        }

        fn set_transmit_window(&mut self, window: &'a [AtomicU8]) {
            self.window = window;
        }

        fn on_read_complete(&mut self, hook: &'a dyn ReadCompleteHook) {
            self.hook = Some(hook);
        }
    }

    #[cfg(test)]
    impl<'a> Slave<'a> {
        /// Full readout as the bus master does it, returns dx
        fn read(&self) -> i16 {
            let bytes: Vec<u8> = self.window.iter().map(|b| b.load(Ordering::Relaxed)).collect();
            let last = bytes.len() - 4;
            if let Some(hook) = self.hook {
                hook.on_read_complete();
            }
            i16::from_le_bytes([bytes[last], bytes[last + 1]])
        }
    }

    #[test]
    fn test_attach() {
        use super::TransportAdapter;
        use crate::aggregate::{Layout, NavAggregate};
        use crate::optical::Delta;

        let aggregate = NavAggregate::new(Layout::default());
        let adapter = TransportAdapter::new(&aggregate, 0x11);
        let mut slave = Slave::default();
        adapter.attach(&mut slave);
        assert_eq!(slave.address, 0x11);
        assert_eq!(slave.window.len(), Layout::default().size());

        aggregate.optical().accumulate(2, -1);
        aggregate.publish();
        assert_eq!(slave.read(), 2);
        assert_eq!(aggregate.optical().read(), Delta::default());
        assert_eq!(slave.read(), 0);
        assert_eq!(aggregate.optical().read(), Delta::default());
    }

    #[test]
    fn test_motion_after_publish() {
        use super::TransportAdapter;
        use crate::aggregate::{Layout, NavAggregate};
        use crate::optical::Delta;

        let aggregate = NavAggregate::new(Layout::default());
        let adapter = TransportAdapter::new(&aggregate, 0x11);
        let mut slave = Slave::default();
        adapter.attach(&mut slave);

        aggregate.optical().accumulate(2, 0);
        aggregate.publish();
        aggregate.optical().accumulate(3, 0);
        let mut seen = slave.read();
        assert_eq!(aggregate.optical().read(), Delta { dx: 3, dy: 0 });
        aggregate.publish();
        seen += slave.read();
        assert_eq!(seen, 5);
    }

    #[test]
    fn test_repeated_readout() {
        use super::TransportAdapter;
        use crate::aggregate::{Layout, NavAggregate};

        let aggregate = NavAggregate::new(Layout::default());
        let adapter = TransportAdapter::new(&aggregate, 0x11);
        let mut slave = Slave::default();
        adapter.attach(&mut slave);

        let mut seen = 0;
        for &motion in [2i8, 0, -4, 7].iter() {
            aggregate.optical().accumulate(motion, 0);
            aggregate.publish();
            seen += slave.read();
            seen += slave.read();
            aggregate.optical().accumulate(1, 0);
        }
        aggregate.publish();
        seen += slave.read();
        assert_eq!(seen, 2 + 0 - 4 + 7 + 4);
    }
}

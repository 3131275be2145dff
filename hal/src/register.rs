/// Byte wide register access of a peripheral
pub trait RegisterBus {
    type Error;

    fn read(&mut self, register: u8) -> Result<u8, Self::Error>;
    fn write(&mut self, register: u8, value: u8) -> Result<(), Self::Error>;

    /// Bring the serial interface of the peripheral back to a known state
    fn resync(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

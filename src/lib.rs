#![no_std]

//! # BMP180 Barometric Pressure Sensor Driver
//!
//! A type-safe, `no_std` driver for the Bosch BMP180.
//! This driver uses the typestate pattern to ensure the factory calibration
//! has been loaded before measurements are taken.
//!
//! ## Features
//! - **Bit-exact Compensation**: The datasheet fixed-point formulas, including
//!   the unsigned arithmetic switch in the pressure path.
//! - **Bounded Polling**: Conversions never hang on a stuck bus; see [`PollPolicy`].
//! - **Explicit Temperature Coupling**: Pressure compensation takes the
//!   [`TemperatureContext`] of a preceding temperature conversion as an argument.
//!
//! ## Units
//! - **Temperature**: Decicelsius (C * 10) -> 150 = 15.0 °C
//! - **Pressure**: Pascal (Pa) -> 101325 = 1013.25 hPa
//! - **Altitude**: Meters
//!
//! ## Example
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
//! # let mut i2c = I2cMock::new(&[
//! #     I2cTransaction::write(0x77, vec![0xE0, 0xB6]),
//! #     I2cTransaction::write_read(0x77, vec![0xAA], vec![
//! #         0x01, 0x98, 0xFF, 0xB8, 0xC7, 0xD1, 0x7F, 0xE5, 0x7F, 0xF5, 0x5A, 0x71,
//! #         0x18, 0x2E, 0x00, 0x04, 0x80, 0x00, 0xDD, 0xF9, 0x0B, 0x34,
//! #     ]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x2E]),
//! #     I2cTransaction::write_read(0x77, vec![0xF4], vec![0x0E]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x6C, 0xFA]),
//! #     I2cTransaction::write(0x77, vec![0xF4, 0x34]),
//! #     I2cTransaction::write_read(0x77, vec![0xF4], vec![0x14]),
//! #     I2cTransaction::write_read(0x77, vec![0xF6], vec![0x5D, 0x23, 0x00]),
//! # ]);
//! # let mut delay = NoopDelay::new();
//! use bmp180_driver::{BMP180Builder, Bmp180, Oversampling, DEFAULT_ADDRESS};
//!
//! let config = BMP180Builder::new()
//!     .oversampling(Oversampling::UltraLowPower)
//!     .build();
//!
//! let mut bmp180 = Bmp180::new(&mut i2c, DEFAULT_ADDRESS)
//!     .init_with_config(config, &mut delay)
//!     .unwrap();
//!
//! let data = bmp180.read_measurement(&mut delay).unwrap();
//! assert_eq!(data.temp.split(), (15, 0));
//! assert_eq!(data.pres.as_hpa(), (699, 64));
//! # drop(bmp180);
//! # i2c.done();
//! ```

#[cfg(test)]
#[macro_use]
extern crate std;

mod calc;
mod settings;

pub use calc::{
    altitude, celsius_to_fahrenheit, estimate_altitude, sea_level_pressure,
    STANDARD_SEA_LEVEL_PA,
};
pub use settings::{BMP180Builder, Config, Oversampling, PollPolicy};

use core::marker::PhantomData;
use embedded_hal::{delay::DelayNs, i2c};

/// Fixed I2C address of the BMP180.
pub const DEFAULT_ADDRESS: u8 = 0x77;

/// Value of the chip-id register.
pub const CHIP_ID: u8 = 0x55;

/// Register map.
mod regs {
    /// Start of the calibration block (AC1 MSB).
    pub const ADDR_CALIB: u8 = 0xAA;
    pub const CALIB_SIZE: usize = 22;
    pub const ADDR_CHIP_ID: u8 = 0xD0;
    pub const ADDR_SOFT_RESET: u8 = 0xE0;
    pub const SOFT_RESET_CMD: u8 = 0xB6;
    /// Control register. Written with a command, read for the SCO bit.
    pub const ADDR_CTRL_MEAS: u8 = 0xF4;
    /// Start-of-conversion bit, set while the sensor is sampling.
    pub const SCO_BIT: u8 = 0x20;
    /// Result MSB, followed by LSB (0xF7) and XLSB (0xF8).
    pub const ADDR_OUT_MSB: u8 = 0xF6;
    pub const CMD_TEMPERATURE: u8 = 0x2E;
}

/// Start-up time after power-on or soft reset.
const STARTUP_TIME_MS: u32 = 10;

/// Nominal temperature conversion time.
const TEMPERATURE_CONVERSION_TIME: Microseconds = Microseconds(4_500);

// --- Typestates ---

/// Sensor has been created but calibration data has not been loaded yet.
#[derive(Debug)]
pub struct Uninitialized;
/// Calibration data is loaded and the sensor is ready for measurements.
#[derive(Debug)]
pub struct Ready;

/// Error types for the BMP180 driver.
pub mod error {
    use core::fmt;

    /// Errors that can occur during communication or compensation.
    #[cfg_attr(feature = "defmt", derive(defmt::Format))]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Bmp180Error<E> {
        /// I2C bus error.
        I2CError(E),
        /// The start-of-conversion bit did not clear within the poll bound.
        Timeout,
        /// Calibration values produce a zero divisor in the compensation formula.
        DivisionDomain,
        /// A calibration word read as 0x0000 or 0xFFFF.
        InvalidCalibration,
    }

    impl<E: fmt::Debug> fmt::Display for Bmp180Error<E> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                Bmp180Error::I2CError(e) => write!(f, "I2C error: {:?}", e),
                Bmp180Error::Timeout => f.write_str("conversion timed out"),
                Bmp180Error::DivisionDomain => {
                    f.write_str("calibration data yields a zero divisor")
                }
                Bmp180Error::InvalidCalibration => f.write_str("invalid calibration data"),
            }
        }
    }

    /// Result type alias for BMP180 operations.
    pub type Result<T, E> = core::result::Result<T, Bmp180Error<E>>;
}

/// Duration wrapper for type-safety. Stored in microseconds.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Microseconds(pub u32);

/// Factory-programmed calibration coefficients read from the sensor.
/// These are unique to every individual chip and required for compensation formulas.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct CalibData {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

/// Intermediate temperature term (`b5`) of one temperature conversion.
///
/// Pressure compensation is only valid with the context of a temperature
/// reading taken at about the same time.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TemperatureContext {
    pub(crate) b5: i32,
}

impl TemperatureContext {
    /// The raw `b5` value.
    pub fn b5(&self) -> i32 {
        self.b5
    }

    /// The compensated temperature this context was derived with.
    pub fn temperature(&self) -> Temperature {
        Temperature((self.b5.wrapping_add(8)) >> 4)
    }
}

/// Represents temperature in decicelsius (degrees Celsius * 10).
///
/// # Example
/// A value of `150` represents **15.0 °C**.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Temperature(pub i32);

impl Temperature {
    /// Splits the fixed-point value into integral (degrees) and fractional (tenths) parts.
    ///
    /// Both parts carry the sign of the value.
    ///
    /// # Example
    /// ```rust
    /// use bmp180_driver::Temperature;
    /// assert_eq!(Temperature(235).split(), (23, 5)); // 23.5 °C
    /// assert_eq!(Temperature(-121).split(), (-12, -1)); // -12.1 °C
    /// ```
    pub fn split(&self) -> (i32, i32) {
        (self.0 / 10, self.0 % 10)
    }

    pub fn celsius(&self) -> f32 {
        self.0 as f32 / 10.0
    }

    pub fn fahrenheit(&self) -> f32 {
        calc::celsius_to_fahrenheit(self.celsius())
    }
}

/// Represents atmospheric pressure in Pascal (Pa).
///
/// # Example
/// A value of `101325` represents **101325 Pa** (or 1013.25 hPa).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Pressure(pub i32);

impl Pressure {
    /// Converts the raw Pascal value to Hectopascal (hPa) and splits it into parts.
    ///
    /// # Example
    /// ```rust
    /// use bmp180_driver::Pressure;
    /// let press = Pressure(101325);
    /// assert_eq!(press.as_hpa(), (1013, 25)); // Represents 1013.25 hPa
    /// ```
    pub fn as_hpa(&self) -> (i32, i32) {
        (self.0 / 100, self.0 % 100)
    }

    /// Altitude in meters above the level where the pressure is `sea_level` Pa.
    pub fn altitude(&self, sea_level: f32) -> f32 {
        calc::altitude(self.0 as f32, sea_level)
    }
}

/// Temperature and pressure from one measurement cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Measurement {
    /// Temperature data.
    pub temp: Temperature,
    /// Atmospheric pressure data, compensated with `temp`.
    pub pres: Pressure,
}

/// The main BMP180 driver structure.
///
/// Use `Bmp180::new(...)` to start. The `STATE` generic uses the Typestate pattern
/// to track initialization status at compile time.
///
/// The driver owns its bus handle. To share one bus with other devices, pass a
/// device from `embedded-hal-bus` (e.g. `RefCellDevice` or `MutexDevice`),
/// which serializes each transaction.
#[derive(Debug)]
pub struct Bmp180<I2C, STATE> {
    i2c: I2C,
    address: u8,
    pub(crate) calib_data: CalibData,
    config: Config,
    _state: PhantomData<STATE>,
}

impl<I2C, E> Bmp180<I2C, Uninitialized>
where
    I2C: i2c::I2c<Error = E>,
{
    /// Creates a new driver instance in the `Uninitialized` state.
    ///
    /// This does not communicate with the sensor yet.
    ///
    /// # Arguments
    /// * `i2c` - The I2C bus object.
    /// * `address` - The I2C address of the sensor (normally [`DEFAULT_ADDRESS`]).
    pub fn new(i2c: I2C, address: u8) -> Self {
        Bmp180 {
            i2c,
            address,
            calib_data: CalibData::default(),
            config: Config::default(),
            _state: PhantomData,
        }
    }

    /// Initializes the sensor with the default [`Config`].
    ///
    /// See [`Bmp180::init_with_config`].
    pub fn init(self, delay: &mut impl DelayNs) -> error::Result<Bmp180<I2C, Ready>, E> {
        self.init_with_config(Config::default(), delay)
    }

    /// Initializes the sensor: performs a soft-reset and loads factory calibration data.
    ///
    /// This transitions the driver state from `Uninitialized` to `Ready`.
    ///
    /// # Errors
    /// Returns an error if the I2C communication fails or the calibration block
    /// contains unprogrammed words.
    pub fn init_with_config(
        mut self,
        config: Config,
        delay: &mut impl DelayNs,
    ) -> error::Result<Bmp180<I2C, Ready>, E> {
        self.reset()?;
        delay.delay_ms(STARTUP_TIME_MS);

        let calib_data = self.read_calib_data()?;

        Ok(Bmp180 {
            i2c: self.i2c,
            address: self.address,
            calib_data,
            config,
            _state: PhantomData,
        })
    }
}

impl<I2C, STATE, E> Bmp180<I2C, STATE>
where
    I2C: i2c::I2c<Error = E>,
{
    /// Reads the chip id register (expected value: [`CHIP_ID`]).
    pub fn read_chip_id(&mut self) -> error::Result<u8, E> {
        self.read_reg_byte(regs::ADDR_CHIP_ID)
    }

    /// Returns `true` if the device answers with the BMP180 chip id.
    pub fn is_connected(&mut self) -> error::Result<bool, E> {
        Ok(self.read_chip_id()? == CHIP_ID)
    }

    /// Consumes the driver and returns the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Performs a soft-reset of the sensor.
    ///
    /// The sensor needs its start-up time before it answers again.
    fn reset(&mut self) -> error::Result<(), E> {
        self.write_reg(&[regs::ADDR_SOFT_RESET, regs::SOFT_RESET_CMD])
    }

    /// Reads and decodes the calibration block.
    fn read_calib_data(&mut self) -> error::Result<CalibData, E> {
        let mut buffer = [0u8; regs::CALIB_SIZE];
        self.read_into(regs::ADDR_CALIB, &mut buffer)?;

        if !CalibData::block_is_valid(&buffer) {
            #[cfg(feature = "defmt")]
            defmt::warn!("BMP180 calibration block invalid: {:x}", buffer);
            return Err(error::Bmp180Error::InvalidCalibration);
        }

        let calib_data = CalibData::from_be_bytes(&buffer);

        #[cfg(feature = "defmt")]
        defmt::debug!("BMP180 calibration loaded: {}", calib_data);

        Ok(calib_data)
    }

    /// Reads data from a starting register address into a provided buffer.
    fn read_into(&mut self, reg_address: u8, buffer: &mut [u8]) -> error::Result<(), E> {
        self.i2c
            .write_read(self.address, &[reg_address], buffer)
            .map_err(error::Bmp180Error::I2CError)
    }

    /// Reads a single byte from a specific register address.
    fn read_reg_byte(&mut self, reg_address: u8) -> error::Result<u8, E> {
        let mut buffer = [0];
        self.read_into(reg_address, &mut buffer)?;
        Ok(buffer[0])
    }

    /// Writes a byte slice (typically `[Register, Value]`) to the sensor.
    fn write_reg(&mut self, data: &[u8]) -> error::Result<(), E> {
        self.i2c
            .write(self.address, data)
            .map_err(error::Bmp180Error::I2CError)
    }
}

impl<I2C, E> Bmp180<I2C, Ready>
where
    I2C: i2c::I2c<Error = E>,
{
    /// The cached calibration coefficients.
    pub fn calibration(&self) -> &CalibData {
        &self.calib_data
    }

    /// The active configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Re-reads the calibration block.
    ///
    /// On error the previously loaded calibration is kept.
    pub fn reload_calibration(&mut self) -> error::Result<(), E> {
        self.calib_data = self.read_calib_data()?;
        Ok(())
    }

    /// Selects the pressure oversampling for the following conversions.
    pub fn set_oversampling(&mut self, oversampling: Oversampling) {
        self.config.oversampling = oversampling;
    }

    /// Replaces the conversion-complete poll bound.
    pub fn set_poll_policy(&mut self, poll_policy: PollPolicy) {
        self.config.poll_policy = poll_policy;
    }

    /// Runs a temperature conversion and returns the uncompensated 16-bit value.
    pub fn read_raw_temperature(&mut self, delay: &mut impl DelayNs) -> error::Result<u16, E> {
        self.convert(regs::CMD_TEMPERATURE, TEMPERATURE_CONVERSION_TIME, delay)?;

        let mut buffer = [0u8; 2];
        self.read_into(regs::ADDR_OUT_MSB, &mut buffer)?;

        Ok(u16::from_be_bytes(buffer))
    }

    /// Runs a pressure conversion with the configured oversampling and returns
    /// the uncompensated value (16 to 19 bits).
    pub fn read_raw_pressure(&mut self, delay: &mut impl DelayNs) -> error::Result<u32, E> {
        let oversampling = self.config.oversampling;
        self.convert(oversampling.command(), oversampling.conversion_time(), delay)?;

        let mut buffer = [0u8; 3];
        self.read_into(regs::ADDR_OUT_MSB, &mut buffer)?;

        // MSB, LSB and XLSB; only the upper 16 + oss bits are significant.
        let raw = ((buffer[0] as u32) << 16) | ((buffer[1] as u32) << 8) | (buffer[2] as u32);
        Ok(raw >> (8 - oversampling.oss()))
    }

    /// Measures the temperature and returns the context needed for pressure compensation.
    pub fn read_temperature(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> error::Result<TemperatureContext, E> {
        let ut = self.read_raw_temperature(delay)?;

        self.calib_data
            .compensate_temperature(ut)
            .ok_or(error::Bmp180Error::DivisionDomain)
    }

    /// Measures the temperature in degrees Celsius.
    pub fn read_temperature_celsius(&mut self, delay: &mut impl DelayNs) -> error::Result<f32, E> {
        Ok(self.read_temperature(delay)?.temperature().celsius())
    }

    /// Measures the temperature in degrees Fahrenheit.
    pub fn read_temperature_fahrenheit(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> error::Result<f32, E> {
        Ok(self.read_temperature(delay)?.temperature().fahrenheit())
    }

    /// Measures the pressure, compensated with the given temperature context.
    ///
    /// `ctx` should come from [`Bmp180::read_temperature`] called just before.
    pub fn read_pressure_with(
        &mut self,
        ctx: TemperatureContext,
        delay: &mut impl DelayNs,
    ) -> error::Result<Pressure, E> {
        let up = self.read_raw_pressure(delay)?;

        self.calib_data
            .compensate_pressure(ctx, up, self.config.oversampling)
            .ok_or(error::Bmp180Error::DivisionDomain)
    }

    /// Measures the pressure in Pascal.
    ///
    /// A temperature conversion is run first so the pressure is always
    /// compensated with a fresh `b5`.
    pub fn read_pressure_pascals(&mut self, delay: &mut impl DelayNs) -> error::Result<i32, E> {
        Ok(self.read_measurement(delay)?.pres.0)
    }

    /// Runs a temperature conversion followed by a pressure conversion.
    pub fn read_measurement(&mut self, delay: &mut impl DelayNs) -> error::Result<Measurement, E> {
        let ctx = self.read_temperature(delay)?;
        let pres = self.read_pressure_with(ctx, delay)?;

        Ok(Measurement {
            temp: ctx.temperature(),
            pres,
        })
    }

    /// Starts a conversion and waits until the sensor clears the SCO bit.
    ///
    /// Waits the nominal `conversion_time` first, then polls the control
    /// register within the bound of the configured [`PollPolicy`].
    fn convert(
        &mut self,
        command: u8,
        conversion_time: Microseconds,
        delay: &mut impl DelayNs,
    ) -> error::Result<(), E> {
        self.write_reg(&[regs::ADDR_CTRL_MEAS, command])?;
        delay.delay_us(conversion_time.0);

        let policy = self.config.poll_policy;
        for attempt in 0..policy.max_attempts.max(1) {
            if attempt > 0 {
                delay.delay_us(policy.interval.0);
            }
            if self.read_reg_byte(regs::ADDR_CTRL_MEAS)? & regs::SCO_BIT == 0 {
                return Ok(());
            }
        }

        #[cfg(feature = "defmt")]
        defmt::warn!(
            "BMP180 conversion {=u8:#x} timed out after {=u16} polls",
            command,
            policy.max_attempts
        );

        Err(error::Bmp180Error::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::tests::{DATASHEET_CALIB, DATASHEET_CALIB_BYTES};
    use core::cell::RefCell;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_bus::i2c::RefCellDevice;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec::Vec;

    const ADDR: u8 = DEFAULT_ADDRESS;

    /// Mock clock that only adds up the requested delays.
    #[derive(Default)]
    struct CountingDelay {
        total_ns: u64,
    }

    impl DelayNs for CountingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ns += ns as u64;
        }
    }

    fn ready<I2C: i2c::I2c>(i2c: I2C, config: Config) -> Bmp180<I2C, Ready> {
        Bmp180 {
            i2c,
            address: ADDR,
            calib_data: DATASHEET_CALIB,
            config,
            _state: PhantomData,
        }
    }

    /// Command write, one busy status read, one done status read, then the result read.
    fn conversion(addr: u8, command: u8, result: Vec<u8>) -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write(addr, vec![0xF4, command]),
            I2cTransaction::write_read(addr, vec![0xF4], vec![command | 0x20]),
            I2cTransaction::write_read(addr, vec![0xF4], vec![command & !0x20]),
            I2cTransaction::write_read(addr, vec![0xF6], result),
        ]
    }

    #[test]
    fn init_resets_and_loads_calibration() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xE0, 0xB6]),
            I2cTransaction::write_read(ADDR, vec![0xAA], DATASHEET_CALIB_BYTES.to_vec()),
        ]);
        let mut delay = CountingDelay::default();

        let bmp180 = Bmp180::new(&mut i2c, ADDR).init(&mut delay).unwrap();
        assert_eq!(*bmp180.calibration(), DATASHEET_CALIB);
        assert_eq!(bmp180.config(), Config::default());
        assert_eq!(delay.total_ns, 10_000_000);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn init_rejects_blank_calibration() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xE0, 0xB6]),
            I2cTransaction::write_read(ADDR, vec![0xAA], vec![0xFF; 22]),
        ]);

        let result = Bmp180::new(&mut i2c, ADDR).init(&mut NoopDelay::new());
        assert_eq!(result.err(), Some(error::Bmp180Error::InvalidCalibration));

        i2c.done();
    }

    #[test]
    fn init_propagates_bus_error() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xE0, 0xB6]).with_error(ErrorKind::Other)
        ]);

        let result = Bmp180::new(&mut i2c, ADDR).init(&mut NoopDelay::new());
        assert_eq!(
            result.err(),
            Some(error::Bmp180Error::I2CError(ErrorKind::Other))
        );

        i2c.done();
    }

    #[test]
    fn connection_check_uses_chip_id() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write_read(ADDR, vec![0xD0], vec![0x55]),
            I2cTransaction::write_read(ADDR, vec![0xD0], vec![0x01]),
        ]);

        let mut bmp180 = Bmp180::new(&mut i2c, ADDR);
        assert!(bmp180.is_connected().unwrap());
        assert!(!bmp180.is_connected().unwrap());

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn read_temperature() {
        let mut i2c = I2cMock::new(&conversion(ADDR, 0x2E, vec![0x6C, 0xFA]));
        let mut delay = NoopDelay::new();

        let mut bmp180 = ready(&mut i2c, Config::default());
        let ctx = bmp180.read_temperature(&mut delay).unwrap();
        assert_eq!(ctx.b5(), 2400);
        assert_eq!(ctx.temperature(), Temperature(150));

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn read_temperature_in_both_units() {
        let mut expectations = conversion(ADDR, 0x2E, vec![0x6C, 0xFA]);
        expectations.extend(conversion(ADDR, 0x2E, vec![0x6C, 0xFA]));
        let mut i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let mut bmp180 = ready(&mut i2c, Config::default());
        assert_eq!(bmp180.read_temperature_celsius(&mut delay).unwrap(), 15.0);
        assert_eq!(bmp180.read_temperature_fahrenheit(&mut delay).unwrap(), 59.0);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn read_measurement_ultra_low_power() {
        let mut expectations = conversion(ADDR, 0x2E, vec![0x6C, 0xFA]);
        expectations.extend(conversion(ADDR, 0x34, vec![0x5D, 0x23, 0x00]));
        let mut i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let config = BMP180Builder::new()
            .oversampling(Oversampling::UltraLowPower)
            .build();
        let mut bmp180 = ready(&mut i2c, config);
        let data = bmp180.read_measurement(&mut delay).unwrap();
        assert_eq!(data.temp, Temperature(150));
        assert_eq!(data.pres, Pressure(69964));

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn read_pressure_pascals_runs_temperature_first() {
        let mut expectations = conversion(ADDR, 0x2E, vec![0x6C, 0xFA]);
        expectations.extend(conversion(ADDR, 0x34, vec![0x5D, 0x23, 0x00]));
        let mut i2c = I2cMock::new(&expectations);

        let mut bmp180 = ready(&mut i2c, Config::default());
        bmp180.set_oversampling(Oversampling::UltraLowPower);
        assert_eq!(bmp180.read_pressure_pascals(&mut NoopDelay::new()).unwrap(), 69964);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn raw_pressure_is_shifted_by_oversampling() {
        let mut i2c = I2cMock::new(&conversion(ADDR, 0xF4, vec![0xA0, 0x12, 0x80]));

        let mut bmp180 = ready(&mut i2c, Config::default());
        assert_eq!(bmp180.read_raw_pressure(&mut NoopDelay::new()).unwrap(), 327828);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn read_pressure_with_explicit_context() {
        let mut expectations = conversion(ADDR, 0x2E, vec![0x61, 0xA8]);
        expectations.extend(conversion(ADDR, 0xF4, vec![0xA0, 0x12, 0x80]));
        let mut i2c = I2cMock::new(&expectations);
        let mut delay = NoopDelay::new();

        let mut bmp180 = ready(&mut i2c, Config::default());
        let ctx = bmp180.read_temperature(&mut delay).unwrap();
        assert_eq!(ctx.temperature(), Temperature(-121));
        let pres = bmp180.read_pressure_with(ctx, &mut delay).unwrap();
        assert_eq!(pres, Pressure(113981));

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn stuck_conversion_times_out() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xF4, 0x2E]),
            I2cTransaction::write_read(ADDR, vec![0xF4], vec![0x2E]),
            I2cTransaction::write_read(ADDR, vec![0xF4], vec![0x2E]),
            I2cTransaction::write_read(ADDR, vec![0xF4], vec![0x2E]),
        ]);
        let mut delay = CountingDelay::default();

        let config = BMP180Builder::new()
            .max_poll_attempts(3)
            .poll_interval(Microseconds(1_000))
            .build();
        let mut bmp180 = ready(&mut i2c, config);
        assert_eq!(
            bmp180.read_temperature(&mut delay),
            Err(error::Bmp180Error::Timeout)
        );
        // Nominal 4.5 ms plus two intervals between the three polls.
        assert_eq!(delay.total_ns, 6_500_000);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn zero_poll_attempts_still_polls_once() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xF4, 0x2E]),
            I2cTransaction::write_read(ADDR, vec![0xF4], vec![0x2E]),
        ]);

        let mut bmp180 = ready(&mut i2c, Config::default());
        bmp180.set_poll_policy(PollPolicy {
            max_attempts: 0,
            interval: Microseconds(100),
        });
        assert_eq!(
            bmp180.read_raw_temperature(&mut NoopDelay::new()),
            Err(error::Bmp180Error::Timeout)
        );

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn bus_error_during_result_read_keeps_calibration() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write(ADDR, vec![0xF4, 0x2E]),
            I2cTransaction::write_read(ADDR, vec![0xF4], vec![0x0E]),
            I2cTransaction::write_read(ADDR, vec![0xF6], vec![0x00, 0x00])
                .with_error(ErrorKind::Other),
        ]);

        let mut bmp180 = ready(&mut i2c, Config::default());
        assert_eq!(
            bmp180.read_temperature_celsius(&mut NoopDelay::new()),
            Err(error::Bmp180Error::I2CError(ErrorKind::Other))
        );
        assert_eq!(*bmp180.calibration(), DATASHEET_CALIB);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn failed_reload_keeps_calibration() {
        let mut i2c = I2cMock::new(&[
            I2cTransaction::write_read(ADDR, vec![0xAA], vec![0x00; 22])
                .with_error(ErrorKind::Other),
            I2cTransaction::write_read(ADDR, vec![0xAA], vec![0x00; 22]),
        ]);

        let mut bmp180 = ready(&mut i2c, Config::default());
        assert_eq!(
            bmp180.reload_calibration(),
            Err(error::Bmp180Error::I2CError(ErrorKind::Other))
        );
        assert_eq!(
            bmp180.reload_calibration(),
            Err(error::Bmp180Error::InvalidCalibration)
        );
        assert_eq!(*bmp180.calibration(), DATASHEET_CALIB);

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn degenerate_calibration_is_a_domain_error() {
        let mut i2c = I2cMock::new(&conversion(ADDR, 0x2E, vec![0x6C, 0xFA]));

        let mut bmp180 = ready(&mut i2c, Config::default());
        bmp180.calib_data.md = -4743;
        assert_eq!(
            bmp180.read_temperature(&mut NoopDelay::new()),
            Err(error::Bmp180Error::DivisionDomain)
        );

        drop(bmp180);
        i2c.done();
    }

    #[test]
    fn sensors_share_one_bus() {
        let mut expectations = conversion(0x77, 0x2E, vec![0x6C, 0xFA]);
        expectations.extend(conversion(0x76, 0x2E, vec![0x61, 0xA8]));
        let bus = RefCell::new(I2cMock::new(&expectations));
        let mut delay = NoopDelay::new();

        {
            let mut first = ready(RefCellDevice::new(&bus), Config::default());
            let mut second = ready(RefCellDevice::new(&bus), Config::default());
            second.address = 0x76;

            assert_eq!(first.read_temperature_celsius(&mut delay).unwrap(), 15.0);
            assert_eq!(second.read_temperature_celsius(&mut delay).unwrap(), -12.1);
        }

        bus.into_inner().done();
    }

    #[test]
    fn release_returns_bus() {
        let i2c = I2cMock::new(&[I2cTransaction::write_read(ADDR, vec![0xD0], vec![0x55])]);

        let mut bmp180 = Bmp180::new(i2c, ADDR);
        assert_eq!(bmp180.read_chip_id().unwrap(), CHIP_ID);
        bmp180.release().done();
    }

    #[test]
    fn value_helpers() {
        assert_eq!(Temperature(150).split(), (15, 0));
        assert_eq!(Temperature(150).fahrenheit(), 59.0);
        assert_eq!(Pressure(69964).as_hpa(), (699, 64));
        assert!(Pressure(101325).altitude(STANDARD_SEA_LEVEL_PA).abs() < 1e-3);
    }
}

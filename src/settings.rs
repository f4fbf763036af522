use crate::Microseconds;

/// Pressure oversampling setting (`oss`).
///
/// The sensor averages `2^oss` internal samples per pressure result. Higher
/// settings reduce noise but lengthen the conversion time.
/// Temperature conversions are not affected.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Oversampling {
    /// 1 sample, 4.5 ms.
    UltraLowPower = 0,
    /// 2 samples, 7.5 ms.
    Standard = 1,
    /// 4 samples, 13.5 ms.
    HighResolution = 2,
    /// 8 samples, 25.5 ms. Maximum precision, longest duration.
    #[default]
    UltraHighResolution = 3,
}

impl Oversampling {
    /// Creates an instance from the 2-bit `oss` field. Upper bits are ignored.
    pub fn from_u8(value: u8) -> Self {
        match value & 0x03 {
            0 => Oversampling::UltraLowPower,
            1 => Oversampling::Standard,
            2 => Oversampling::HighResolution,
            _ => Oversampling::UltraHighResolution,
        }
    }

    /// The 2-bit `oss` field.
    pub fn oss(self) -> u8 {
        self as u8
    }

    /// Control register command that starts a pressure conversion
    /// (`0x34`, `0x74`, `0xB4` or `0xF4`).
    pub fn command(self) -> u8 {
        0x34 | (self.oss() << 6)
    }

    /// Nominal (maximum) conversion time from the datasheet.
    pub fn conversion_time(self) -> Microseconds {
        match self {
            Oversampling::UltraLowPower => Microseconds(4_500),
            Oversampling::Standard => Microseconds(7_500),
            Oversampling::HighResolution => Microseconds(13_500),
            Oversampling::UltraHighResolution => Microseconds(25_500),
        }
    }
}

/// Bound for the conversion-complete poll.
///
/// After the nominal conversion time the control register is read up to
/// `max_attempts` times, `interval` apart, until the SCO bit clears.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Number of status reads before giving up with a timeout. `0` is treated as `1`.
    pub max_attempts: u16,
    /// Delay between two status reads.
    pub interval: Microseconds,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            max_attempts: 10,
            interval: Microseconds(1_000),
        }
    }
}

/// Complete driver configuration.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Pressure oversampling.
    pub oversampling: Oversampling,
    /// Conversion-complete poll bound.
    pub poll_policy: PollPolicy,
}

/// Builder for a [`Config`].
///
/// ```rust
/// use bmp180_driver::{BMP180Builder, Microseconds, Oversampling};
///
/// let config = BMP180Builder::new()
///     .oversampling(Oversampling::Standard)
///     .max_poll_attempts(20)
///     .poll_interval(Microseconds(500))
///     .build();
/// assert_eq!(config.oversampling, Oversampling::Standard);
/// assert_eq!(config.poll_policy.max_attempts, 20);
/// ```
#[derive(Default)]
pub struct BMP180Builder {
    config: Config,
}

impl BMP180Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pressure oversampling.
    pub fn oversampling(mut self, os: Oversampling) -> Self {
        self.config.oversampling = os;
        self
    }

    /// Replaces the whole poll policy.
    pub fn poll_policy(mut self, policy: PollPolicy) -> Self {
        self.config.poll_policy = policy;
        self
    }

    /// Sets how many times the status bit is read before timing out.
    pub fn max_poll_attempts(mut self, attempts: u16) -> Self {
        self.config.poll_policy.max_attempts = attempts;
        self
    }

    /// Sets the delay between two status reads.
    pub fn poll_interval(mut self, interval: Microseconds) -> Self {
        self.config.poll_policy.interval = interval;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

use crate::{CalibData, Oversampling, Pressure, TemperatureContext};

/// Reference sea-level pressure of the standard atmosphere, in Pascal.
pub const STANDARD_SEA_LEVEL_PA: f32 = 101_325.0;

impl CalibData {
    /// Decodes the 22-byte calibration block (AC1..MD, big-endian words).
    pub fn from_be_bytes(buffer: &[u8; 22]) -> Self {
        let word = |i: usize| u16::from_be_bytes([buffer[2 * i], buffer[2 * i + 1]]);

        CalibData {
            ac1: word(0) as i16,
            ac2: word(1) as i16,
            ac3: word(2) as i16,
            ac4: word(3),
            ac5: word(4),
            ac6: word(5),
            b1: word(6) as i16,
            b2: word(7) as i16,
            mb: word(8) as i16,
            mc: word(9) as i16,
            md: word(10) as i16,
        }
    }

    /// Datasheet communication check: no calibration word may read as
    /// `0x0000` or `0xFFFF`.
    pub(crate) fn block_is_valid(buffer: &[u8; 22]) -> bool {
        !buffer
            .chunks_exact(2)
            .any(|w| w == [0x00, 0x00] || w == [0xFF, 0xFF])
    }

    /// Compensates a raw temperature sample.
    ///
    /// Returns `None` if `x1 + MD` is zero. The returned context carries `b5`,
    /// which pressure compensation needs.
    pub fn compensate_temperature(&self, ut: u16) -> Option<TemperatureContext> {
        let x1 = (ut as i32 - self.ac6 as i32).wrapping_mul(self.ac5 as i32) >> 15;
        let x2 = ((self.mc as i32) << 11).checked_div(x1.wrapping_add(self.md as i32))?;

        Some(TemperatureContext {
            b5: x1.wrapping_add(x2),
        })
    }

    /// Compensates a raw pressure sample (already shifted by `8 - oss`) into Pascal.
    ///
    /// `ctx` must come from a temperature conversion taken right before this
    /// pressure conversion. Returns `None` if `b4` is zero.
    pub fn compensate_pressure(
        &self,
        ctx: TemperatureContext,
        up: u32,
        oversampling: Oversampling,
    ) -> Option<Pressure> {
        let oss = oversampling.oss() as u32;

        let b6 = ctx.b5.wrapping_sub(4000);
        let b6_sq = b6.wrapping_mul(b6) >> 12;

        let x1 = (self.b2 as i32).wrapping_mul(b6_sq) >> 11;
        let x2 = (self.ac2 as i32).wrapping_mul(b6) >> 11;
        let x3 = x1.wrapping_add(x2);
        let b3 = ((((self.ac1 as i32) * 4).wrapping_add(x3) << oss).wrapping_add(2)) >> 2;

        let x1 = (self.ac3 as i32).wrapping_mul(b6) >> 13;
        let x2 = (self.b1 as i32).wrapping_mul(b6_sq) >> 16;
        let x3 = x1.wrapping_add(x2).wrapping_add(2) >> 2;

        // Unsigned from here on, as in the datasheet.
        let b4 = (self.ac4 as u32).wrapping_mul(x3.wrapping_add(32768) as u32) >> 15;
        let b7 = up.wrapping_sub(b3 as u32).wrapping_mul(50000 >> oss);

        let p = if b7 < 0x8000_0000 {
            (b7 << 1).checked_div(b4)?
        } else {
            b7.checked_div(b4)? << 1
        };
        let p = p as i32;

        let x1 = (p >> 8).wrapping_mul(p >> 8);
        let x1 = x1.wrapping_mul(3038) >> 16;
        let x2 = (-7357i32).wrapping_mul(p) >> 16;

        Some(Pressure(
            p.wrapping_add(x1.wrapping_add(x2).wrapping_add(3791) >> 4),
        ))
    }
}

/// Altitude in meters for `pressure`, relative to the level where the
/// pressure is `sea_level` (both in Pascal).
///
/// Uses the international barometric formula.
pub fn altitude(pressure: f32, sea_level: f32) -> f32 {
    44330.0 * (1.0 - libm::powf(pressure / sea_level, 0.1903))
}

/// Altitude in meters relative to the standard atmosphere (101325 Pa).
pub fn estimate_altitude(pressure: f32) -> f32 {
    altitude(pressure, STANDARD_SEA_LEVEL_PA)
}

/// Pressure at sea level in Pascal, given the `pressure` measured at a known
/// `altitude` in meters.
pub fn sea_level_pressure(pressure: f32, altitude: f32) -> f32 {
    pressure / libm::powf(1.0 - altitude / 44330.0, 5.255)
}

/// Converts degrees Celsius to degrees Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

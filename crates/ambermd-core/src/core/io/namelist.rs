use std::fmt::Display;
use std::io::{self, Write};

/// Opening line of the `&cntrl` namelist block.
pub const CNTRL_OPEN: &str = "&cntrl";
/// Closing marker of a namelist block.
pub const NAMELIST_END: &str = "&end";

/// Formats a real so the engine always reads it as a real (`8` becomes `8.0`).
pub fn format_real(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Writes `key=value` pairs, one per line, each terminated by a comma.
pub struct NamelistWriter<'w> {
    out: &'w mut dyn Write,
}

impl<'w> NamelistWriter<'w> {
    pub fn new(out: &'w mut dyn Write) -> Self {
        Self { out }
    }

    pub fn int(&mut self, key: &str, value: impl Into<i64>) -> io::Result<&mut Self> {
        self.raw(key, value.into())
    }

    pub fn real(&mut self, key: &str, value: f64) -> io::Result<&mut Self> {
        self.raw(key, format_real(value))
    }

    pub fn flag(&mut self, key: &str, value: bool) -> io::Result<&mut Self> {
        self.raw(key, u8::from(value))
    }

    pub fn raw(&mut self, key: &str, value: impl Display) -> io::Result<&mut Self> {
        writeln!(self.out, "{}={},", key, value)?;
        Ok(self)
    }
}

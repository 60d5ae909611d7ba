/// Record severity levels.
///
/// The ring stores the raw `u8`, so producers may use values outside this
/// set; nothing in the log filters on severity.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Trace = 0x10,
    Debug = 0x20,
    Info = 0x30,
    Warning = 0x40,
    Error = 0x50,
    Fatal = 0x60,
}

impl Severity {
    pub const fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            0x10 => Some(Self::Trace),
            0x20 => Some(Self::Debug),
            0x30 => Some(Self::Info),
            0x40 => Some(Self::Warning),
            0x50 => Some(Self::Error),
            0x60 => Some(Self::Fatal),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl From<Severity> for u8 {
    #[inline]
    fn from(s: Severity) -> u8 {
        s as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_values_map_back() {
        for s in [
            Severity::Trace,
            Severity::Debug,
            Severity::Info,
            Severity::Warning,
            Severity::Error,
            Severity::Fatal,
        ] {
            assert_eq!(Severity::from_u8(u8::from(s)), Some(s));
        }
        assert_eq!(Severity::from_u8(0x31), None);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
    }
}

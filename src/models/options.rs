use image::Rgba;
use std::fmt;
use std::str::FromStr;

/// Error correction level requested from the standards encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ECLevel {
    /// Low (~7% recovery capacity)
    L,
    /// Medium (~15% recovery capacity)
    #[default]
    M,
    /// Quartile (~25% recovery capacity)
    Q,
    /// High (~30% recovery capacity)
    H,
}

impl ECLevel {
    pub(crate) fn to_qrcode(self) -> qrcode::EcLevel {
        match self {
            ECLevel::L => qrcode::EcLevel::L,
            ECLevel::M => qrcode::EcLevel::M,
            ECLevel::Q => qrcode::EcLevel::Q,
            ECLevel::H => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ECLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "L" | "l" => Ok(ECLevel::L),
            "M" | "m" => Ok(ECLevel::M),
            "Q" | "q" => Ok(ECLevel::Q),
            "H" | "h" => Ok(ECLevel::H),
            other => Err(format!("unknown error correction level '{other}'")),
        }
    }
}

impl fmt::Display for ECLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ECLevel::L => "L",
            ECLevel::M => "M",
            ECLevel::Q => "Q",
            ECLevel::H => "H",
        };
        f.write_str(s)
    }
}

/// Raster rendering options for an encoded ticket code
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Raster width in pixels
    pub width: u32,
    /// Raster height in pixels
    pub height: u32,
    /// Quiet zone, in units of 8 pixels for the builtin pattern and modules for
    /// the standards encoder
    pub margin: u32,
    /// Dark module color
    pub dark: Rgba<u8>,
    /// Light module / background color
    pub light: Rgba<u8>,
    /// Error correction level
    pub ec_level: ECLevel,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 200,
            height: 200,
            margin: 2,
            dark: Rgba([0x00, 0x00, 0x00, 0xff]),
            light: Rgba([0xff, 0xff, 0xff, 0xff]),
            ec_level: ECLevel::M,
        }
    }
}

impl RenderOptions {
    /// Options used for ticket codes: highest error correction, 200x200
    pub fn ticket() -> Self {
        Self {
            ec_level: ECLevel::H,
            ..Self::default()
        }
    }
}

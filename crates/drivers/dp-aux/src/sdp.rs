//! VSC secondary data packet description.

/// Pixel encoding field of a VSC SDP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PixelFormat {
    Rgb = 0,
    Yuv444 = 1,
    Yuv422 = 2,
    Yuv420 = 3,
    YOnly = 4,
    Raw = 5,
    Reserved = 6,
}

impl PixelFormat {
    /// `None` past the reserved value.
    pub const fn from_raw(raw: u8) -> Option<Self> {
        Some(match raw {
            0 => Self::Rgb,
            1 => Self::Yuv444,
            2 => Self::Yuv422,
            3 => Self::Yuv420,
            4 => Self::YOnly,
            5 => Self::Raw,
            6 => Self::Reserved,
            _ => return None,
        })
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Yuv444 => "YUV444",
            Self::Yuv422 => "YUV422",
            Self::Yuv420 => "YUV420",
            Self::YOnly => "Y_ONLY",
            Self::Raw => "RAW",
            Self::Reserved => "Reserved",
        }
    }

    const fn is_yuv(self) -> bool {
        matches!(self, Self::Yuv444 | Self::Yuv422 | Self::Yuv420)
    }
}

pub fn pixel_format_name(raw: u8) -> &'static str {
    PixelFormat::from_raw(raw).map_or("Invalid", PixelFormat::name)
}

/// Colorimetry name; the same code means different things for RGB and YCbCr.
pub fn colorimetry_name(pixel_format: u8, colorimetry: u8) -> &'static str {
    let Some(format) = PixelFormat::from_raw(pixel_format) else {
        return "Invalid";
    };

    // (RGB name, YCbCr name)
    let (rgb, yuv) = match colorimetry {
        0 => {
            return match format {
                PixelFormat::Rgb => "sRGB",
                PixelFormat::YOnly => "DICOM PS3.14",
                PixelFormat::Raw => "Custom Color Profile",
                PixelFormat::Reserved => "Reserved",
                _ => "BT.601",
            };
        }
        1 => ("Wide Fixed", "BT.709"),
        2 => ("Wide Float", "xvYCC 601"),
        3 => ("OpRGB", "xvYCC 709"),
        4 => ("DCI-P3", "sYCC 601"),
        5 => ("Custom Profile", "OpYCC 601"),
        6 => ("BT.2020 RGB", "BT.2020 CYCC"),
        7 => ("Reserved", "BT.2020 YCC"),
        _ => return "Invalid",
    };

    if format == PixelFormat::Rgb {
        rgb
    } else if format.is_yuv() {
        yuv
    } else {
        "Reserved"
    }
}

pub fn dynamic_range_name(raw: u8) -> &'static str {
    match raw {
        0 => "VESA range",
        1 => "CTA range",
        _ => "Invalid",
    }
}

pub fn content_type_name(raw: u8) -> &'static str {
    match raw {
        0 => "Not defined",
        1 => "Graphics",
        2 => "Photo",
        3 => "Video",
        4 => "Game",
        _ => "Reserved",
    }
}

/// Decoded VSC SDP header and colorimetry payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VscSdp {
    pub revision: u8,
    pub length: u8,
    pub pixel_format: u8,
    pub colorimetry: u8,
    pub bpc: u32,
    pub dynamic_range: u8,
    pub content_type: u8,
}

impl VscSdp {
    pub fn log(&self, level: log::Level) {
        log::log!(level, "DP SDP: VSC, revision {}, length {}", self.revision, self.length);
        log::log!(level, "    pixelformat: {}", pixel_format_name(self.pixel_format));
        log::log!(
            level,
            "    colorimetry: {}",
            colorimetry_name(self.pixel_format, self.colorimetry)
        );
        log::log!(level, "    bpc: {}", self.bpc);
        log::log!(level, "    dynamic range: {}", dynamic_range_name(self.dynamic_range));
        log::log!(level, "    content type: {}", content_type_name(self.content_type));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_names() {
        assert_eq!(pixel_format_name(0), "RGB");
        assert_eq!(pixel_format_name(4), "Y_ONLY");
        assert_eq!(pixel_format_name(6), "Reserved");
        assert_eq!(pixel_format_name(7), "Invalid");
    }

    #[test]
    fn test_colorimetry_depends_on_format() {
        assert_eq!(colorimetry_name(0, 0), "sRGB");
        assert_eq!(colorimetry_name(2, 0), "BT.601");
        assert_eq!(colorimetry_name(4, 0), "DICOM PS3.14");
        assert_eq!(colorimetry_name(5, 0), "Custom Color Profile");
        assert_eq!(colorimetry_name(0, 3), "OpRGB");
        assert_eq!(colorimetry_name(3, 3), "xvYCC 709");
        assert_eq!(colorimetry_name(4, 3), "Reserved");
    }

    #[test]
    fn test_bt2020_ycc_is_yuv_only() {
        assert_eq!(colorimetry_name(1, 7), "BT.2020 YCC");
        assert_eq!(colorimetry_name(0, 7), "Reserved");
        assert_eq!(colorimetry_name(0, 6), "BT.2020 RGB");
    }

    #[test]
    fn test_invalid_inputs() {
        assert_eq!(colorimetry_name(9, 0), "Invalid");
        assert_eq!(colorimetry_name(0, 8), "Invalid");
        assert_eq!(dynamic_range_name(2), "Invalid");
        assert_eq!(content_type_name(5), "Reserved");
        assert_eq!(content_type_name(4), "Game");
    }
}

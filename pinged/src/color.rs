/// RGBA color used in layer paint properties.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// Extruded buildings.
    pub const GRAY: Color = Color::from_hex("#AAAAAA");
    /// Free-flowing traffic.
    pub const TRAFFIC_LOW: Color = Color::from_hex("#43A047");
    /// Moderate congestion.
    pub const TRAFFIC_MODERATE: Color = Color::from_hex("#FBC02D");
    /// Heavy congestion.
    pub const TRAFFIC_HEAVY: Color = Color::from_hex("#FB8C00");
    /// Severe congestion.
    pub const TRAFFIC_SEVERE: Color = Color::from_hex("#E53935");
    /// Road segments without congestion data.
    pub const TRAFFIC_UNKNOWN: Color = Color::from_hex("#808080");
    /// Route line.
    pub const ROUTE: Color = Color::from_hex("#2563EB");

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`. Returns `None` for any other input.
    pub fn try_from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        let valid_len = digits.len() == 6 || digits.len() == 8;
        if !valid_len || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        let a = if digits.len() == 8 {
            channel(6)?
        } else {
            u8::MAX
        };

        Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }

    /// Opaque color from a `#RRGGBB` literal, evaluated at compile time. Only used for the
    /// palette constants, so a malformed literal fails the build instead of a caller.
    pub(crate) const fn from_hex(hex: &'static str) -> Self {
        let bytes = hex.as_bytes();
        if bytes.len() != 7 || bytes[0] != b'#' {
            panic!("expected a #RRGGBB color");
        }

        Self::rgba(
            hex_pair(bytes[1], bytes[2]),
            hex_pair(bytes[3], bytes[4]),
            hex_pair(bytes[5], bytes[6]),
            u8::MAX,
        )
    }

    /// CSS notation understood by the rendering engine: `#rrggbb` for opaque colors and
    /// `rgba(r, g, b, a)` otherwise.
    pub fn to_css(&self) -> String {
        if self.a == u8::MAX {
            return format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b);
        }

        let alpha = f32::from(self.a) / 255.0;
        format!("rgba({}, {}, {}, {alpha:.3})", self.r, self.g, self.b)
    }
}

const fn hex_pair(high: u8, low: u8) -> u8 {
    hex_digit(high) << 4 | hex_digit(low)
}

const fn hex_digit(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => panic!("invalid hex digit"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn css_notation() {
        assert_eq!(Color::TRAFFIC_LOW.to_css(), "#43a047");
        assert_eq!(Color::from_hex("#43A047"), Color::rgba(0x43, 0xa0, 0x47, 255));
        assert_eq!(
            Color::rgba(67, 160, 71, 0).to_css(),
            "rgba(67, 160, 71, 0.000)"
        );
    }

    #[test]
    fn malformed_hex_is_rejected() {
        assert_eq!(
            Color::try_from_hex("#43a04780"),
            Some(Color::rgba(0x43, 0xa0, 0x47, 0x80))
        );
        assert_eq!(Color::try_from_hex("#2563EB"), Some(Color::ROUTE));
        assert_eq!(Color::try_from_hex("43A047"), None);
        assert_eq!(Color::try_from_hex("#43A04"), None);
        assert_eq!(Color::try_from_hex("#43G047"), None);
        assert_eq!(Color::try_from_hex("#ééé"), None);
        assert_eq!(Color::try_from_hex("#+43A04"), None);
    }
}

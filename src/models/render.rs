//! Rendering related enumerations selected by name in the config file

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Largest buffer age the GLX backend tracks
pub const MAX_BUFFER_AGE: i32 = 5;

/// Rendering backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    XRender,
    Glx,
    XrGlxHybrid,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::XRender, Backend::Glx, Backend::XrGlxHybrid];

    pub fn name(self) -> &'static str {
        match self {
            Backend::XRender => "xrender",
            Backend::Glx => "glx",
            Backend::XrGlxHybrid => "xr_glx_hybrid",
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Backend::XRender
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .iter()
            .copied()
            .find(|b| b.name() == s)
            .ok_or_else(|| format!("Invalid backend: {}", s))
    }
}

/// VSync method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VSyncMode {
    None,
    Drm,
    Opengl,
    OpenglOml,
    OpenglSwc,
    OpenglMswc,
}

impl VSyncMode {
    pub const ALL: [VSyncMode; 6] = [
        VSyncMode::None,
        VSyncMode::Drm,
        VSyncMode::Opengl,
        VSyncMode::OpenglOml,
        VSyncMode::OpenglSwc,
        VSyncMode::OpenglMswc,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VSyncMode::None => "none",
            VSyncMode::Drm => "drm",
            VSyncMode::Opengl => "opengl",
            VSyncMode::OpenglOml => "opengl-oml",
            VSyncMode::OpenglSwc => "opengl-swc",
            VSyncMode::OpenglMswc => "opengl-mswc",
        }
    }
}

impl Default for VSyncMode {
    fn default() -> Self {
        VSyncMode::None
    }
}

impl fmt::Display for VSyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VSyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VSyncMode::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| format!("Invalid vsync mode: {}", s))
    }
}

/// How the GLX backend assumes the back buffer survives a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlxSwapMethod {
    /// Repaint everything on every frame
    Undefined,
    /// Back buffer is copied, previous frame retained
    Copy,
    /// Front and back buffers are exchanged
    Exchange,
    /// Query `GLX_EXT_buffer_age` every frame
    BufferAge,
    /// Fixed number of buffers in rotation (3 up to `MAX_BUFFER_AGE + 1`)
    Buffers(u8),
}

impl GlxSwapMethod {
    /// Buffer age value handed to the backend
    pub fn age(self) -> i32 {
        match self {
            GlxSwapMethod::Undefined => 0,
            GlxSwapMethod::Copy => 1,
            GlxSwapMethod::Exchange => 2,
            GlxSwapMethod::BufferAge => -1,
            GlxSwapMethod::Buffers(n) => i32::from(n),
        }
    }

    fn from_age(age: i32) -> Option<Self> {
        match age {
            -1 => Some(GlxSwapMethod::BufferAge),
            0 => Some(GlxSwapMethod::Undefined),
            1 => Some(GlxSwapMethod::Copy),
            2 => Some(GlxSwapMethod::Exchange),
            n if (3..=MAX_BUFFER_AGE + 1).contains(&n) => Some(GlxSwapMethod::Buffers(n as u8)),
            _ => None,
        }
    }
}

impl Default for GlxSwapMethod {
    fn default() -> Self {
        GlxSwapMethod::Undefined
    }
}

impl FromStr for GlxSwapMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "undefined" => return Ok(GlxSwapMethod::Undefined),
            "copy" => return Ok(GlxSwapMethod::Copy),
            "exchange" => return Ok(GlxSwapMethod::Exchange),
            "buffer-age" => return Ok(GlxSwapMethod::BufferAge),
            _ => {}
        }

        let trimmed = s.trim_start();
        if trimmed.is_empty() {
            return Err(format!("glx-swap-method is an invalid number: {}", s));
        }
        // Leading number, trailing whitespace only
        let age = parse_c_integer(trimmed.trim_end())
            .ok_or_else(|| format!("Trailing characters in glx-swap-method option: {}", s))?;
        let age = i32::try_from(age)
            .map_err(|_| format!("Number too large/small for glx-swap-method: {}", s))?;

        GlxSwapMethod::from_age(age)
            .ok_or_else(|| format!("Number too large/small for glx-swap-method: {}", age))
    }
}

/// Parse an integer the way `strtol(s, _, 0)` reads a whole string:
/// optional sign, then hex (`0x`), octal (leading `0`) or decimal digits.
pub(crate) fn parse_c_integer(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, body) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    };
    // from_str_radix would accept a second sign here
    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return None;
    }

    let value = i64::from_str_radix(body, radix).ok()?;
    if negative {
        value.checked_neg()
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parsing() {
        assert_eq!("glx".parse::<Backend>().unwrap(), Backend::Glx);
        assert_eq!("xr_glx_hybrid".parse::<Backend>().unwrap(), Backend::XrGlxHybrid);
        assert!("GLX".parse::<Backend>().is_err());
        assert!("opengl".parse::<Backend>().is_err());
    }

    #[test]
    fn test_vsync_parsing() {
        assert_eq!("opengl-swc".parse::<VSyncMode>().unwrap(), VSyncMode::OpenglSwc);
        assert_eq!("none".parse::<VSyncMode>().unwrap(), VSyncMode::None);
        assert!("not-a-real-mode".parse::<VSyncMode>().is_err());
    }

    #[test]
    fn test_glx_swap_method_aliases() {
        assert_eq!("copy".parse::<GlxSwapMethod>().unwrap(), GlxSwapMethod::Copy);
        assert_eq!(
            "buffer-age".parse::<GlxSwapMethod>().unwrap(),
            GlxSwapMethod::BufferAge
        );
        assert_eq!("undefined".parse::<GlxSwapMethod>().unwrap().age(), 0);
    }

    #[test]
    fn test_glx_swap_method_numbers() {
        assert_eq!("3".parse::<GlxSwapMethod>().unwrap(), GlxSwapMethod::Buffers(3));
        assert_eq!("6 ".parse::<GlxSwapMethod>().unwrap(), GlxSwapMethod::Buffers(6));
        assert_eq!("-1".parse::<GlxSwapMethod>().unwrap(), GlxSwapMethod::BufferAge);
        assert_eq!("0x2".parse::<GlxSwapMethod>().unwrap(), GlxSwapMethod::Exchange);

        assert!("7".parse::<GlxSwapMethod>().is_err());
        assert!("-2".parse::<GlxSwapMethod>().is_err());
        assert!("3 buffers".parse::<GlxSwapMethod>().is_err());
        assert!("".parse::<GlxSwapMethod>().is_err());
    }

    #[test]
    fn test_parse_c_integer() {
        assert_eq!(parse_c_integer("42"), Some(42));
        assert_eq!(parse_c_integer("-0x10"), Some(-16));
        assert_eq!(parse_c_integer("010"), Some(8));
        assert_eq!(parse_c_integer("0"), Some(0));
        assert_eq!(parse_c_integer("4a"), None);
        assert_eq!(parse_c_integer("-"), None);
        assert_eq!(parse_c_integer("0x"), None);
        assert_eq!(parse_c_integer("08"), None);
    }

    #[test]
    fn test_parse_c_integer_rejects_inner_sign() {
        assert_eq!(parse_c_integer("0-1"), None);
        assert_eq!(parse_c_integer("0x-1"), None);
        assert_eq!(parse_c_integer("-0x-8000000000000000"), None);
        assert_eq!(parse_c_integer("+-5"), None);

        assert!("0-1".parse::<GlxSwapMethod>().is_err());
        assert!("-0x-8000000000000000".parse::<GlxSwapMethod>().is_err());
    }
}

//! Convolution kernels for background blur

use serde::{Deserialize, Serialize};

/// Maximum number of blur passes (one kernel per pass)
pub const MAX_BLUR_PASS: usize = 5;

/// Largest accepted kernel width or height
pub const MAX_KERNEL_DIMENSION: i64 = 127;

/// Kernels accepted by name in `blur-kern`
const PREDEFINED_BOX: [(&str, usize); 3] = [("3x3box", 3), ("5x5box", 5), ("7x7box", 7)];
const PREDEFINED_GAUSSIAN: [(&str, usize); 5] = [
    ("3x3gaussian", 3),
    ("5x5gaussian", 5),
    ("7x7gaussian", 7),
    ("9x9gaussian", 9),
    ("11x11gaussian", 11),
];

/// A convolution kernel with odd dimensions. The centre element is always 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvKernel {
    pub width: usize,
    pub height: usize,
    /// Row-major weights, `width * height` entries
    pub data: Vec<f64>,
}

impl ConvKernel {
    fn from_fn(size: usize, weight: impl Fn(i64, i64) -> f64) -> Self {
        let r = (size / 2) as i64;
        let mut data = Vec::with_capacity(size * size);
        for y in -r..=r {
            for x in -r..=r {
                data.push(weight(x, y));
            }
        }
        Self {
            width: size,
            height: size,
            data,
        }
    }

    /// Box kernel of equal weights
    pub fn box_blur(size: usize) -> Self {
        Self::from_fn(size, |_, _| 1.0)
    }

    /// Gaussian kernel normalised to a centre weight of 1
    pub fn gaussian(size: usize) -> Self {
        Self::from_fn(size, |x, y| {
            (-((x * x + y * y) as f64) / std::f64::consts::SQRT_2).exp()
        })
    }

    /// Weight at column `x`, row `y`
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn has_negative(&self) -> bool {
        self.data.iter().any(|v| *v < 0.0)
    }
}

/// Errors from parsing a `blur-kern` value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlurKernelError {
    #[error("Invalid kernel dimension {0}x{1}: dimensions must be odd and within 1..=127")]
    InvalidDimension(i64, i64),

    #[error("Failed to read kernel {what} at \"{at}\"")]
    BadNumber { what: &'static str, at: String },

    #[error("Kernel needs {expected} values, found {found}")]
    MissingValues { expected: usize, found: usize },

    #[error("Trailing characters in blur kernel: \"{0}\"")]
    Trailing(String),

    #[error("Too many blur kernels (at most {0})")]
    TooMany(usize),

    #[error("Blur kernel string is empty")]
    Empty,
}

/// Parsed `blur-kern` value
#[derive(Debug, Clone, PartialEq)]
pub struct BlurKernels {
    pub kernels: Vec<ConvKernel>,
    pub has_negative: bool,
}

/// Parse a `blur-kern` value: a predefined kernel name, or up to `max`
/// custom kernels `w,h,v,v,...` separated by `;`.
///
/// Custom kernels list `w * h - 1` values; the centre element is omitted
/// and fixed at 1.
pub fn parse_blur_kernels(src: &str, max: usize) -> Result<BlurKernels, BlurKernelError> {
    let name = src.trim();
    if let Some((_, size)) = PREDEFINED_BOX.iter().find(|(n, _)| *n == name) {
        return Ok(BlurKernels {
            kernels: vec![ConvKernel::box_blur(*size)],
            has_negative: false,
        });
    }
    if let Some((_, size)) = PREDEFINED_GAUSSIAN.iter().find(|(n, _)| *n == name) {
        return Ok(BlurKernels {
            kernels: vec![ConvKernel::gaussian(*size)],
            has_negative: false,
        });
    }

    let mut kernels = Vec::new();
    let mut rest = src;
    while !rest.trim().is_empty() {
        if kernels.len() >= max {
            return Err(BlurKernelError::TooMany(max));
        }
        let (kernel, tail) = parse_one_kernel(rest)?;
        kernels.push(kernel);
        rest = tail;
    }

    if kernels.is_empty() {
        return Err(BlurKernelError::Empty);
    }

    let has_negative = kernels.iter().any(ConvKernel::has_negative);
    Ok(BlurKernels {
        kernels,
        has_negative,
    })
}

/// Parse one kernel, returning it and the text after its `;` separator
fn parse_one_kernel(src: &str) -> Result<(ConvKernel, &str), BlurKernelError> {
    let (body, tail) = match src.find(';') {
        Some(pos) => (&src[..pos], &src[pos + 1..]),
        None => (src, ""),
    };

    let mut fields = body.split(',').map(str::trim);
    let width = read_dimension(fields.next(), "width", body)?;
    let height = read_dimension(fields.next(), "height", body)?;
    let in_range = |d: i64| d > 0 && d % 2 == 1 && d <= MAX_KERNEL_DIMENSION;
    if !in_range(width) || !in_range(height) {
        return Err(BlurKernelError::InvalidDimension(width, height));
    }
    if width > 16 || height > 16 {
        tracing::warn!("Blur kernel {}x{} is large and may be slow", width, height);
    }

    let (width, height) = (width as usize, height as usize);
    let expected = width * height - 1;
    let mut values = Vec::new();
    for field in fields {
        // A trailing comma before `;` or end of input leaves one empty field
        if field.is_empty() && values.len() == expected {
            continue;
        }
        if values.len() == expected {
            return Err(BlurKernelError::Trailing(field.to_string()));
        }
        let value = field.parse::<f64>().map_err(|_| BlurKernelError::BadNumber {
            what: "value",
            at: field.to_string(),
        })?;
        values.push(value);
    }
    if values.len() != expected {
        return Err(BlurKernelError::MissingValues {
            expected,
            found: values.len(),
        });
    }

    let center = expected / 2;
    values.insert(center, 1.0);
    Ok((
        ConvKernel {
            width,
            height,
            data: values,
        },
        tail,
    ))
}

fn read_dimension(
    field: Option<&str>,
    what: &'static str,
    body: &str,
) -> Result<i64, BlurKernelError> {
    field
        .filter(|f| !f.is_empty())
        .and_then(|f| f.parse::<i64>().ok())
        .ok_or_else(|| BlurKernelError::BadNumber {
            what,
            at: body.trim().to_string(),
        })
}

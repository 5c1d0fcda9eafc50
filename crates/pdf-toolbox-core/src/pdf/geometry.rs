//! Page geometry: page sizes, size policies and uniform scale factors.
//!
//! All arithmetic is in PDF points (1/72 inch).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;
/// Points per millimetre.
pub const POINTS_PER_MM: f32 = 72.0 / 25.4;

/// Width and height of a page in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size after applying a uniform scale factor.
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }

    /// Whether this size fits inside `other` (with a small tolerance for float error).
    pub fn fits_within(self, other: Self) -> bool {
        const EPSILON: f32 = 1e-3;
        self.width <= other.width + EPSILON && self.height <= other.height + EPSILON
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} pt", self.width, self.height)
    }
}

/// Paper sizes that can be requested by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedSize {
    A4,
    Letter,
}

impl NamedSize {
    /// The explicit size string this name stands for.
    pub const fn dimensions(self) -> &'static str {
        match self {
            Self::A4 => "210mmx297mm",
            Self::Letter => "8.5inx11in",
        }
    }

    pub fn page_size(self) -> Result<PageSize> {
        parse_dimensions(self.dimensions())
    }
}

/// How pages should be sized when merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizePolicy {
    /// Keep every page at its natural size.
    Preserve,
    /// Use the target resolved for the whole merge request.
    Global,
    /// Maximum width and maximum height across all pages, independently.
    Largest,
    /// Minimum width and minimum height across all pages, independently.
    Smallest,
    /// Size of the first page.
    First,
    Explicit(PageSize),
    Named(NamedSize),
}

impl SizePolicy {
    /// Resolve this policy against the natural sizes of the pages it applies to.
    ///
    /// `Preserve` resolves to `None`. `Global` also resolves to `None` here:
    /// the merge driver substitutes the request-wide target for it.
    pub fn resolve(self, pages: &[PageSize]) -> Result<Option<PageSize>> {
        let target = match self {
            Self::Preserve | Self::Global => return Ok(None),
            Self::Largest => {
                let (width, height) = fold_dimensions(pages, f32::max)?;
                PageSize::new(width, height)
            }
            Self::Smallest => {
                let (width, height) = fold_dimensions(pages, f32::min)?;
                PageSize::new(width, height)
            }
            Self::First => *pages.first().ok_or(Error::NoInput)?,
            Self::Explicit(size) => size,
            Self::Named(name) => name.page_size()?,
        };
        Ok(Some(target))
    }
}

impl FromStr for SizePolicy {
    type Err = Error;

    fn from_str(token: &str) -> Result<Self> {
        let normalized = token.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "preserve" => Ok(Self::Preserve),
            "global" => Ok(Self::Global),
            "largest" => Ok(Self::Largest),
            "smallest" => Ok(Self::Smallest),
            "first" => Ok(Self::First),
            "a4" => Ok(Self::Named(NamedSize::A4)),
            "letter" | "let" => Ok(Self::Named(NamedSize::Letter)),
            _ => parse_dimensions(token).map(Self::Explicit),
        }
    }
}

fn fold_dimensions(pages: &[PageSize], pick: fn(f32, f32) -> f32) -> Result<(f32, f32)> {
    let first = pages.first().ok_or(Error::NoInput)?;
    Ok(pages.iter().skip(1).fold((first.width, first.height), |(w, h), page| {
        (pick(w, page.width), pick(h, page.height))
    }))
}

/// Parse `WIDTHxHEIGHT` where each side may carry a `pt`, `in` or `mm` suffix.
///
/// Sides without a suffix are points. `8.5inx11in` is 612x792.
pub fn parse_dimensions(input: &str) -> Result<PageSize> {
    let parse_error = || Error::SizePolicyParse {
        input: input.to_string(),
    };

    let normalized = input.trim().to_ascii_lowercase();
    let (width, height) = normalized.split_once('x').ok_or_else(parse_error)?;
    let width = to_points(width).ok_or_else(parse_error)?;
    let height = to_points(height).ok_or_else(parse_error)?;
    Ok(PageSize::new(width, height))
}

fn to_points(value: &str) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(n) = value.strip_suffix("mm") {
        (n, POINTS_PER_MM)
    } else if let Some(n) = value.strip_suffix("in") {
        (n, POINTS_PER_INCH)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 1.0)
    } else {
        (value, 1.0)
    };

    let number: f32 = number.trim().parse().ok()?;
    (number.is_finite() && number > 0.0).then_some(number * factor)
}

/// Uniform scale that fits `natural` inside `target` without changing its aspect ratio.
///
/// An axis with a zero natural dimension contributes a factor of 1.0.
pub fn scale_factor(natural: PageSize, target: PageSize) -> f32 {
    let scale_x = if natural.width == 0.0 {
        1.0
    } else {
        target.width / natural.width
    };
    let scale_y = if natural.height == 0.0 {
        1.0
    } else {
        target.height / natural.height
    };
    scale_x.min(scale_y)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1.0
    }

    #[test]
    fn test_parse_inches() {
        let size = parse_dimensions("8.5inx11in").unwrap();
        assert!(close(size.width, 612.0));
        assert!(close(size.height, 792.0));
    }

    #[test]
    fn test_parse_mixed_units() {
        let size = parse_dimensions("210mmx11in").unwrap();
        assert!(close(size.width, 595.28));
        assert!(close(size.height, 792.0));

        let size = parse_dimensions("612x792pt").unwrap();
        assert_eq!(size, PageSize::new(612.0, 792.0));
    }

    #[test]
    fn test_parse_errors() {
        for input in ["612", "axb", "612x", "x792", "-5x10", "infxinf", ""] {
            let err = parse_dimensions(input).unwrap_err();
            assert!(
                matches!(err, Error::SizePolicyParse { input: ref got } if got == input),
                "{input}: {err}"
            );
        }
    }

    #[test]
    fn test_named_sizes() {
        let a4 = SizePolicy::from_str("A4").unwrap().resolve(&[]).unwrap().unwrap();
        assert!(close(a4.width, 595.28));
        assert!(close(a4.height, 841.89));

        for token in ["Letter", "let", "LETTER"] {
            let letter = token.parse::<SizePolicy>().unwrap().resolve(&[]).unwrap().unwrap();
            assert!(close(letter.width, 612.0));
            assert!(close(letter.height, 792.0));
        }
    }

    #[test]
    fn test_keywords() {
        assert_eq!("".parse::<SizePolicy>().unwrap(), SizePolicy::Preserve);
        assert_eq!(" Preserve ".parse::<SizePolicy>().unwrap(), SizePolicy::Preserve);
        assert_eq!("global".parse::<SizePolicy>().unwrap(), SizePolicy::Global);
        assert_eq!("LARGEST".parse::<SizePolicy>().unwrap(), SizePolicy::Largest);
        assert!(matches!(
            "tabloid".parse::<SizePolicy>(),
            Err(Error::SizePolicyParse { .. })
        ));
    }

    #[test]
    fn test_largest_and_smallest_are_per_axis() {
        let pages = [PageSize::new(200.0, 900.0), PageSize::new(400.0, 600.0)];

        let largest = SizePolicy::Largest.resolve(&pages).unwrap().unwrap();
        assert_eq!(largest, PageSize::new(400.0, 900.0));

        let smallest = SizePolicy::Smallest.resolve(&pages).unwrap().unwrap();
        assert_eq!(smallest, PageSize::new(200.0, 600.0));

        let first = SizePolicy::First.resolve(&pages).unwrap().unwrap();
        assert_eq!(first, PageSize::new(200.0, 900.0));
    }

    #[test]
    fn test_page_dependent_policies_need_pages() {
        assert!(matches!(SizePolicy::Largest.resolve(&[]), Err(Error::NoInput)));
        assert!(matches!(SizePolicy::First.resolve(&[]), Err(Error::NoInput)));
        assert_eq!(SizePolicy::Preserve.resolve(&[]).unwrap(), None);
        assert_eq!(SizePolicy::Global.resolve(&[]).unwrap(), None);
    }

    #[test]
    fn test_scale_factor_preserves_aspect() {
        let natural = PageSize::new(200.0, 300.0);
        let target = PageSize::new(400.0, 500.0);
        let scale = scale_factor(natural, target);
        assert!((scale - 5.0 / 3.0).abs() < 1e-6);
        assert!(natural.scaled(scale).fits_within(target));

        let cases = [
            (PageSize::new(612.0, 792.0), PageSize::new(595.28, 841.89)),
            (PageSize::new(100.0, 110.0), PageSize::new(612.0, 792.0)),
            (PageSize::new(1000.0, 50.0), PageSize::new(72.0, 72.0)),
        ];
        for (natural, target) in cases {
            let scale = scale_factor(natural, target);
            assert!(natural.scaled(scale).fits_within(target), "{natural} -> {target}");
        }
    }

    #[test]
    fn test_scale_factor_zero_dimension() {
        let scale = scale_factor(PageSize::new(0.0, 100.0), PageSize::new(50.0, 200.0));
        assert!((scale - 1.0).abs() < f32::EPSILON);

        let scale = scale_factor(PageSize::new(0.0, 0.0), PageSize::new(50.0, 200.0));
        assert!((scale - 1.0).abs() < f32::EPSILON);
    }
}

//! `@page` and `@font-face` rules.
//!
//! [CSS Paged Media Module Level 3](https://www.w3.org/TR/css-page-3/)

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cascade::CascadedStyle;
use crate::parser::Declaration;
use crate::selector::{Origin, Specificity};

/// [§ 4.2 Page-margin boxes](https://www.w3.org/TR/css-page-3/#margin-boxes)
///
/// "There are sixteen page-margin boxes."
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarginBoxName {
    /// `@top-left-corner`
    TopLeftCorner,
    /// `@top-left`
    TopLeft,
    /// `@top-center`
    TopCenter,
    /// `@top-right`
    TopRight,
    /// `@top-right-corner`
    TopRightCorner,
    /// `@right-top`
    RightTop,
    /// `@right-middle`
    RightMiddle,
    /// `@right-bottom`
    RightBottom,
    /// `@bottom-right-corner`
    BottomRightCorner,
    /// `@bottom-right`
    BottomRight,
    /// `@bottom-center`
    BottomCenter,
    /// `@bottom-left`
    BottomLeft,
    /// `@bottom-left-corner`
    BottomLeftCorner,
    /// `@left-bottom`
    LeftBottom,
    /// `@left-middle`
    LeftMiddle,
    /// `@left-top`
    LeftTop,
}

impl MarginBoxName {
    /// Recognize an at-keyword (without `@`).
    #[must_use]
    pub fn from_at_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "top-left-corner" => Self::TopLeftCorner,
            "top-left" => Self::TopLeft,
            "top-center" => Self::TopCenter,
            "top-right" => Self::TopRight,
            "top-right-corner" => Self::TopRightCorner,
            "right-top" => Self::RightTop,
            "right-middle" => Self::RightMiddle,
            "right-bottom" => Self::RightBottom,
            "bottom-right-corner" => Self::BottomRightCorner,
            "bottom-right" => Self::BottomRight,
            "bottom-center" => Self::BottomCenter,
            "bottom-left" => Self::BottomLeft,
            "bottom-left-corner" => Self::BottomLeftCorner,
            "left-bottom" => Self::LeftBottom,
            "left-middle" => Self::LeftMiddle,
            "left-top" => Self::LeftTop,
            _ => return None,
        })
    }

    /// The at-keyword (without `@`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopLeftCorner => "top-left-corner",
            Self::TopLeft => "top-left",
            Self::TopCenter => "top-center",
            Self::TopRight => "top-right",
            Self::TopRightCorner => "top-right-corner",
            Self::RightTop => "right-top",
            Self::RightMiddle => "right-middle",
            Self::RightBottom => "right-bottom",
            Self::BottomRightCorner => "bottom-right-corner",
            Self::BottomRight => "bottom-right",
            Self::BottomCenter => "bottom-center",
            Self::BottomLeft => "bottom-left",
            Self::BottomLeftCorner => "bottom-left-corner",
            Self::LeftBottom => "left-bottom",
            Self::LeftMiddle => "left-middle",
            Self::LeftTop => "left-top",
        }
    }
}

/// A compiled `@page` rule.
#[derive(Debug, Clone)]
pub struct PageRule {
    /// Page type name, if the selector names one.
    pub name: Option<String>,
    /// `first`, `left`, `right`, or `blank`.
    pub pseudo_page: Option<String>,
    /// Origin of the containing stylesheet.
    pub origin: Origin,
    /// Page selector specificity.
    pub specificity: Specificity,
    /// Source order across all stylesheets.
    pub order: usize,
    /// Declarations for the page box.
    pub declarations: Vec<Declaration>,
    /// Declarations per margin box.
    pub margin_boxes: BTreeMap<MarginBoxName, Vec<Declaration>>,
}

impl PageRule {
    /// [§ 3.2 Page selectors and specificity](https://www.w3.org/TR/css-page-3/#cascading-and-page-context)
    ///
    /// "A page selector with a page type name has specificity (1,0,0), each
    /// :first or :blank adds (0,1,0), each :left or :right adds (0,0,1)."
    #[must_use]
    pub fn page_specificity(name: Option<&str>, pseudo_page: Option<&str>) -> Specificity {
        let mut specificity = Specificity::default();
        if name.is_some() {
            specificity.0 += 1;
        }
        match pseudo_page {
            Some("first" | "blank") => specificity.1 += 1,
            Some("left" | "right") => specificity.2 += 1,
            _ => {}
        }
        specificity
    }

    /// Whether the rule applies to a page of type `page_name` that is the
    /// `pseudo_page` page.
    ///
    /// An unqualified rule applies to every page. A `:right` rule also
    /// applies to the first page, which is a right page in left-to-right
    /// documents.
    #[must_use]
    pub fn applies(&self, page_name: Option<&str>, pseudo_page: Option<&str>) -> bool {
        if let Some(name) = &self.name {
            if page_name != Some(name.as_str()) {
                return false;
            }
        }
        match self.pseudo_page.as_deref() {
            None => true,
            Some(wanted) => match pseudo_page {
                Some(actual) if actual.eq_ignore_ascii_case(wanted) => true,
                Some(actual) => wanted == "right" && actual.eq_ignore_ascii_case("first"),
                None => false,
            },
        }
    }
}

/// Cascaded style of a page box and its margin boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageCascadedStyle {
    /// Declarations for the page box, in cascade order.
    pub style: CascadedStyle,
    /// Declarations for each margin box, in cascade order.
    pub margin_boxes: BTreeMap<MarginBoxName, CascadedStyle>,
}

/// [CSS Fonts § 4 `@font-face`](https://www.w3.org/TR/css-fonts-4/#font-face-rule)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FontFaceRule {
    /// Origin of the containing stylesheet.
    pub origin: Origin,
    /// The font descriptors.
    pub declarations: Vec<Declaration>,
}

impl FontFaceRule {
    /// Value of a descriptor such as `font-family` or `src`.
    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&str> {
        self.declarations
            .iter()
            .rev()
            .find(|d| d.property == name)
            .map(|d| d.value.as_str())
    }
}

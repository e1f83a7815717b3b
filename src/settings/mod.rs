//! # Layout Settings
//!
//! The canonical record of header, logo, font and page configuration.
//! Settings are persisted as flat key/value pairs and rebuilt field by field:
//! a missing or malformed value falls back to that field's default and never
//! aborts loading the rest.

pub mod store;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SettingsError;
pub use store::{
    export_settings_json, import_settings_json, JsonFileStore, MemoryStore, SettingsStore,
};

/// Version written alongside the settings so later layouts can migrate.
pub const LAYOUT_VERSION: u32 = 2;

/// Fixed key names in the settings store.
pub mod keys {
    pub const COMPANY_NAME: &str = "company_name";
    pub const ADDRESS: &str = "company_address";
    pub const PHONE: &str = "company_phone";
    pub const EMAIL: &str = "company_email";
    pub const COMMENTS: &str = "company_comments";
    pub const LOGO_PATH: &str = "logo_path";
    pub const LOGO_WIDTH: &str = "logo_width";
    pub const LOGO_X: &str = "logo_x";
    pub const LOGO_Y: &str = "logo_y";
    pub const HEADER_X: &str = "header_x";
    pub const HEADER_Y: &str = "header_y";
    pub const HEADER_ALIGN: &str = "header_align";
    pub const FONT_SIZE_HEADER: &str = "font_size_header";
    pub const FONT_SIZE_BODY: &str = "font_size_body";
    pub const PAGE_SIZE: &str = "page_size";
    pub const PAGE_MODE: &str = "page_mode";
    pub const PAGE_WIDTH: &str = "page_width";
    pub const PAGE_HEIGHT: &str = "page_height";
    pub const CUSTOM_SHAPES: &str = "custom_shapes";
    pub const LAYOUT_VERSION: &str = "layout_version";
}

/// Horizontal alignment of the company header block around `header_x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Named page sizes. `Custom` uses `page_width`/`page_height`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Custom,
}

/// Whether the document occupies the full sheet or the top half.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageMode {
    #[default]
    Full,
    Half,
}

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok(Self::$variant),)+
                    other => Err(format!("unknown value '{}'", other)),
                }
            }
        }
    };
}

string_enum!(HeaderAlign { Left => "left", Center => "center", Right => "right" });
string_enum!(PageSize { A4 => "a4", A5 => "a5", Custom => "custom" });
string_enum!(PageMode { Full => "full", Half => "half" });

/// Header, logo, font and page configuration.
///
/// All lengths are millimetres; font sizes are points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub company_name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub comments: String,

    /// Relative filename in the image store.
    pub logo_path: Option<String>,
    pub logo_width: f64,
    pub logo_x: f64,
    pub logo_y: f64,

    pub header_x: f64,
    pub header_y: f64,
    pub header_align: HeaderAlign,

    pub font_size_header: f64,
    pub font_size_body: f64,

    pub page_size: PageSize,
    pub page_mode: PageMode,
    pub page_width: f64,
    pub page_height: f64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            company_name: String::new(),
            address: String::new(),
            phone: String::new(),
            email: String::new(),
            comments: String::new(),
            logo_path: None,
            logo_width: 40.0,
            logo_x: 15.0,
            logo_y: 10.0,
            header_x: 105.0,
            header_y: 15.0,
            header_align: HeaderAlign::Center,
            font_size_header: 18.0,
            font_size_body: 10.0,
            page_size: PageSize::A4,
            page_mode: PageMode::Full,
            page_width: 210.0,
            page_height: 297.0,
        }
    }
}

impl LayoutSettings {
    /// Whether the company block carries a comments line.
    pub fn has_comments(&self) -> bool {
        !self.comments.trim().is_empty()
    }

    /// Check the invariants a persisted record must hold.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let positive = [
            (keys::PAGE_WIDTH, self.page_width),
            (keys::PAGE_HEIGHT, self.page_height),
            (keys::FONT_SIZE_HEADER, self.font_size_header),
            (keys::FONT_SIZE_BODY, self.font_size_body),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::Invalid {
                    key: key.to_string(),
                    reason: format!("must be a positive number, got {}", value),
                });
            }
        }
        let finite = [
            (keys::LOGO_WIDTH, self.logo_width),
            (keys::LOGO_X, self.logo_x),
            (keys::LOGO_Y, self.logo_y),
            (keys::HEADER_X, self.header_x),
            (keys::HEADER_Y, self.header_y),
        ];
        for (key, value) in finite {
            if !value.is_finite() {
                return Err(SettingsError::Invalid {
                    key: key.to_string(),
                    reason: "must be a finite number".to_string(),
                });
            }
        }
        if self.logo_width < 0.0 {
            return Err(SettingsError::Invalid {
                key: keys::LOGO_WIDTH.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }

    /// Rebuild settings from stored pairs, defaulting field by field.
    pub fn from_pairs(pairs: &BTreeMap<String, String>) -> Self {
        let d = Self::default();
        let text = |key: &str, default: &str| -> String {
            pairs.get(key).cloned().unwrap_or_else(|| default.to_string())
        };

        let logo_path = pairs
            .get(keys::LOGO_PATH)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Self {
            company_name: text(keys::COMPANY_NAME, &d.company_name),
            address: text(keys::ADDRESS, &d.address),
            phone: text(keys::PHONE, &d.phone),
            email: text(keys::EMAIL, &d.email),
            comments: text(keys::COMMENTS, &d.comments),
            logo_path,
            logo_width: parse_number(pairs, keys::LOGO_WIDTH, d.logo_width, |v| v >= 0.0),
            logo_x: parse_number(pairs, keys::LOGO_X, d.logo_x, |_| true),
            logo_y: parse_number(pairs, keys::LOGO_Y, d.logo_y, |_| true),
            header_x: parse_number(pairs, keys::HEADER_X, d.header_x, |_| true),
            header_y: parse_number(pairs, keys::HEADER_Y, d.header_y, |_| true),
            header_align: parse_enum(pairs, keys::HEADER_ALIGN, d.header_align),
            font_size_header: parse_number(pairs, keys::FONT_SIZE_HEADER, d.font_size_header, |v| v > 0.0),
            font_size_body: parse_number(pairs, keys::FONT_SIZE_BODY, d.font_size_body, |v| v > 0.0),
            page_size: parse_enum(pairs, keys::PAGE_SIZE, d.page_size),
            page_mode: parse_enum(pairs, keys::PAGE_MODE, d.page_mode),
            page_width: parse_number(pairs, keys::PAGE_WIDTH, d.page_width, |v| v > 0.0),
            page_height: parse_number(pairs, keys::PAGE_HEIGHT, d.page_height, |v| v > 0.0),
        }
    }

    /// Flatten into the stored key/value pairs (shapes are stored separately).
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            (keys::COMPANY_NAME, self.company_name.clone()),
            (keys::ADDRESS, self.address.clone()),
            (keys::PHONE, self.phone.clone()),
            (keys::EMAIL, self.email.clone()),
            (keys::COMMENTS, self.comments.clone()),
            (keys::LOGO_PATH, self.logo_path.clone().unwrap_or_default()),
            (keys::LOGO_WIDTH, self.logo_width.to_string()),
            (keys::LOGO_X, self.logo_x.to_string()),
            (keys::LOGO_Y, self.logo_y.to_string()),
            (keys::HEADER_X, self.header_x.to_string()),
            (keys::HEADER_Y, self.header_y.to_string()),
            (keys::HEADER_ALIGN, self.header_align.to_string()),
            (keys::FONT_SIZE_HEADER, self.font_size_header.to_string()),
            (keys::FONT_SIZE_BODY, self.font_size_body.to_string()),
            (keys::PAGE_SIZE, self.page_size.to_string()),
            (keys::PAGE_MODE, self.page_mode.to_string()),
            (keys::PAGE_WIDTH, self.page_width.to_string()),
            (keys::PAGE_HEIGHT, self.page_height.to_string()),
        ];
        pairs.push((keys::LAYOUT_VERSION, LAYOUT_VERSION.to_string()));
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Load settings from a store. Store failures propagate; bad values do not.
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        let pairs = store.entries()?;
        Ok(Self::from_pairs(&pairs))
    }

    /// Validate and write every field to the store.
    pub fn save(&self, store: &mut dyn SettingsStore) -> Result<(), SettingsError> {
        self.validate()?;
        store.set_many(&self.to_pairs())
    }
}

fn parse_number(
    pairs: &BTreeMap<String, String>,
    key: &str,
    default: f64,
    accept: impl Fn(f64) -> bool,
) -> f64 {
    let Some(raw) = pairs.get(key) else {
        return default;
    };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && accept(value) => value,
        _ => {
            warn!("Setting '{}' has invalid value '{}', using default {}", key, raw, default);
            default
        }
    }
}

fn parse_enum<T>(pairs: &BTreeMap<String, String>, key: &str, default: T) -> T
where
    T: FromStr<Err = String> + fmt::Display + Copy,
{
    let Some(raw) = pairs.get(key) else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(reason) => {
            warn!("Setting '{}': {}, using default '{}'", key, reason, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> BTreeMap<String, String> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_store_yields_defaults() {
        let settings = LayoutSettings::from_pairs(&BTreeMap::new());
        assert_eq!(settings, LayoutSettings::default());
    }

    #[test]
    fn test_malformed_values_fall_back_per_field() {
        let settings = LayoutSettings::from_pairs(&pairs(&[
            (keys::LOGO_WIDTH, "wide"),
            (keys::HEADER_ALIGN, "diagonal"),
            (keys::PAGE_WIDTH, "-10"),
            (keys::HEADER_Y, "42.5"),
        ]));
        assert_eq!(settings.logo_width, 40.0);
        assert_eq!(settings.header_align, HeaderAlign::Center);
        assert_eq!(settings.page_width, 210.0);
        assert_eq!(settings.header_y, 42.5);
    }

    #[test]
    fn test_round_trip_through_store() {
        let mut store = MemoryStore::new();
        let settings = LayoutSettings {
            company_name: "Acme Traders".to_string(),
            comments: "GSTIN 29ABCDE1234F1Z5".to_string(),
            logo_path: Some("logo.png".to_string()),
            header_align: HeaderAlign::Right,
            page_size: PageSize::Custom,
            page_mode: PageMode::Half,
            page_width: 180.0,
            page_height: 250.0,
            ..Default::default()
        };
        settings.save(&mut store).unwrap();
        assert_eq!(
            store.get(keys::LAYOUT_VERSION).unwrap().as_deref(),
            Some("2")
        );
        let loaded = LayoutSettings::load(&store).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_empty_logo_path_is_absent() {
        let settings = LayoutSettings::from_pairs(&pairs(&[(keys::LOGO_PATH, "  ")]));
        assert_eq!(settings.logo_path, None);
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let settings = LayoutSettings {
            font_size_body: 0.0,
            ..Default::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("font_size_body"));

        let mut store = MemoryStore::new();
        assert!(settings.save(&mut store).is_err());
        assert!(store.entries().unwrap().is_empty());
    }

    #[test]
    fn test_enum_parsing_is_case_insensitive() {
        assert_eq!("A5".parse::<PageSize>().unwrap(), PageSize::A5);
        assert_eq!(" Half ".parse::<PageMode>().unwrap(), PageMode::Half);
        assert!("letter".parse::<PageSize>().is_err());
    }

    #[test]
    fn test_has_comments_ignores_whitespace() {
        let mut settings = LayoutSettings::default();
        assert!(!settings.has_comments());
        settings.comments = "   ".to_string();
        assert!(!settings.has_comments());
        settings.comments = "Thank you".to_string();
        assert!(settings.has_comments());
    }
}

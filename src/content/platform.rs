//! Publishing platforms a post can target

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PostforgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// English long-form post on X
    Twitter,
    /// Chinese long-form post
    Xueqiu,
    /// Chinese slide deck with caption
    Xiaohongshu,
    /// English video script
    YouTube,
}

impl Platform {
    pub const ALL: [Platform; 4] = [
        Platform::Twitter,
        Platform::Xueqiu,
        Platform::Xiaohongshu,
        Platform::YouTube,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::Xueqiu => "xueqiu",
            Platform::Xiaohongshu => "xiaohongshu",
            Platform::YouTube => "youtube",
        }
    }

    /// Whether the generator returns a JSON payload instead of plain text
    pub fn is_structured(&self) -> bool {
        matches!(self, Platform::Xiaohongshu | Platform::YouTube)
    }

    /// Whether the source language of the post is Chinese
    pub fn is_chinese(&self) -> bool {
        matches!(self, Platform::Xueqiu | Platform::Xiaohongshu)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = PostforgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "xueqiu" => Ok(Platform::Xueqiu),
            "xiaohongshu" | "xhs" => Ok(Platform::Xiaohongshu),
            "youtube" => Ok(Platform::YouTube),
            other => Err(PostforgeError::invalid(format!("unknown platform '{}'", other))),
        }
    }
}

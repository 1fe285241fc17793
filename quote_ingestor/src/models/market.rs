use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Market segment accepted by the provider's screener listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSegment {
    /// Shanghai + Shenzhen A shares.
    ShSz,
    /// Beijing Stock Exchange.
    Bj,
}

impl MarketSegment {
    pub const ALL: [MarketSegment; 2] = [MarketSegment::ShSz, MarketSegment::Bj];

    /// Code used in the `type` query parameter.
    pub fn as_code(self) -> &'static str {
        match self {
            MarketSegment::ShSz => "sh_sz",
            MarketSegment::Bj => "bj",
        }
    }
}

impl fmt::Display for MarketSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl FromStr for MarketSegment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sh_sz" | "shsz" => Ok(MarketSegment::ShSz),
            "bj" => Ok(MarketSegment::Bj),
            other => Err(format!("unknown market segment: {other}")),
        }
    }
}

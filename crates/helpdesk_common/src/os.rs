//! Operating systems the answer contract knows about.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operating system a request or a step applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Os {
    Windows,
    #[serde(rename = "macOS")]
    MacOs,
    Android,
    #[serde(rename = "iOS")]
    Ios,
    ChromeOS,
    Linux,
}

impl Os {
    /// All supported systems, in display order.
    pub const ALL: [Os; 6] = [
        Os::Windows,
        Os::MacOs,
        Os::Android,
        Os::Ios,
        Os::ChromeOS,
        Os::Linux,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Windows => "Windows",
            Os::MacOs => "macOS",
            Os::Android => "Android",
            Os::Ios => "iOS",
            Os::ChromeOS => "ChromeOS",
            Os::Linux => "Linux",
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Os {
    type Err = ();

    /// Case-insensitive match against the six canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Os::ALL
            .iter()
            .copied()
            .find(|os| os.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonical_names() {
        for os in Os::ALL {
            assert_eq!(os.as_str().parse::<Os>(), Ok(os));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("macos".parse::<Os>(), Ok(Os::MacOs));
        assert_eq!("WINDOWS".parse::<Os>(), Ok(Os::Windows));
        assert_eq!(" ios ".parse::<Os>(), Ok(Os::Ios));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("TempleOS".parse::<Os>().is_err());
        assert!("".parse::<Os>().is_err());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&Os::MacOs).unwrap();
        assert_eq!(json, "\"macOS\"");
        let back: Os = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Os::MacOs);
    }
}

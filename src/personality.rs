// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Browser Personality Profiles
 * Emulated browser identities driving behavior divergence
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};

/// Legacy-IE handlers below this major version are invoked with zero
/// arguments, with the synthesized event exposed through the `event` global.
pub const IE_LEGACY_EVENT_THRESHOLD: u32 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserFamily {
    InternetExplorer,
    Chrome,
    Firefox,
    Safari,
    Opera,
}

/// An emulated browser identity. Child browsing contexts reference their
/// parent's personality without owning it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Personality {
    pub id: String,
    pub family: BrowserFamily,
    pub version: String,
    pub user_agent: String,
    /// `User-Agent` template for Java-flavored fetches; `{version}` is
    /// replaced with the emulated Java plugin version.
    pub java_user_agent: Option<String>,
}

/// Emulated Java plugin version, advertised in Java-flavored User-Agents.
const JAVA_PLUGIN_VERSION: &str = "1.6.0_32";

impl Personality {
    pub fn winxp_ie60() -> Self {
        Self {
            id: "winxpie60".to_string(),
            family: BrowserFamily::InternetExplorer,
            version: "6.0".to_string(),
            user_agent: "Mozilla/4.0 (compatible; MSIE 6.0; Windows NT 5.1; SV1)".to_string(),
            java_user_agent: Some("Mozilla/4.0 (Windows XP 5.1) Java/{version}".to_string()),
        }
    }

    pub fn winxp_ie70() -> Self {
        Self {
            id: "winxpie70".to_string(),
            family: BrowserFamily::InternetExplorer,
            version: "7.0".to_string(),
            user_agent: "Mozilla/4.0 (compatible; MSIE 7.0; Windows NT 5.1; SV1)".to_string(),
            java_user_agent: Some("Mozilla/4.0 (Windows XP 5.1) Java/{version}".to_string()),
        }
    }

    pub fn winxp_ie80() -> Self {
        Self {
            id: "winxpie80".to_string(),
            family: BrowserFamily::InternetExplorer,
            version: "8.0".to_string(),
            user_agent: "Mozilla/4.0 (compatible; MSIE 8.0; Windows NT 5.1; Trident/4.0; SV1)"
                .to_string(),
            java_user_agent: Some("Mozilla/4.0 (Windows XP 5.1) Java/{version}".to_string()),
        }
    }

    pub fn win7_ie90() -> Self {
        Self {
            id: "win7ie90".to_string(),
            family: BrowserFamily::InternetExplorer,
            version: "9.0".to_string(),
            user_agent: "Mozilla/5.0 (compatible; MSIE 9.0; Windows NT 6.1; Trident/5.0)"
                .to_string(),
            java_user_agent: Some("Mozilla/5.0 (Windows 7 6.1) Java/{version}".to_string()),
        }
    }

    pub fn win7_chrome() -> Self {
        Self {
            id: "win7chrome".to_string(),
            family: BrowserFamily::Chrome,
            version: "120.0".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 6.1; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            java_user_agent: None,
        }
    }

    pub fn linux_firefox() -> Self {
        Self {
            id: "linuxfirefox".to_string(),
            family: BrowserFamily::Firefox,
            version: "121.0".to_string(),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"
                .to_string(),
            java_user_agent: None,
        }
    }

    /// Look up a built-in profile by id.
    pub fn by_id(id: &str) -> Option<Self> {
        match id {
            "winxpie60" => Some(Self::winxp_ie60()),
            "winxpie70" => Some(Self::winxp_ie70()),
            "winxpie80" => Some(Self::winxp_ie80()),
            "win7ie90" => Some(Self::win7_ie90()),
            "win7chrome" => Some(Self::win7_chrome()),
            "linuxfirefox" => Some(Self::linux_firefox()),
            _ => None,
        }
    }

    pub fn is_ie(&self) -> bool {
        self.family == BrowserFamily::InternetExplorer
    }

    /// Numeric major version, 0 when unparsable.
    pub fn major_version(&self) -> u32 {
        self.version
            .split('.')
            .next()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Legacy-IE calling convention: zero-argument handlers plus the `event`
    /// context global.
    pub fn is_legacy_ie(&self) -> bool {
        self.is_ie() && self.major_version() < IE_LEGACY_EVENT_THRESHOLD
    }

    /// Java-flavored User-Agent for applet/archive fetches, when the profile
    /// carries one.
    pub fn java_user_agent(&self) -> Option<String> {
        self.java_user_agent
            .as_ref()
            .map(|template| template.replace("{version}", JAVA_PLUGIN_VERSION))
    }
}

impl Default for Personality {
    fn default() -> Self {
        Self::winxp_ie60()
    }
}

//! Compatibility between this client and the remote gateway.

use semver::{Version, VersionReq};

/// Gateway versions this client is known to work with.
pub const SUPPORTED_GATEWAY_VERSION: &str = ">=3.2.0, <3.4.0";

/// Returns `true` when `version` satisfies [`SUPPORTED_GATEWAY_VERSION`].
///
/// Unparsable versions never match.
pub fn version_matches(version: &str) -> bool {
    let Ok(requirement) = VersionReq::parse(SUPPORTED_GATEWAY_VERSION) else {
        return false;
    };

    Version::parse(version.trim())
        .map(|version| requirement.matches(&version))
        .unwrap_or(false)
}

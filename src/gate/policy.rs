use crate::config::GateConfig;

/// Access policy resolved for a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathClass {
    /// Application root; login entry unless already authenticated
    Root,
    Public,
    StaticAsset,
    /// Credential checks disabled by the bypass flag
    Bypassed,
    Protected,
    RoleGated(Vec<String>),
}

impl PathClass {
    pub fn requires_credential(&self) -> bool {
        matches!(self, PathClass::Protected | PathClass::RoleGated(_))
    }
}

/// Classify a path. Order: root, exact public, public prefix, static asset,
/// bypass, role rule, default protected.
pub fn classify(path: &str, config: &GateConfig, bypass: bool) -> PathClass {
    if path == "/" || path.is_empty() {
        return PathClass::Root;
    }

    if config.public_paths.iter().any(|p| p == path) {
        return PathClass::Public;
    }

    if config.public_prefixes.iter().any(|p| path.starts_with(p.as_str())) {
        return PathClass::Public;
    }

    if is_static_asset(path, &config.static_extensions) {
        return PathClass::StaticAsset;
    }

    if bypass {
        return PathClass::Bypassed;
    }

    if let Some(rule) = config
        .role_rules
        .iter()
        .find(|rule| matches_prefix(path, &rule.prefix))
    {
        return PathClass::RoleGated(rule.roles.clone());
    }

    PathClass::Protected
}

/// Segment-aware prefix match: `/admin` covers `/admin` and `/admin/users`
/// but not `/administrator`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

fn is_static_asset(path: &str, extensions: &[String]) -> bool {
    let last = path.rsplit('/').next().unwrap_or(path);
    match last.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
        }
        _ => false,
    }
}

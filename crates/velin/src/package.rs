use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{diag::StrResult, types::Version};

/// Identifies a versioned package: `@namespace/name:1.2.3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageSpec {
    /// The namespace the package lives in.
    pub namespace: String,
    /// The package's name. May contain slashes.
    pub name: String,
    /// The requested version. Unspecified components default to zero.
    pub version: Version,
}

impl FromStr for PackageSpec {
    type Err = String;

    /// Parses `@namespace/name[:major.minor.patch]`.
    fn from_str(s: &str) -> StrResult<Self> {
        let invalid =
            || format!("`{s}` is not a valid package specification (expected `@namespace/name:version`)");

        let rest = s.strip_prefix('@').ok_or_else(invalid)?;
        let (namespace, rest) = rest.split_once('/').ok_or_else(invalid)?;
        if namespace.is_empty() {
            return Err(invalid());
        }

        let (name, version) = match rest.rsplit_once(':') {
            Some((name, version)) => {
                (name, version.parse::<Version>().map_err(|_| invalid())?)
            }
            None => (rest, Version::default()),
        };
        if name.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            namespace: namespace.into(),
            name: name.into(),
            version,
        })
    }
}

impl fmt::Display for PackageSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}/{}:{}", self.namespace, self.name, self.version)
    }
}

/// The parsed contents of a package's `typst.toml` manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageManifest {
    /// The package's name.
    pub name: String,
    /// The package's version.
    pub version: Version,
    /// The path of the package's entrypoint, relative to the package root.
    pub entrypoint: String,
}

impl PackageManifest {
    /// Parses a manifest from raw TOML bytes.
    pub fn parse(bytes: &[u8]) -> StrResult<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| "package manifest is not valid utf-8".to_owned())?;
        let doc = text
            .parse::<toml_edit::DocumentMut>()
            .map_err(|err| format!("package manifest is invalid: {err}"))?;

        let package = doc
            .get("package")
            .and_then(toml_edit::Item::as_table)
            .ok_or_else(|| "package manifest is missing the [package] table".to_owned())?;

        let field = |key: &str| {
            package
                .get(key)
                .and_then(toml_edit::Item::as_str)
                .map(str::to_owned)
        };

        let name =
            field("name").ok_or_else(|| "package manifest is missing `name`".to_owned())?;
        let version = field("version")
            .ok_or_else(|| "package manifest is missing `version`".to_owned())?
            .parse::<Version>()
            .map_err(|err| format!("package manifest has an invalid version: {err}"))?;
        let entrypoint = field("entrypoint").unwrap_or_else(|| "lib.typ".to_owned());

        Ok(Self { name, version, entrypoint })
    }

    /// Checks that this manifest satisfies the requested spec.
    ///
    /// The names must be equal, the major versions must be equal, and the
    /// manifest's minor version must be at least the requested one.
    pub fn validate(&self, spec: &PackageSpec) -> StrResult<()> {
        if self.name != spec.name {
            return Err(format!(
                "package manifest contains mismatched name `{}` (expected `{}`)",
                self.name, spec.name
            ));
        }
        if self.version.major != spec.version.major
            || self.version.minor < spec.version.minor
        {
            return Err(format!(
                "package manifest contains incompatible version {} (requested {})",
                self.version, spec.version
            ));
        }
        Ok(())
    }
}

/// Derives a valid identifier from a file stem or package name.
///
/// Dashes and spaces map to underscores, a leading digit is prefixed with an
/// underscore, and an empty input becomes `module`.
pub fn identify(name: &str) -> String {
    if name.is_empty() {
        return "module".into();
    }
    let mut out = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    for c in name.chars() {
        out.push(match c {
            '-' | ' ' => '_',
            other => other,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_parsing() {
        let spec: PackageSpec = "@preview/example:1.2.3".parse().unwrap();
        assert_eq!(spec.namespace, "preview");
        assert_eq!(spec.name, "example");
        assert_eq!(spec.version, Version::new(1, 2, 3));

        let unversioned: PackageSpec = "@local/tools".parse().unwrap();
        assert_eq!(unversioned.version, Version::new(0, 0, 0));

        assert!("preview/example".parse::<PackageSpec>().is_err());
        assert!("@/example".parse::<PackageSpec>().is_err());
    }

    #[test]
    fn manifest_parsing_and_validation() {
        let manifest = PackageManifest::parse(
            b"[package]\nname = \"example\"\nversion = \"1.4.0\"\n",
        )
        .unwrap();
        assert_eq!(manifest.entrypoint, "lib.typ");

        let ok: PackageSpec = "@preview/example:1.2.0".parse().unwrap();
        manifest.validate(&ok).unwrap();

        let newer_minor: PackageSpec = "@preview/example:1.5.0".parse().unwrap();
        assert!(manifest.validate(&newer_minor).is_err());

        let wrong_major: PackageSpec = "@preview/example:2.0.0".parse().unwrap();
        assert!(manifest.validate(&wrong_major).is_err());

        let wrong_name: PackageSpec = "@preview/other:1.2.0".parse().unwrap();
        assert!(manifest.validate(&wrong_name).is_err());
    }

    #[test]
    fn identify_mangles_names() {
        assert_eq!(identify("my-lib"), "my_lib");
        assert_eq!(identify("2col layout"), "_2col_layout");
        assert_eq!(identify(""), "module");
    }
}

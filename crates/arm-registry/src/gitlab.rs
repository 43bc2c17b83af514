//! GitLab generic package registry driver
//!
//! Versions are generic packages whose name equals the requested package
//! and whose version is semver. The token is read from `GITLAB_TOKEN` and
//! sent as `PRIVATE-TOKEN`.

use std::collections::BTreeMap;

use arm_fs::PackageFile;
use arm_fs::file::sort_canonical;
use serde::Deserialize;

use crate::archive::{unpack_artifact, verify_sha256};
use crate::config::RegistryConfig;
use crate::driver::RegistryDriver;
use crate::error::{Error, Result};
use crate::http::{HttpClient, endpoint};
use crate::version::{Version, parse_tag};

pub const TOKEN_ENV: &str = "GITLAB_TOKEN";
const PER_PAGE: &str = "100";

#[derive(Debug, Clone)]
enum Scope {
    Project(String),
    Group(String),
}

#[derive(Debug, Deserialize)]
struct PackageRecord {
    id: u64,
    name: String,
    version: String,
    #[serde(default)]
    package_type: Option<String>,
    /// Present in group listings
    #[serde(default)]
    project_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PackageFileRecord {
    id: u64,
    file_name: String,
    #[serde(default)]
    file_sha256: Option<String>,
}

pub struct GitlabDriver {
    name: String,
    base_url: String,
    api_version: String,
    scope: Scope,
    client: HttpClient,
}

impl GitlabDriver {
    pub fn new(name: &str, config: &RegistryConfig) -> Result<Self> {
        let invalid = |message: &str| Error::InvalidConfig {
            registry: name.to_string(),
            message: message.to_string(),
        };
        let base_url = config
            .url
            .clone()
            .ok_or_else(|| invalid("gitlab registries require a url"))?;
        let scope = match (&config.project_id, &config.group_id) {
            (Some(project), None) => Scope::Project(project.clone()),
            (None, Some(group)) => Scope::Group(group.clone()),
            _ => return Err(invalid("set exactly one of projectId or groupId")),
        };
        Ok(Self {
            name: name.to_string(),
            base_url,
            api_version: config.gitlab_api_version().to_string(),
            scope,
            client: HttpClient::new(name, Some(("private-token", TOKEN_ENV)))?,
        })
    }

    fn api(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<reqwest::Url> {
        let mut path = vec!["api", self.api_version.as_str()];
        path.extend_from_slice(segments);
        endpoint(&self.name, &self.base_url, &path, query)
    }

    fn list_records(&self, package: &str) -> Result<Vec<(String, PackageRecord)>> {
        let query = [
            ("package_name", package),
            ("package_type", "generic"),
            ("per_page", PER_PAGE),
        ];
        let url = match &self.scope {
            Scope::Project(id) => self.api(&["projects", id, "packages"], &query)?,
            Scope::Group(id) => self.api(&["groups", id, "packages"], &query)?,
        };
        let records: Vec<PackageRecord> = self.client.get_json(&url)?.ok_or_else(|| Error::InvalidConfig {
            registry: self.name.clone(),
            message: "project or group not found".to_string(),
        })?;

        let mut out = Vec::new();
        for record in records {
            if record.name != package {
                continue;
            }
            if record.package_type.as_deref().is_some_and(|t| t != "generic") {
                continue;
            }
            let project = match (&self.scope, record.project_id) {
                (Scope::Project(id), _) => id.clone(),
                (Scope::Group(_), Some(id)) => id.to_string(),
                (Scope::Group(_), None) => continue,
            };
            out.push((project, record));
        }
        Ok(out)
    }

    fn not_found(&self, package: &str, version: &Version) -> Error {
        Error::VersionNotFound {
            registry: self.name.clone(),
            package: package.to_string(),
            version: version.display.clone(),
        }
    }
}

/// Resolved ids are `<project>:<package id>`.
fn split_id(id: &str) -> Option<(&str, &str)> {
    id.rsplit_once(':')
}

impl RegistryDriver for GitlabDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, package: &str) -> Result<Vec<Version>> {
        let records = self.list_records(package)?;
        if records.is_empty() {
            return Err(Error::PackageNotFound {
                registry: self.name.clone(),
                package: package.to_string(),
            });
        }
        Ok(records
            .into_iter()
            .filter_map(|(project, record)| {
                let semver = parse_tag(&record.version)?;
                Some(Version::tagged(format!("{project}:{}", record.id), semver))
            })
            .collect())
    }

    fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        let (project, package_id) =
            split_id(&version.id).ok_or_else(|| self.not_found(package, version))?;

        // Generic downloads are addressed by the version string as published
        let url = self.api(&["projects", project, "packages", package_id], &[])?;
        let package_record: PackageRecord = self
            .client
            .get_json(&url)?
            .ok_or_else(|| self.not_found(package, version))?;

        let url = self.api(
            &["projects", project, "packages", package_id, "package_files"],
            &[("per_page", PER_PAGE)],
        )?;
        let records: Vec<PackageFileRecord> = self
            .client
            .get_json(&url)?
            .ok_or_else(|| self.not_found(package, version))?;

        // Re-uploads keep older files around; the newest one wins
        let mut latest: BTreeMap<String, PackageFileRecord> = BTreeMap::new();
        for record in records {
            match latest.get(&record.file_name) {
                Some(existing) if existing.id > record.id => {}
                _ => {
                    latest.insert(record.file_name.clone(), record);
                }
            }
        }

        let mut files = Vec::new();
        for record in latest.values() {
            let url = self.api(
                &[
                    "projects",
                    project,
                    "packages",
                    "generic",
                    package,
                    &package_record.version,
                    &record.file_name,
                ],
                &[],
            )?;
            let bytes = self
                .client
                .get_bytes(&url)?
                .ok_or_else(|| self.not_found(package, version))?;
            verify_sha256(package, &bytes, record.file_sha256.as_deref())?;
            files.extend(unpack_artifact(package, &record.file_name, bytes)?);
        }
        sort_canonical(&mut files);
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_exactly_one_scope() {
        let config = RegistryConfig::gitlab("https://gitlab.example.com", None, None, None);
        assert!(GitlabDriver::new("lab", &config).is_err());
    }

    #[test]
    fn api_urls_include_version_and_scope() {
        let config = RegistryConfig::gitlab(
            "https://gitlab.example.com",
            Some("group/project".to_string()),
            None,
            None,
        );
        let driver = GitlabDriver::new("lab", &config).unwrap();
        let url = driver.api(&["projects", "group/project", "packages"], &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://gitlab.example.com/api/v4/projects/group%2Fproject/packages"
        );
    }

    #[test]
    fn ids_split_on_last_colon() {
        assert_eq!(split_id("12:345"), Some(("12", "345")));
        assert_eq!(split_id("345"), None);
    }
}

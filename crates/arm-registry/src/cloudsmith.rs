//! Cloudsmith raw package driver
//!
//! Each Cloudsmith package version is one uploaded file, either a single
//! resource file or a `.tar.gz` of many. The API key is read from
//! `CLOUDSMITH_API_KEY` and sent as `X-Api-Key`.

use arm_fs::PackageFile;
use reqwest::Url;
use serde::Deserialize;

use crate::archive::{unpack_artifact, verify_sha256};
use crate::config::RegistryConfig;
use crate::driver::RegistryDriver;
use crate::error::{Error, Result};
use crate::http::{HttpClient, endpoint};
use crate::version::{Version, parse_tag};

pub const TOKEN_ENV: &str = "CLOUDSMITH_API_KEY";
const PAGE_SIZE: &str = "100";

#[derive(Debug, Deserialize)]
struct PackageRecord {
    slug_perm: String,
    name: String,
    version: String,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    cdn_url: Option<String>,
    #[serde(default)]
    checksum_sha256: Option<String>,
}

pub struct CloudsmithDriver {
    name: String,
    base_url: String,
    owner: String,
    repository: String,
    client: HttpClient,
}

impl CloudsmithDriver {
    pub fn new(name: &str, config: &RegistryConfig) -> Result<Self> {
        let (Some(owner), Some(repository)) = (&config.owner, &config.repository) else {
            return Err(Error::InvalidConfig {
                registry: name.to_string(),
                message: "cloudsmith registries require owner and repository".to_string(),
            });
        };
        Ok(Self {
            name: name.to_string(),
            base_url: config.cloudsmith_url().to_string(),
            owner: owner.clone(),
            repository: repository.clone(),
            client: HttpClient::new(name, Some(("x-api-key", TOKEN_ENV)))?,
        })
    }

    /// `/v1/packages/<owner>/<repo>/<extra...>/`
    fn packages_url(&self, extra: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut path = vec!["v1", "packages", self.owner.as_str(), self.repository.as_str()];
        path.extend_from_slice(extra);
        path.push("");
        endpoint(&self.name, &self.base_url, &path, query)
    }
}

impl RegistryDriver for CloudsmithDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_versions(&self, package: &str) -> Result<Vec<Version>> {
        let query = format!("name:{package}");
        let url = self.packages_url(&[], &[("query", &query), ("page_size", PAGE_SIZE)])?;
        let records: Vec<PackageRecord> =
            self.client
                .get_json(&url)?
                .ok_or_else(|| Error::InvalidConfig {
                    registry: self.name.clone(),
                    message: format!("repository {}/{} not found", self.owner, self.repository),
                })?;

        let versions: Vec<Version> = records
            .into_iter()
            .filter(|r| r.name == package)
            .filter_map(|r| Some(Version::tagged(r.slug_perm, parse_tag(&r.version)?)))
            .collect();
        if versions.is_empty() {
            return Err(Error::PackageNotFound {
                registry: self.name.clone(),
                package: package.to_string(),
            });
        }
        Ok(versions)
    }

    fn fetch(&self, package: &str, version: &Version) -> Result<Vec<PackageFile>> {
        let not_found = || Error::VersionNotFound {
            registry: self.name.clone(),
            package: package.to_string(),
            version: version.display.clone(),
        };
        let url = self.packages_url(&[&version.id], &[])?;
        let record: PackageRecord = self.client.get_json(&url)?.ok_or_else(not_found)?;

        let cdn_url = record.cdn_url.as_deref().ok_or_else(not_found)?;
        let download = Url::parse(cdn_url).map_err(|e| Error::Unreachable {
            registry: self.name.clone(),
            message: format!("invalid download url '{cdn_url}': {e}"),
        })?;
        let bytes = self.client.get_bytes(&download)?.ok_or_else(not_found)?;
        verify_sha256(package, &bytes, record.checksum_sha256.as_deref())?;

        let file_name = record
            .filename
            .clone()
            .or_else(|| download.path_segments()?.next_back().map(str::to_string))
            .unwrap_or_else(|| format!("{package}.yml"));
        unpack_artifact(package, &file_name, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages_url_uses_default_api_host() {
        let config = RegistryConfig::cloudsmith(None, "acme", "ai-rules");
        let driver = CloudsmithDriver::new("cs", &config).unwrap();
        let url = driver
            .packages_url(&[], &[("query", "name:rules")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.cloudsmith.io/v1/packages/acme/ai-rules/?query=name%3Arules"
        );
    }

    #[test]
    fn missing_owner_is_invalid() {
        let mut config = RegistryConfig::cloudsmith(None, "acme", "ai-rules");
        config.owner = None;
        assert!(matches!(
            CloudsmithDriver::new("cs", &config),
            Err(Error::InvalidConfig { .. })
        ));
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use crate::Error;
use votebot_common::traits::sink_traits::IdentityResolver;

pub const DEFAULT_PROFILE_URL: &str =
    "https://api.minecraftservices.com/minecraft/profile/lookup/name";

/// JSON shape for "GET /minecraft/profile/lookup/name/{name}".
#[derive(Debug, Deserialize)]
struct ProfileJson {
    id: String,
    #[allow(dead_code)]
    name: String,
}

/// Looks up a player's stable id by name through the public profile API.
pub struct MojangIdentityResolver {
    http_client: Client,
    base_url: String,
}

impl MojangIdentityResolver {
    pub fn new() -> Result<Self, Error> {
        Self::with_base_url(DEFAULT_PROFILE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let client = reqwest::ClientBuilder::new()
            .user_agent("VoteBot/1.0")
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http_client: client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityResolver for MojangIdentityResolver {
    async fn resolve(&self, display_name: &str) -> Result<Uuid, Error> {
        let url = format!("{}/{}", self.base_url, urlencoding::encode(display_name));
        let resp = self.http_client.get(&url).send().await?;

        if !resp.status().is_success() {
            debug!("Profile lookup for '{display_name}' => HTTP {}", resp.status());
            return Err(Error::IdentityNotFound(display_name.to_string()));
        }

        let body = resp.text().await?;
        let profile: ProfileJson = serde_json::from_str(&body)?;
        parse_profile_id(&profile.id)
    }
}

/// The API returns ids without dashes; `Uuid` accepts both forms.
pub fn parse_profile_id(raw: &str) -> Result<Uuid, Error> {
    Ok(Uuid::parse_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_undashed_profile_id() {
        let id = parse_profile_id("069a79f444e94726a5befca90e38aaf5").unwrap();
        assert_eq!(id.to_string(), "069a79f4-44e9-4726-a5be-fca90e38aaf5");
    }

    #[test]
    fn rejects_garbage_profile_id() {
        assert!(matches!(parse_profile_id("not-a-uuid"), Err(Error::Uuid(_))));
    }

    #[test]
    fn profile_json_shape() {
        let profile: ProfileJson =
            serde_json::from_str(r#"{"id":"069a79f444e94726a5befca90e38aaf5","name":"Notch"}"#)
                .unwrap();
        assert_eq!(profile.id, "069a79f444e94726a5befca90e38aaf5");
    }
}

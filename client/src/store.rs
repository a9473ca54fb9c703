//! HTTP-backed [`Store`] implementation.

use std::time::Duration;

use reqwest::Response;
use stagedraw_engine::Store;
use stagedraw_types::{Participant, ParticipantPatch, Prize, PrizePatch};
use tracing::debug;
use url::Url;

use crate::wire::{WirePerson, WirePersonPatch, WirePrize, WirePrizePatch};
use crate::{Error, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Store adapter for the event backend's REST API.
#[derive(Clone, Debug)]
pub struct HttpStore {
    http: reqwest::Client,
    base: Url,
}

impl HttpStore {
    /// `base_url` must be http or https; a missing trailing slash is added so
    /// joins keep any path prefix.
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        match base.scheme() {
            "http" | "https" => {}
            scheme => return Err(Error::InvalidScheme(scheme.to_string())),
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    async fn expect_ok(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::FailedWithBody { status, body })
    }
}

impl Store for HttpStore {
    type Error = Error;

    async fn list_participants(&self) -> Result<Vec<Participant>> {
        let url = self.endpoint("api/participants")?;
        let response = Self::expect_ok(self.http.get(url).send().await?).await?;
        let wire: Vec<WirePerson> = response.json().await?;
        debug!(count = wire.len(), "fetched participants");
        Ok(wire.into_iter().map(WirePerson::into_domain).collect())
    }

    async fn list_prizes(&self) -> Result<Vec<Prize>> {
        let url = self.endpoint("api/prizes")?;
        let response = Self::expect_ok(self.http.get(url).send().await?).await?;
        let wire: Vec<WirePrize> = response.json().await?;
        debug!(count = wire.len(), "fetched prizes");
        Ok(wire.into_iter().map(WirePrize::into_domain).collect())
    }

    async fn set_current_prize(&self, id: u64) -> Result<Prize> {
        let url = self.endpoint(&format!("api/prizes/{id}/current"))?;
        let response = Self::expect_ok(self.http.post(url).send().await?).await?;
        let wire: WirePrize = response.json().await?;
        Ok(wire.into_domain())
    }

    async fn update_prize(&self, id: u64, patch: PrizePatch) -> Result<Prize> {
        let url = self.endpoint(&format!("api/prizes/{id}"))?;
        let body = WirePrizePatch::from(patch);
        let response =
            Self::expect_ok(self.http.patch(url).json(&body).send().await?).await?;
        let wire: WirePrize = response.json().await?;
        Ok(wire.into_domain())
    }

    async fn update_participant(
        &self,
        id: u64,
        patch: ParticipantPatch,
    ) -> Result<Participant> {
        let url = self.endpoint(&format!("api/participants/{id}"))?;
        let body = WirePersonPatch::from(patch);
        let response =
            Self::expect_ok(self.http.patch(url).json(&body).send().await?).await?;
        let wire: WirePerson = response.json().await?;
        Ok(wire.into_domain())
    }
}

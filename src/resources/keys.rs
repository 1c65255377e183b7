use log::debug;
use reqwest::Client as HttpClient;
use url::Url;

use super::cache::RecordCache;
use super::{ expect_success, read_json, ResourceError };
use crate::models::resources::{ ApiKey, CreateKeyRequest };

#[derive(Debug, Clone)]
pub struct KeyManager {
    http: HttpClient,
    url: Option<Url>,
    cache: RecordCache<ApiKey>,
}

impl KeyManager {
    pub fn new(http: HttpClient, url: Option<Url>) -> Self {
        Self {
            http,
            url,
            cache: RecordCache::new(),
        }
    }

    fn endpoint(&self) -> Result<Url, ResourceError> {
        self.url.clone().ok_or(ResourceError::NotConfigured("key"))
    }

    pub fn list(&self) -> Vec<ApiKey> {
        self.cache.snapshot()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Raw value of the first cached key, used to authenticate bot listing.
    pub fn first_key(&self) -> Option<String> {
        self.cache.first().map(|k| k.key)
    }

    pub fn find(&self, id: &str) -> Option<ApiKey> {
        self.cache.find(|k| k.id == id)
    }

    pub async fn refresh(&self) -> Result<Vec<ApiKey>, ResourceError> {
        let resp = self.http.get(self.endpoint()?).send().await?;
        let listed: Vec<ApiKey> = read_json(resp).await?;
        let total = listed.len();
        let keys: Vec<ApiKey> = listed.into_iter().filter(|k| !k.key.is_empty()).collect();
        debug!("Fetched {} API keys ({} revoked skipped)", keys.len(), total - keys.len());
        self.cache.replace_all(keys.clone());
        Ok(keys)
    }

    /// Without a name the key is called "API Key N", N counting from the cached list.
    pub async fn create(&self, name: Option<&str>) -> Result<ApiKey, ResourceError> {
        let default_name = format!("API Key {}", self.cache.len() + 1);
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(default_name.as_str());
        let resp = self.http.post(self.endpoint()?).json(&CreateKeyRequest { name }).send().await?;
        let key: ApiKey = read_json(resp).await?;
        self.cache.push(key.clone());
        Ok(key)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ResourceError> {
        let mut url = self.endpoint()?;
        url.query_pairs_mut().append_pair("id", id);
        let resp = self.http.delete(url).send().await?;
        expect_success(resp).await?;
        self.cache.remove_where(|k| k.id == id);
        Ok(())
    }
}
